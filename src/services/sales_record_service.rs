use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::data::SalesWebContext;
use crate::error::Result;
use crate::models::{Department, SaleStatus, SalesRecord, Seller};

pub struct SalesRecordService {
    context: SalesWebContext,
}

/// Sales of one department inside a search window.
#[derive(Debug, Clone)]
pub struct SalesGroup {
    pub department: Department,
    pub records: Vec<SalesRecord>,
}

impl SalesGroup {
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<SalesRecord> {
    let mut seller = Seller::new(
        row.get("seller_id")?,
        row.get::<_, String>("seller_name")?,
        row.get::<_, String>("seller_email")?,
        row.get("seller_birth_date")?,
        row.get("seller_base_salary")?,
        row.get("department_id")?,
    );
    seller.department = Some(Department::new(
        seller.department_id,
        row.get::<_, String>("department_name")?,
    ));

    let mut record = SalesRecord::new(
        row.get("id")?,
        row.get("date")?,
        row.get("amount")?,
        row.get::<_, SaleStatus>("status")?,
        seller.id,
    );
    record.seller = Some(seller);
    Ok(record)
}

impl SalesRecordService {
    pub fn new(context: SalesWebContext) -> Self {
        Self { context }
    }

    /// Sales between `min_date` and `max_date` (both inclusive, either may be
    /// open) with seller and department loaded, newest first.
    pub async fn find_by_date(
        &self,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
    ) -> Result<Vec<SalesRecord>> {
        self.context
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT r.id, r.date, r.amount, r.status,
                            s.id AS seller_id, s.name AS seller_name, s.email AS seller_email,
                            s.birth_date AS seller_birth_date, s.base_salary AS seller_base_salary,
                            d.id AS department_id, d.name AS department_name
                     FROM sales_record r
                     JOIN seller s ON s.id = r.seller_id
                     JOIN department d ON d.id = s.department_id
                     WHERE (?1 IS NULL OR r.date >= ?1)
                       AND (?2 IS NULL OR r.date <= ?2)
                     ORDER BY r.date DESC, r.id",
                )?;
                let records = stmt
                    .query_map(params![min_date, max_date], record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }

    /// Same search as [`find_by_date`](Self::find_by_date), grouped by
    /// department. Groups are ordered by department name; records keep the
    /// newest-first order.
    pub async fn find_by_date_grouping(
        &self,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
    ) -> Result<Vec<SalesGroup>> {
        let records = self.find_by_date(min_date, max_date).await?;
        Ok(group_by_department(records))
    }
}

pub fn group_by_department(records: Vec<SalesRecord>) -> Vec<SalesGroup> {
    let mut groups: Vec<SalesGroup> = Vec::new();
    for record in records {
        let department = record
            .seller
            .as_ref()
            .and_then(|s| s.department.clone())
            .unwrap_or_default();
        match groups.iter_mut().find(|g| g.department.id == department.id) {
            Some(group) => group.records.push(record),
            None => groups.push(SalesGroup {
                department,
                records: vec![record],
            }),
        }
    }
    groups.sort_by(|a, b| {
        a.department
            .name
            .cmp(&b.department.name)
            .then(a.department.id.cmp(&b.department.id))
    });
    groups
}
