use rusqlite::{params, OptionalExtension, Row};

use super::is_constraint_violation;
use crate::data::SalesWebContext;
use crate::error::{Result, SalesWebError};
use crate::models::{Department, SaleStatus, SalesRecord, Seller};

const SELECT_SELLER_WITH_DEPARTMENT: &str = "
    SELECT s.id, s.name, s.email, s.birth_date, s.base_salary, s.department_id,
           d.name AS department_name
    FROM seller s
    JOIN department d ON d.id = s.department_id";

pub struct SellerService {
    context: SalesWebContext,
}

fn seller_from_row(row: &Row<'_>) -> rusqlite::Result<Seller> {
    let mut seller = Seller::new(
        row.get("id")?,
        row.get::<_, String>("name")?,
        row.get::<_, String>("email")?,
        row.get("birth_date")?,
        row.get("base_salary")?,
        row.get("department_id")?,
    );
    seller.department = Some(Department::new(
        seller.department_id,
        row.get::<_, String>("department_name")?,
    ));
    Ok(seller)
}

impl SellerService {
    pub fn new(context: SalesWebContext) -> Self {
        Self { context }
    }

    /// All sellers with their department, ordered by name.
    pub async fn find_all(&self) -> Result<Vec<Seller>> {
        self.context
            .call(|conn| {
                let sql = format!("{SELECT_SELLER_WITH_DEPARTMENT} ORDER BY s.name, s.id");
                let mut stmt = conn.prepare(&sql)?;
                let sellers = stmt
                    .query_map([], seller_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(sellers)
            })
            .await
    }

    /// Seller with its department loaded.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Seller>> {
        self.context
            .call(move |conn| {
                let sql = format!("{SELECT_SELLER_WITH_DEPARTMENT} WHERE s.id = ?1");
                Ok(conn.query_row(&sql, params![id], seller_from_row).optional()?)
            })
            .await
    }

    /// Seller with its department and every sales record, newest first.
    pub async fn find_with_sales(&self, id: i64) -> Result<Option<Seller>> {
        self.context
            .call(move |conn| {
                let sql = format!("{SELECT_SELLER_WITH_DEPARTMENT} WHERE s.id = ?1");
                let Some(mut seller) = conn.query_row(&sql, params![id], seller_from_row).optional()?
                else {
                    return Ok(None);
                };

                let mut stmt = conn.prepare(
                    "SELECT id, date, amount, status, seller_id FROM sales_record
                     WHERE seller_id = ?1 ORDER BY date DESC, id",
                )?;
                let records = stmt.query_map(params![id], |row| {
                    Ok(SalesRecord::new(
                        row.get("id")?,
                        row.get("date")?,
                        row.get("amount")?,
                        row.get::<_, SaleStatus>("status")?,
                        row.get("seller_id")?,
                    ))
                })?;
                for record in records {
                    seller.add_sales(record?);
                }
                Ok(Some(seller))
            })
            .await
    }

    /// Inserts the seller and stores the generated id back into it.
    pub async fn insert(&self, seller: &mut Seller) -> Result<()> {
        let row = seller.clone();
        let id = self
            .context
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO seller (name, email, birth_date, base_salary, department_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![row.name, row.email, row.birth_date, row.base_salary, row.department_id],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        SalesWebError::Integrity(format!("Department {} not found", row.department_id))
                    } else {
                        e.into()
                    }
                })?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        seller.id = id;
        tracing::info!(seller_id = id, "Created seller");
        Ok(())
    }

    /// Deletes a seller. Sellers that still have sales cannot be removed.
    pub async fn remove(&self, id: i64) -> Result<()> {
        self.context
            .call(move |conn| match conn.execute("DELETE FROM seller WHERE id = ?1", params![id]) {
                Ok(0) => Err(SalesWebError::NotFound("Id not found".to_string())),
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => Err(SalesWebError::Integrity(
                    "Can't delete seller because he/she has sales".to_string(),
                )),
                Err(e) => Err(e.into()),
            })
            .await
    }

    pub async fn update(&self, seller: &Seller) -> Result<()> {
        let row = seller.clone();
        self.context
            .call(move |conn| {
                let tx = conn.transaction()?;
                let exists: Option<i64> = tx
                    .query_row("SELECT 1 FROM seller WHERE id = ?1", params![row.id], |r| r.get(0))
                    .optional()?;
                if exists.is_none() {
                    return Err(SalesWebError::NotFound("Id not found".to_string()));
                }

                let changed = tx
                    .execute(
                        "UPDATE seller SET name = ?1, email = ?2, birth_date = ?3,
                         base_salary = ?4, department_id = ?5 WHERE id = ?6",
                        params![
                            row.name,
                            row.email,
                            row.birth_date,
                            row.base_salary,
                            row.department_id,
                            row.id
                        ],
                    )
                    .map_err(|e| {
                        if is_constraint_violation(&e) {
                            SalesWebError::DbConcurrency(format!(
                                "Department {} no longer exists",
                                row.department_id
                            ))
                        } else {
                            e.into()
                        }
                    })?;
                if changed == 0 {
                    return Err(SalesWebError::DbConcurrency(
                        "Seller was modified or deleted by another request".to_string(),
                    ));
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }
}
