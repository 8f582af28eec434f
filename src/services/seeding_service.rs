use chrono::NaiveDate;
use rusqlite::params;
use tracing::info;

use crate::data::SalesWebContext;
use crate::error::Result;
use crate::metrics::SeedingMetrics;
use crate::models::{Department, SaleStatus, SalesRecord, Seller};

/// Populates an empty database with the default departments, sellers and
/// sales.
pub struct SeedingService {
    context: SalesWebContext,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

pub fn seed_departments() -> Vec<Department> {
    vec![
        Department::new(1, "Computers"),
        Department::new(2, "Electronics"),
        Department::new(3, "Fashion"),
        Department::new(4, "Books"),
    ]
}

pub fn seed_sellers() -> Vec<Seller> {
    vec![
        Seller::new(1, "Bob Brown", "bob@gmail.com", date(1998, 4, 21), 1000.0, 1),
        Seller::new(2, "Maria Green", "maria@gmail.com", date(1979, 12, 31), 3500.0, 2),
        Seller::new(3, "Alex Grey", "alex@gmail.com", date(1988, 1, 15), 2200.0, 1),
        Seller::new(4, "Martha Red", "martha@gmail.com", date(1993, 11, 30), 3000.0, 4),
        Seller::new(5, "Donald Blue", "donald@gmail.com", date(2000, 1, 9), 4000.0, 3),
        Seller::new(6, "Alex Pink", "bob@gmail.com", date(1997, 3, 4), 3000.0, 2),
    ]
}

pub fn seed_sales_records() -> Vec<SalesRecord> {
    use SaleStatus::*;
    let rows = [
        (1, date(2018, 9, 25), 11000.0, Billed, 1),
        (2, date(2018, 9, 4), 7000.0, Billed, 5),
        (3, date(2018, 9, 13), 4000.0, Canceled, 4),
        (4, date(2018, 9, 1), 8000.0, Billed, 1),
        (5, date(2018, 9, 21), 3000.0, Billed, 3),
        (6, date(2018, 9, 15), 2000.0, Billed, 1),
        (7, date(2018, 9, 28), 13000.0, Billed, 2),
        (8, date(2018, 9, 11), 4000.0, Billed, 4),
        (9, date(2018, 9, 14), 11000.0, Pending, 6),
        (10, date(2018, 9, 7), 9000.0, Billed, 6),
        (11, date(2018, 9, 13), 6000.0, Billed, 2),
        (12, date(2018, 9, 25), 7000.0, Pending, 3),
        (13, date(2018, 9, 29), 10000.0, Billed, 4),
        (14, date(2018, 9, 4), 3000.0, Billed, 5),
        (15, date(2018, 9, 12), 4000.0, Billed, 1),
        (16, date(2018, 10, 5), 2000.0, Billed, 4),
        (17, date(2018, 10, 1), 12000.0, Billed, 1),
        (18, date(2018, 10, 24), 6000.0, Billed, 3),
        (19, date(2018, 10, 22), 8000.0, Billed, 5),
        (20, date(2018, 10, 15), 8000.0, Billed, 6),
        (21, date(2018, 10, 17), 9000.0, Billed, 2),
        (22, date(2018, 10, 24), 4000.0, Billed, 4),
        (23, date(2018, 10, 19), 11000.0, Canceled, 2),
        (24, date(2018, 10, 12), 8000.0, Billed, 5),
        (25, date(2018, 10, 31), 7000.0, Billed, 3),
        (26, date(2018, 10, 6), 5000.0, Billed, 4),
        (27, date(2018, 10, 13), 9000.0, Pending, 1),
        (28, date(2018, 10, 7), 4000.0, Billed, 3),
        (29, date(2018, 10, 23), 12000.0, Billed, 5),
        (30, date(2018, 10, 12), 5000.0, Billed, 2),
    ];
    rows.into_iter()
        .map(|(id, date, amount, status, seller_id)| SalesRecord::new(id, date, amount, status, seller_id))
        .collect()
}

impl SeedingService {
    pub fn new(context: SalesWebContext) -> Self {
        Self { context }
    }

    /// Inserts the default data unless any department, seller or sales record
    /// already exists. Returns whether anything was inserted.
    pub async fn seed(&self) -> Result<bool> {
        let seeded = self
            .context
            .call(|conn| {
                let existing: i64 = conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM department)
                          + (SELECT COUNT(*) FROM seller)
                          + (SELECT COUNT(*) FROM sales_record)",
                    [],
                    |row| row.get(0),
                )?;
                if existing > 0 {
                    return Ok(None);
                }

                let (departments, sellers, sales) =
                    (seed_departments(), seed_sellers(), seed_sales_records());
                let counts = (departments.len(), sellers.len(), sales.len());
                let tx = conn.transaction()?;
                for d in departments {
                    tx.execute(
                        "INSERT INTO department (id, name) VALUES (?1, ?2)",
                        params![d.id, d.name],
                    )?;
                }
                for s in sellers {
                    tx.execute(
                        "INSERT INTO seller (id, name, email, birth_date, base_salary, department_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![s.id, s.name, s.email, s.birth_date, s.base_salary, s.department_id],
                    )?;
                }
                for r in sales {
                    tx.execute(
                        "INSERT INTO sales_record (id, date, amount, status, seller_id)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![r.id, r.date, r.amount, r.status, r.seller_id],
                    )?;
                }
                tx.commit()?;
                Ok(Some(counts))
            })
            .await?;

        match seeded {
            Some((departments, sellers, sales)) => {
                SeedingMetrics::record_seeded(departments, sellers, sales);
                info!(
                    departments,
                    sellers, sales, "Seeded database with default departments, sellers and sales records"
                );
                Ok(true)
            }
            None => {
                SeedingMetrics::record_skipped();
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_records_reference_seed_sellers() {
        let sellers: HashSet<i64> = seed_sellers().iter().map(|s| s.id).collect();
        let departments: HashSet<i64> = seed_departments().iter().map(|d| d.id).collect();
        assert!(seed_sellers().iter().all(|s| departments.contains(&s.department_id)));
        assert!(seed_sales_records().iter().all(|r| sellers.contains(&r.seller_id)));
        assert_eq!(seed_sales_records().len(), 30);
    }

    #[tokio::test]
    async fn seeding_runs_once() {
        let context = SalesWebContext::open_in_memory().unwrap();
        context.migrate().await.unwrap();
        let service = SeedingService::new(context.clone());

        assert!(service.seed().await.unwrap());
        assert!(!service.seed().await.unwrap());

        let count: i64 = context
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM sales_record", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 30);
    }
}
