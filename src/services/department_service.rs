use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;

use super::is_constraint_violation;
use crate::data::SalesWebContext;
use crate::error::{Result, SalesWebError};
use crate::models::{Department, SaleStatus, SalesRecord, Seller};

pub struct DepartmentService {
    context: SalesWebContext,
}

fn department_from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department::new(row.get("id")?, row.get::<_, String>("name")?))
}

impl DepartmentService {
    pub fn new(context: SalesWebContext) -> Self {
        Self { context }
    }

    /// All departments ordered by name.
    pub async fn find_all(&self) -> Result<Vec<Department>> {
        self.context
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM department ORDER BY name, id")?;
                let departments = stmt
                    .query_map([], department_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(departments)
            })
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Department>> {
        self.context
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name FROM department WHERE id = ?1",
                        params![id],
                        department_from_row,
                    )
                    .optional()?)
            })
            .await
    }

    /// Department with its sellers (ordered by name) and each seller's sales.
    pub async fn find_details(&self, id: i64) -> Result<Option<Department>> {
        self.context
            .call(move |conn| {
                let Some(mut department) = conn
                    .query_row(
                        "SELECT id, name FROM department WHERE id = ?1",
                        params![id],
                        department_from_row,
                    )
                    .optional()?
                else {
                    return Ok(None);
                };

                let mut stmt = conn.prepare(
                    "SELECT id, name, email, birth_date, base_salary, department_id
                     FROM seller WHERE department_id = ?1 ORDER BY name, id",
                )?;
                let sellers = stmt
                    .query_map(params![id], |row| {
                        Ok(Seller::new(
                            row.get("id")?,
                            row.get::<_, String>("name")?,
                            row.get::<_, String>("email")?,
                            row.get("birth_date")?,
                            row.get("base_salary")?,
                            row.get("department_id")?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut stmt = conn.prepare(
                    "SELECT r.id, r.date, r.amount, r.status, r.seller_id
                     FROM sales_record r JOIN seller s ON s.id = r.seller_id
                     WHERE s.department_id = ?1 ORDER BY r.date DESC, r.id",
                )?;
                let mut sales_by_seller: HashMap<i64, Vec<SalesRecord>> = HashMap::new();
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
                    let record = record?;
                    sales_by_seller.entry(record.seller_id).or_default().push(record);
                }

                for mut seller in sellers {
                    for record in sales_by_seller.remove(&seller.id).unwrap_or_default() {
                        seller.add_sales(record);
                    }
                    department.add_seller(seller);
                }
                Ok(Some(department))
            })
            .await
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        self.context
            .call(move |conn| {
                let found: Option<i64> = conn
                    .query_row("SELECT 1 FROM department WHERE id = ?1", params![id], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(found.is_some())
            })
            .await
    }

    /// Inserts the department and stores the generated id back into it.
    pub async fn insert(&self, department: &mut Department) -> Result<()> {
        let name = department.name.clone();
        let id = self
            .context
            .call(move |conn| {
                conn.execute("INSERT INTO department (name) VALUES (?1)", params![name])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        department.id = id;
        tracing::info!(department_id = id, "Created department");
        Ok(())
    }

    pub async fn update(&self, department: &Department) -> Result<()> {
        let Department { id, name, .. } = department.clone();
        self.context
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE department SET name = ?1 WHERE id = ?2",
                    params![name, id],
                )?;
                if changed == 0 {
                    return Err(SalesWebError::NotFound("Id not found".to_string()));
                }
                Ok(())
            })
            .await
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        self.context
            .call(move |conn| match conn.execute("DELETE FROM department WHERE id = ?1", params![id]) {
                Ok(0) => Err(SalesWebError::NotFound("Id not found".to_string())),
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => Err(SalesWebError::Integrity(
                    "Can't delete department because it has sellers".to_string(),
                )),
                Err(e) => Err(e.into()),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SeedingService;
    use chrono::NaiveDate;

    async fn seeded() -> DepartmentService {
        let context = SalesWebContext::open_in_memory().unwrap();
        context.migrate().await.unwrap();
        SeedingService::new(context.clone()).seed().await.unwrap();
        DepartmentService::new(context)
    }

    #[tokio::test]
    async fn lists_departments_by_name() {
        let service = seeded().await;
        let names: Vec<String> = service.find_all().await.unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Books", "Computers", "Electronics", "Fashion"]);
    }

    #[tokio::test]
    async fn details_include_sellers_and_sales() {
        let service = seeded().await;
        let computers = service.find_details(1).await.unwrap().unwrap();
        let sellers: Vec<&str> = computers.sellers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(sellers, vec!["Alex Grey", "Bob Brown"]);

        let sept = (
            NaiveDate::from_ymd_opt(2018, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2018, 9, 30).unwrap(),
        );
        // Bob: 11000 + 8000 + 2000 + 4000, Alex: 3000 + 7000
        assert_eq!(computers.total_sales(sept.0, sept.1), 35000.0);
        assert!(service.find_details(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_update_and_remove() {
        let service = seeded().await;
        let mut music = Department::new(0, "Music");
        service.insert(&mut music).await.unwrap();
        assert!(music.id > 4);
        assert!(service.exists(music.id).await.unwrap());

        music.name = "Music & Arts".to_string();
        service.update(&music).await.unwrap();
        assert_eq!(service.find_by_id(music.id).await.unwrap().unwrap().name, "Music & Arts");

        service.remove(music.id).await.unwrap();
        assert!(!service.exists(music.id).await.unwrap());
        assert!(matches!(
            service.remove(music.id).await,
            Err(SalesWebError::NotFound(_))
        ));
        assert!(matches!(
            service.update(&music).await,
            Err(SalesWebError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn department_with_sellers_is_kept() {
        let service = seeded().await;
        let err = service.remove(1).await.unwrap_err();
        assert!(matches!(err, SalesWebError::Integrity(_)));
        assert!(service.exists(1).await.unwrap());
    }
}
