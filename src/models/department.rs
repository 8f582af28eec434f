use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Seller;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub sellers: Vec<Seller>,
}

impl Department {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sellers: Vec::new(),
        }
    }

    pub fn add_seller(&mut self, seller: Seller) {
        self.sellers.push(seller);
    }

    /// Sum of every seller's sales dated within `[initial, final_date]`.
    pub fn total_sales(&self, initial: NaiveDate, final_date: NaiveDate) -> f64 {
        self.sellers
            .iter()
            .map(|seller| seller.total_sales(initial, final_date))
            .sum()
    }
}

/// Form input for creating or editing a department.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DepartmentForm {
    pub id: String,
    pub name: String,
}

impl DepartmentForm {
    pub fn from_department(department: &Department) -> Self {
        Self {
            id: department.id.to_string(),
            name: department.name.clone(),
        }
    }

    /// Returns the department or the validation message for the name field.
    pub fn validate(&self) -> Result<Department, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name required".to_string());
        }
        let id = self.id.trim().parse().unwrap_or_default();
        Ok(Department::new(id, name))
    }
}
