use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Department, SalesRecord};

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 60;
pub const BASE_SALARY_MIN: f64 = 100.0;
pub const BASE_SALARY_MAX: f64 = 50000.0;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seller {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub base_salary: f64,
    pub department_id: i64,
    #[serde(skip)]
    pub department: Option<Department>,
    #[serde(skip)]
    pub sales: Vec<SalesRecord>,
}

impl Seller {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
        birth_date: NaiveDate,
        base_salary: f64,
        department_id: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            birth_date,
            base_salary,
            department_id,
            department: None,
            sales: Vec::new(),
        }
    }

    pub fn add_sales(&mut self, record: SalesRecord) {
        self.sales.push(record);
    }

    pub fn remove_sales(&mut self, record_id: i64) -> Option<SalesRecord> {
        let index = self.sales.iter().position(|r| r.id == record_id)?;
        Some(self.sales.remove(index))
    }

    /// Sum of the amounts of sales dated within `[initial, final_date]`,
    /// whatever their status.
    pub fn total_sales(&self, initial: NaiveDate, final_date: NaiveDate) -> f64 {
        self.sales
            .iter()
            .filter(|r| r.within(initial, final_date))
            .map(|r| r.amount)
            .sum()
    }

    pub fn department_name(&self) -> &str {
        self.department.as_ref().map_or("", |d| d.name.as_str())
    }
}

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// All messages for `field` joined into one line; empty when valid.
    pub fn for_field(&self, field: &str) -> String {
        self.errors
            .get(field)
            .map(|messages| messages.join(" "))
            .unwrap_or_default()
    }
}

/// Raw seller form as posted by the browser. Every field arrives as text so
/// bad input is reported as a validation message instead of a rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SellerForm {
    pub id: String,
    pub name: String,
    pub email: String,
    pub birth_date: String,
    pub base_salary: String,
    pub department_id: String,
}

impl SellerForm {
    pub fn from_seller(seller: &Seller) -> Self {
        Self {
            id: seller.id.to_string(),
            name: seller.name.clone(),
            email: seller.email.clone(),
            birth_date: seller.birth_date.format("%Y-%m-%d").to_string(),
            base_salary: format!("{:.2}", seller.base_salary),
            department_id: seller.department_id.to_string(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id.trim().parse().ok()
    }

    pub fn department_id(&self) -> Option<i64> {
        self.department_id.trim().parse().ok()
    }

    pub fn validate(&self) -> Result<Seller, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name required");
        } else {
            let len = name.chars().count();
            if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
                errors.add(
                    "name",
                    format!("Name size should be between {NAME_MIN_LEN} and {NAME_MAX_LEN}"),
                );
            }
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", "Email required");
        } else if !EMAIL_RE.is_match(email) {
            errors.add("email", "Enter a valid email");
        }

        let birth_date = match self.birth_date.trim() {
            "" => {
                errors.add("birth_date", "Birth Date required");
                None
            }
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("birth_date", "Birth Date is not a valid date");
                    None
                }
            },
        };

        let base_salary = match self.base_salary.trim() {
            "" => {
                errors.add("base_salary", "Base Salary required");
                None
            }
            raw => match raw.parse::<f64>() {
                Ok(value) if (BASE_SALARY_MIN..=BASE_SALARY_MAX).contains(&value) => Some(value),
                Ok(_) => {
                    errors.add(
                        "base_salary",
                        format!("Base Salary must be from {BASE_SALARY_MIN} to {BASE_SALARY_MAX}"),
                    );
                    None
                }
                Err(_) => {
                    errors.add("base_salary", "Base Salary is not a valid number");
                    None
                }
            },
        };

        let department_id = self.department_id();
        if department_id.is_none() {
            errors.add("department_id", "Department required");
        }

        match (birth_date, base_salary, department_id) {
            (Some(birth_date), Some(base_salary), Some(department_id)) if errors.is_empty() => {
                Ok(Seller::new(
                    self.id().unwrap_or_default(),
                    name,
                    email,
                    birth_date,
                    base_salary,
                    department_id,
                ))
            }
            _ => Err(errors),
        }
    }
}
