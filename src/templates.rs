use askama::Template;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Response};
use chrono::{Datelike, Local, NaiveDate};
use std::convert::Infallible;

use crate::error::AppError;
use crate::localization::{format_date, Culture, RequestCulture};
use crate::middleware::cookie_policy::{CookieConsent, CONSENT_COOKIE_STRING};
use crate::models::{Department, SalesRecord, Seller};

/// Value format of `<input type="date">`.
pub const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn input_date(date: NaiveDate) -> String {
    date.format(INPUT_DATE_FORMAT).to_string()
}

pub fn render<T: Template>(template: T) -> Result<Response, AppError> {
    Ok(Html(template.render()?).into_response())
}

/// Data the shared layout needs on every page.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    pub show_consent_banner: bool,
    pub consent_cookie: &'static str,
    pub culture: &'static str,
    pub year: i32,
}

/// Per-request view data: culture, cookie consent and request id.
#[derive(Debug, Clone)]
pub struct ViewContext {
    pub culture: Culture,
    pub consent: CookieConsent,
    pub request_id: Option<String>,
}

impl ViewContext {
    pub fn page(&self, title: &str) -> Page {
        Page {
            title: title.to_string(),
            show_consent_banner: self.consent.needed && !self.consent.granted,
            consent_cookie: CONSENT_COOKIE_STRING,
            culture: self.culture.name,
            year: Local::now().year(),
        }
    }

    pub fn amount(&self, value: f64) -> String {
        self.culture.format_fixed(value, 2)
    }

    pub fn total(&self, value: f64) -> String {
        self.culture.format_number(value, 2)
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for ViewContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let culture = parts
            .extensions
            .get::<RequestCulture>()
            .map(|c| c.culture.clone())
            .unwrap_or_default();
        let consent = parts.extensions.get::<CookieConsent>().copied().unwrap_or_default();
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Self {
            culture,
            consent,
            request_id,
        })
    }
}

// Home

#[derive(Template)]
#[template(path = "home/index.html")]
pub struct HomeIndexTemplate {
    pub page: Page,
}

#[derive(Template)]
#[template(path = "home/about.html")]
pub struct AboutTemplate {
    pub page: Page,
    pub message: String,
}

#[derive(Template)]
#[template(path = "home/contact.html")]
pub struct ContactTemplate {
    pub page: Page,
    pub message: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub page: Page,
    pub request_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "developer_error.html")]
pub struct DeveloperErrorTemplate {
    pub kind: String,
    pub message: String,
    pub method: String,
    pub path: String,
    pub request_id: String,
}

// Departments

#[derive(Template)]
#[template(path = "departments/index.html")]
pub struct DepartmentsIndexTemplate {
    pub page: Page,
    pub departments: Vec<Department>,
}

pub struct SellerTotalRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub total: String,
}

#[derive(Template)]
#[template(path = "departments/details.html")]
pub struct DepartmentDetailsTemplate {
    pub page: Page,
    pub id: i64,
    pub name: String,
    pub sellers: Vec<SellerTotalRow>,
    pub total: String,
}

#[derive(Template)]
#[template(path = "departments/form.html")]
pub struct DepartmentFormTemplate {
    pub page: Page,
    pub heading: String,
    pub action: String,
    pub id: String,
    pub name: String,
    pub name_error: String,
}

#[derive(Template)]
#[template(path = "departments/delete.html")]
pub struct DepartmentDeleteTemplate {
    pub page: Page,
    pub department: Department,
    pub error: String,
}

// Sellers

pub struct SellerRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub birth_date: String,
    pub base_salary: String,
    pub department: String,
}

impl SellerRow {
    pub fn new(seller: &Seller, view: &ViewContext) -> Self {
        Self {
            id: seller.id,
            name: seller.name.clone(),
            email: seller.email.clone(),
            birth_date: format_date(seller.birth_date),
            base_salary: view.amount(seller.base_salary),
            department: seller.department_name().to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "sellers/index.html")]
pub struct SellersIndexTemplate {
    pub page: Page,
    pub sellers: Vec<SellerRow>,
}

pub struct DepartmentOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

pub struct SellerFormFields {
    pub id: String,
    pub name: String,
    pub email: String,
    pub birth_date: String,
    pub base_salary: String,
    pub name_error: String,
    pub email_error: String,
    pub birth_date_error: String,
    pub base_salary_error: String,
    pub department_error: String,
}

#[derive(Template)]
#[template(path = "sellers/form.html")]
pub struct SellerFormTemplate {
    pub page: Page,
    pub heading: String,
    pub action: String,
    pub form: SellerFormFields,
    pub departments: Vec<DepartmentOption>,
}

#[derive(Template)]
#[template(path = "sellers/details.html")]
pub struct SellerDetailsTemplate {
    pub page: Page,
    pub seller: SellerRow,
    pub year: i32,
    pub total_sales_year: String,
    pub total_sales: String,
}

#[derive(Template)]
#[template(path = "sellers/delete.html")]
pub struct SellerDeleteTemplate {
    pub page: Page,
    pub seller: SellerRow,
}

// Sales records

pub struct SalesRecordRow {
    pub id: i64,
    pub date: String,
    pub amount: String,
    pub status: String,
    pub seller: String,
    pub department: String,
}

impl SalesRecordRow {
    pub fn new(record: &SalesRecord, view: &ViewContext) -> Self {
        let seller = record.seller.as_ref();
        Self {
            id: record.id,
            date: format_date(record.date),
            amount: view.amount(record.amount),
            status: record.status.to_string(),
            seller: seller.map(|s| s.name.clone()).unwrap_or_default(),
            department: seller.map(|s| s.department_name().to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "sales_records/index.html")]
pub struct SalesRecordsIndexTemplate {
    pub page: Page,
    pub min_date: String,
    pub max_date: String,
}

#[derive(Template)]
#[template(path = "sales_records/simple_search.html")]
pub struct SimpleSearchTemplate {
    pub page: Page,
    pub min_date: String,
    pub max_date: String,
    pub records: Vec<SalesRecordRow>,
    pub total: String,
}

pub struct SalesGroupView {
    pub department: String,
    pub total: String,
    pub records: Vec<SalesRecordRow>,
}

#[derive(Template)]
#[template(path = "sales_records/grouping_search.html")]
pub struct GroupingSearchTemplate {
    pub page: Page,
    pub generated_at: String,
    pub min_date: String,
    pub max_date: String,
    pub groups: Vec<SalesGroupView>,
}
