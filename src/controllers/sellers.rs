use axum::extract::{Form, Path, Query};
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use url::form_urlencoded;

use crate::error::{AppError, SalesWebError};
use crate::models::{Department, SellerForm, ValidationErrors};
use crate::services::{DepartmentService, SellerService};
use crate::templates::{
    render, DepartmentOption, ErrorTemplate, SellerDeleteTemplate, SellerDetailsTemplate,
    SellerFormFields, SellerFormTemplate, SellerRow, SellersIndexTemplate, ViewContext,
};

const INDEX: &str = "/Sellers";

fn redirect_to_error(message: &str) -> Response {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("message", message)
        .finish();
    Redirect::to(&format!("{INDEX}/Error?{query}")).into_response()
}

/// Maps a service failure to the error redirect. Infrastructure failures
/// still go to the exception handler.
fn service_error(err: SalesWebError) -> Result<Response, AppError> {
    if err.is_application_error() {
        Ok(redirect_to_error(&err.to_string()))
    } else {
        Err(err.into())
    }
}

fn form_page(
    view: &ViewContext,
    heading: &str,
    action: String,
    form: SellerForm,
    errors: &ValidationErrors,
    departments: Vec<Department>,
) -> Result<Response, AppError> {
    let selected = form.department_id();
    let departments = departments
        .into_iter()
        .map(|d| DepartmentOption {
            selected: Some(d.id) == selected,
            id: d.id,
            name: d.name,
        })
        .collect();
    render(SellerFormTemplate {
        page: view.page(heading),
        heading: heading.to_string(),
        action,
        form: SellerFormFields {
            name_error: errors.for_field("name"),
            email_error: errors.for_field("email"),
            birth_date_error: errors.for_field("birth_date"),
            base_salary_error: errors.for_field("base_salary"),
            department_error: errors.for_field("department_id"),
            id: form.id,
            name: form.name,
            email: form.email,
            birth_date: form.birth_date,
            base_salary: form.base_salary,
        },
        departments,
    })
}

fn unknown_department() -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    errors.add("department_id", "Department not found");
    errors
}

pub async fn index(view: ViewContext, service: SellerService) -> Result<Response, AppError> {
    let sellers = service.find_all().await?;
    render(SellersIndexTemplate {
        page: view.page("Sellers"),
        sellers: sellers.iter().map(|s| SellerRow::new(s, &view)).collect(),
    })
}

pub async fn create(view: ViewContext, departments: DepartmentService) -> Result<Response, AppError> {
    let departments = departments.find_all().await?;
    form_page(
        &view,
        "Create Seller",
        format!("{INDEX}/Create"),
        SellerForm::default(),
        &ValidationErrors::default(),
        departments,
    )
}

pub async fn create_post(
    view: ViewContext,
    service: SellerService,
    departments: DepartmentService,
    Form(form): Form<SellerForm>,
) -> Result<Response, AppError> {
    let mut seller = match form.validate() {
        Ok(seller) => seller,
        Err(errors) => {
            let departments = departments.find_all().await?;
            return form_page(&view, "Create Seller", format!("{INDEX}/Create"), form, &errors, departments);
        }
    };
    if !departments.exists(seller.department_id).await? {
        let departments = departments.find_all().await?;
        return form_page(
            &view,
            "Create Seller",
            format!("{INDEX}/Create"),
            form,
            &unknown_department(),
            departments,
        );
    }
    match service.insert(&mut seller).await {
        Ok(()) => Ok(Redirect::to(INDEX).into_response()),
        Err(e) => service_error(e),
    }
}

pub async fn delete(
    view: ViewContext,
    service: SellerService,
    id: Option<Path<i64>>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return Ok(redirect_to_error("Id not provided"));
    };
    let Some(seller) = service.find_by_id(id).await? else {
        return Ok(redirect_to_error("Id not found"));
    };
    render(SellerDeleteTemplate {
        page: view.page("Delete"),
        seller: SellerRow::new(&seller, &view),
    })
}

pub async fn delete_post(service: SellerService, id: Option<Path<i64>>) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return Ok(redirect_to_error("Id not provided"));
    };
    match service.remove(id).await {
        Ok(()) => Ok(Redirect::to(INDEX).into_response()),
        Err(e) => service_error(e),
    }
}

pub async fn details(
    view: ViewContext,
    service: SellerService,
    id: Option<Path<i64>>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return Ok(redirect_to_error("Id not provided"));
    };
    let Some(seller) = service.find_with_sales(id).await? else {
        return Ok(redirect_to_error("Id not found"));
    };

    let today = Local::now().date_naive();
    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    render(SellerDetailsTemplate {
        page: view.page("Details"),
        year: today.year(),
        total_sales_year: view.total(seller.total_sales(year_start, today)),
        total_sales: view.total(seller.total_sales(NaiveDate::MIN, NaiveDate::MAX)),
        seller: SellerRow::new(&seller, &view),
    })
}

pub async fn edit(
    view: ViewContext,
    service: SellerService,
    departments: DepartmentService,
    id: Option<Path<i64>>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return Ok(redirect_to_error("Id not provided"));
    };
    let Some(seller) = service.find_by_id(id).await? else {
        return Ok(redirect_to_error("Id not found"));
    };
    let departments = departments.find_all().await?;
    form_page(
        &view,
        "Edit Seller",
        format!("{INDEX}/Edit/{id}"),
        SellerForm::from_seller(&seller),
        &ValidationErrors::default(),
        departments,
    )
}

pub async fn edit_post(
    view: ViewContext,
    service: SellerService,
    departments: DepartmentService,
    id: Option<Path<i64>>,
    Form(form): Form<SellerForm>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return Ok(redirect_to_error("Id not provided"));
    };
    let seller = match form.validate() {
        Ok(seller) => seller,
        Err(errors) => {
            let departments = departments.find_all().await?;
            return form_page(&view, "Edit Seller", format!("{INDEX}/Edit/{id}"), form, &errors, departments);
        }
    };
    if form.id() != Some(id) {
        return Ok(redirect_to_error("Id mismatch"));
    }
    if !departments.exists(seller.department_id).await? {
        let departments = departments.find_all().await?;
        return form_page(
            &view,
            "Edit Seller",
            format!("{INDEX}/Edit/{id}"),
            form,
            &unknown_department(),
            departments,
        );
    }
    match service.update(&seller).await {
        Ok(()) => Ok(Redirect::to(INDEX).into_response()),
        Err(e) => service_error(e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorQuery {
    message: Option<String>,
}

pub async fn error(view: ViewContext, Query(query): Query<ErrorQuery>) -> Result<Response, AppError> {
    render(ErrorTemplate {
        page: view.page("Error"),
        request_id: view.request_id.clone(),
        message: query.message,
    })
}
