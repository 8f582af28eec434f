use axum::extract::{Form, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::NaiveDate;

use crate::error::{AppError, SalesWebError};
use crate::models::DepartmentForm;
use crate::services::DepartmentService;
use crate::templates::{
    render, DepartmentDeleteTemplate, DepartmentDetailsTemplate, DepartmentFormTemplate,
    DepartmentsIndexTemplate, SellerTotalRow, ViewContext,
};

const INDEX: &str = "/Departments";

fn not_found() -> Result<Response, AppError> {
    Ok(StatusCode::NOT_FOUND.into_response())
}

fn form_page(
    view: &ViewContext,
    heading: &str,
    action: String,
    form: DepartmentForm,
    name_error: String,
) -> Result<Response, AppError> {
    render(DepartmentFormTemplate {
        page: view.page(heading),
        heading: heading.to_string(),
        action,
        id: form.id,
        name: form.name,
        name_error,
    })
}

pub async fn index(view: ViewContext, service: DepartmentService) -> Result<Response, AppError> {
    let departments = service.find_all().await?;
    render(DepartmentsIndexTemplate {
        page: view.page("Departments"),
        departments,
    })
}

pub async fn details(
    view: ViewContext,
    service: DepartmentService,
    id: Option<Path<i64>>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return not_found();
    };
    let Some(department) = service.find_details(id).await? else {
        return not_found();
    };

    let sellers = department
        .sellers
        .iter()
        .map(|s| SellerTotalRow {
            id: s.id,
            name: s.name.clone(),
            email: s.email.clone(),
            total: view.total(s.total_sales(NaiveDate::MIN, NaiveDate::MAX)),
        })
        .collect();
    render(DepartmentDetailsTemplate {
        page: view.page("Details"),
        id: department.id,
        total: view.total(department.total_sales(NaiveDate::MIN, NaiveDate::MAX)),
        name: department.name,
        sellers,
    })
}

pub async fn create(view: ViewContext) -> Result<Response, AppError> {
    form_page(&view, "Create", format!("{INDEX}/Create"), DepartmentForm::default(), String::new())
}

pub async fn create_post(
    view: ViewContext,
    service: DepartmentService,
    Form(form): Form<DepartmentForm>,
) -> Result<Response, AppError> {
    let mut department = match form.validate() {
        Ok(department) => department,
        Err(message) => return form_page(&view, "Create", format!("{INDEX}/Create"), form, message),
    };
    service.insert(&mut department).await?;
    Ok(Redirect::to(INDEX).into_response())
}

pub async fn edit(
    view: ViewContext,
    service: DepartmentService,
    id: Option<Path<i64>>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return not_found();
    };
    let Some(department) = service.find_by_id(id).await? else {
        return not_found();
    };
    form_page(
        &view,
        "Edit",
        format!("{INDEX}/Edit/{id}"),
        DepartmentForm::from_department(&department),
        String::new(),
    )
}

pub async fn edit_post(
    view: ViewContext,
    service: DepartmentService,
    id: Option<Path<i64>>,
    Form(form): Form<DepartmentForm>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return not_found();
    };
    let department = match form.validate() {
        Ok(department) => department,
        Err(message) => return form_page(&view, "Edit", format!("{INDEX}/Edit/{id}"), form, message),
    };
    if department.id != id {
        return not_found();
    }
    match service.update(&department).await {
        Ok(()) => Ok(Redirect::to(INDEX).into_response()),
        Err(SalesWebError::NotFound(_)) => not_found(),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete(
    view: ViewContext,
    service: DepartmentService,
    id: Option<Path<i64>>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return not_found();
    };
    let Some(department) = service.find_by_id(id).await? else {
        return not_found();
    };
    render(DepartmentDeleteTemplate {
        page: view.page("Delete"),
        department,
        error: String::new(),
    })
}

/// Deletes the department. A department that still has sellers stays and
/// the confirmation page is shown again with the reason.
pub async fn delete_confirmed(
    view: ViewContext,
    service: DepartmentService,
    id: Option<Path<i64>>,
) -> Result<Response, AppError> {
    let Some(Path(id)) = id else {
        return not_found();
    };
    match service.remove(id).await {
        Ok(()) => Ok(Redirect::to(INDEX).into_response()),
        Err(SalesWebError::NotFound(_)) => not_found(),
        Err(SalesWebError::Integrity(message)) => {
            let Some(department) = service.find_by_id(id).await? else {
                return not_found();
            };
            let mut response = render(DepartmentDeleteTemplate {
                page: view.page("Delete"),
                department,
                error: message,
            })?;
            *response.status_mut() = StatusCode::CONFLICT;
            Ok(response)
        }
        Err(e) => Err(e.into()),
    }
}
