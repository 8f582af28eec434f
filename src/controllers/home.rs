use axum::response::Response;

use crate::error::AppError;
use crate::templates::{render, AboutTemplate, ContactTemplate, ErrorTemplate, HomeIndexTemplate, ViewContext};

pub async fn index(view: ViewContext) -> Result<Response, AppError> {
    render(HomeIndexTemplate {
        page: view.page("Home Page"),
    })
}

pub async fn about(view: ViewContext) -> Result<Response, AppError> {
    render(AboutTemplate {
        page: view.page("About"),
        message: "Sales Web MVC App from C# Course".to_string(),
    })
}

pub async fn contact(view: ViewContext) -> Result<Response, AppError> {
    render(ContactTemplate {
        page: view.page("Contact"),
        message: "Your contact page.".to_string(),
    })
}

pub async fn error(view: ViewContext) -> Result<Response, AppError> {
    render(ErrorTemplate {
        page: view.page("Error"),
        request_id: view.request_id.clone(),
        message: None,
    })
}
