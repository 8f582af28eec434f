//! Turns unhandled handler errors and panics into error pages.

use askama::Template;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use std::any::Any;
use tracing::error;

use crate::error::{AppError, ErrorReport};
use crate::middleware::cookie_policy::CookiePolicyOptions;
use crate::templates::{DeveloperErrorTemplate, ErrorTemplate, ViewContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionMode {
    /// Full error details, for development.
    DeveloperPage,
    /// Generic error view with the request id only.
    Handler,
}

/// State of [`handle_exceptions`].
///
/// The handler wraps the cookie policy stage, so the consent banner on the
/// error view is resolved here from the request cookies.
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    pub mode: ExceptionMode,
    pub cookie_policy: CookiePolicyOptions,
}

impl ExceptionHandler {
    pub fn new(mode: ExceptionMode, cookie_policy: CookiePolicyOptions) -> Self {
        Self { mode, cookie_policy }
    }
}

/// `CatchPanicLayer` callback: a panic becomes the same 500 response an
/// `AppError` produces, so `handle_exceptions` renders it.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    AppError::panic(format!("Request handler panicked: {message}")).into_response()
}

pub async fn handle_exceptions(
    State(handler): State<ExceptionHandler>,
    mut view: ViewContext,
    req: Request<Body>,
    next: Next<Body>,
) -> Response {
    view.consent = handler.cookie_policy.consent_for(req.headers());
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    let request_id = view.request_id.clone().unwrap_or_default();
    error!(
        kind = report.kind,
        request_id = %request_id,
        %method,
        %path,
        "Unhandled error: {}",
        report.message
    );

    let rendered = match handler.mode {
        ExceptionMode::DeveloperPage => DeveloperErrorTemplate {
            kind: report.kind.to_string(),
            message: report.message,
            method,
            path,
            request_id,
        }
        .render(),
        ExceptionMode::Handler => ErrorTemplate {
            page: view.page("Error"),
            request_id: view.request_id.clone(),
            message: None,
        }
        .render(),
    };

    match rendered {
        Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render error page: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
