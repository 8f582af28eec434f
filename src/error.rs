use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesWebError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Integrity(String),

    #[error("{0}")]
    DbConcurrency(String),

    #[error("Migration '{id}' failed: {message}")]
    Migration { id: String, message: String },

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl SalesWebError {
    /// Short name of the error variant, shown on the developer error page.
    pub fn kind(&self) -> &'static str {
        match self {
            SalesWebError::Database(_) => "DatabaseError",
            SalesWebError::Io(_) => "IoError",
            SalesWebError::Toml(_) => "TomlError",
            SalesWebError::Config(_) => "ConfigError",
            SalesWebError::NotFound(_) => "NotFoundError",
            SalesWebError::Integrity(_) => "IntegrityError",
            SalesWebError::DbConcurrency(_) => "DbConcurrencyError",
            SalesWebError::Migration { .. } => "MigrationError",
            SalesWebError::Template(_) => "TemplateError",
            SalesWebError::Task(_) => "TaskError",
        }
    }

    /// Errors raised by the services on purpose, as opposed to infrastructure failures.
    pub fn is_application_error(&self) -> bool {
        matches!(
            self,
            SalesWebError::NotFound(_) | SalesWebError::Integrity(_) | SalesWebError::DbConcurrency(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SalesWebError>;

/// Details of an unhandled error, attached to the 500 response so the
/// exception-handling middleware can render it.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

/// Error type returned by request handlers.
#[derive(Debug)]
pub struct AppError(pub SalesWebError);

impl AppError {
    pub fn panic(message: impl Into<String>) -> Self {
        AppError(SalesWebError::Task(message.into()))
    }
}

impl<E> From<E> for AppError
where
    E: Into<SalesWebError>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            SalesWebError::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
            err => {
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                response.extensions_mut().insert(ErrorReport {
                    kind: err.kind(),
                    message: err.to_string(),
                });
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_plain_404() {
        let response = AppError(SalesWebError::NotFound("Id not found".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_none());
    }

    #[test]
    fn other_errors_carry_a_report() {
        let response = AppError(SalesWebError::Integrity("Can't delete".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.kind, "IntegrityError");
        assert_eq!(report.message, "Can't delete");
    }

    #[test]
    fn application_errors_are_flagged() {
        assert!(SalesWebError::DbConcurrency("x".into()).is_application_error());
        assert!(!SalesWebError::Config("x".into()).is_application_error());
    }
}
