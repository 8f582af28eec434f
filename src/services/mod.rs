//! Business services. Each one is built per request from [`AppState`] by its
//! extractor and holds a handle to the shared database context.

pub mod department_service;
pub mod sales_record_service;
pub mod seeding_service;
pub mod seller_service;

pub use department_service::DepartmentService;
pub use sales_record_service::{SalesGroup, SalesRecordService};
pub use seeding_service::SeedingService;
pub use seller_service::SellerService;

use crate::state::AppState;

/// Implements `FromRequestParts<AppState>` so handlers can take the service
/// as an argument and get a fresh instance for the current request.
macro_rules! request_scoped {
    ($($service:ty),+ $(,)?) => {
        $(
            #[async_trait::async_trait]
            impl axum::extract::FromRequestParts<AppState> for $service {
                type Rejection = std::convert::Infallible;

                async fn from_request_parts(
                    _parts: &mut axum::http::request::Parts,
                    state: &AppState,
                ) -> Result<Self, Self::Rejection> {
                    Ok(<$service>::new(state.context.clone()))
                }
            }
        )+
    };
}

request_scoped!(SeedingService, SellerService, DepartmentService, SalesRecordService);

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
