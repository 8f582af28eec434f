use crate::config::Environment;
use crate::data::SalesWebContext;

/// Shared application state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub context: SalesWebContext,
    pub environment: Environment,
}
