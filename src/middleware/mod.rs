//! Request pipeline stages that sit between the HTTP server and the
//! controllers.

pub mod cookie_policy;
pub mod exception;
pub mod hsts;
pub mod https;
pub mod static_files;

pub use cookie_policy::{CookieConsent, CookiePolicyOptions, SameSiteMode};
pub use exception::{ExceptionHandler, ExceptionMode};
pub use hsts::Hsts;
pub use https::HttpsRedirection;
