pub mod config;
pub mod controllers;
pub mod data;
pub mod error;
pub mod localization;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routing;
pub mod services;
pub mod startup;
pub mod state;
pub mod templates;

pub use config::{Environment, Settings};
pub use error::{Result, SalesWebError};
pub use startup::{build_app, Startup};
