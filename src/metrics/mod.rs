//! Prometheus metrics for the request pipeline, the database context and
//! seeding.
//!
//! Each area owns its metric names in a submodule. Recording through the
//! `metrics` macros is a no-op until [`init_metrics`] installs the exporter.

pub mod database;
pub mod http;
pub mod seeding;

pub use database::DatabaseMetrics;
pub use http::{track_requests, HttpMetrics};
pub use seeding::SeedingMetrics;

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::MetricsSettings;
use crate::error::{Result, SalesWebError};

static INIT: Once = Once::new();

/// Installs the Prometheus recorder with its HTTP listener and registers
/// every metric. Only the first call does anything.
///
/// Must run inside a tokio runtime; the listener is spawned onto it.
pub fn init_metrics(settings: &MetricsSettings) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|e| SalesWebError::Config(format!("Invalid metrics address: {e}")))?;

    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                register_all_metrics();
                info!("Prometheus exporter listening on http://{addr}/metrics");
            }
            Err(e) => warn!("Failed to install Prometheus exporter: {e}"),
        }
    });
    Ok(())
}

pub fn register_all_metrics() {
    HttpMetrics::register_metrics();
    DatabaseMetrics::register_metrics();
    SeedingMetrics::register_metrics();
}

pub fn all_metrics_documentation() -> Vec<MetricDoc> {
    let mut docs = HttpMetrics::metrics_documentation();
    docs.extend(DatabaseMetrics::metrics_documentation());
    docs.extend(SeedingMetrics::metrics_documentation());
    docs
}

/// One metrics area (http, database, seeding).
pub trait PhaseMetrics {
    /// Touches every metric so it shows up on `/metrics` before first use.
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Builds `salesweb_{phase}_{name}`, with `_total` appended for counters.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("salesweb_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("salesweb_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("salesweb_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

/// Elapsed seconds since `start`, for histogram samples.
pub fn elapsed_secs(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn metric_names_are_unique() {
        let docs = all_metrics_documentation();
        let names: HashSet<_> = docs.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), docs.len());
    }

    #[test]
    fn counters_end_in_total() {
        for doc in all_metrics_documentation() {
            assert!(doc.name.starts_with("salesweb_"));
            assert_eq!(
                doc.metric_type == MetricType::Counter,
                doc.name.ends_with("_total"),
                "{}",
                doc.name
            );
        }
    }

    #[test]
    fn registration_without_recorder_is_harmless() {
        register_all_metrics();
    }

    #[test]
    fn rejects_bad_listen_address() {
        let settings = MetricsSettings {
            enabled: true,
            host: "not a host".to_string(),
            port: 9898,
        };
        assert!(matches!(init_metrics(&settings), Err(SalesWebError::Config(_))));
    }
}
