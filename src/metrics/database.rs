//! Database context call metrics.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct DatabaseMetrics;

impl DatabaseMetrics {
    pub fn record_call_success(duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "database", "calls"), "outcome" => "ok")
            .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "database", "call_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_call_error(duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "database", "calls"), "outcome" => "error")
            .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "database", "call_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_migrations_applied(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "database", "migrations_applied"))
            .increment(count as u64);
    }
}

impl PhaseMetrics for DatabaseMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "database", "calls"));
        let _ = counter!(phase_metric!(counter, "database", "migrations_applied"));
        let _ = histogram!(phase_metric!(histogram, "database", "call_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "database"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "database", "calls"),
                metric_type: MetricType::Counter,
                help: "Calls run against the database context, by outcome",
                labels: vec!["outcome"],
            },
            MetricDoc {
                name: phase_metric!(counter, "database", "migrations_applied"),
                metric_type: MetricType::Counter,
                help: "Schema migrations applied since start",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "database", "call_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Duration of database calls in seconds, including the wait for the connection",
                labels: vec![],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_metrics_registration() {
        DatabaseMetrics::register_metrics();
    }

    #[test]
    fn test_metrics_documentation() {
        let docs = DatabaseMetrics::metrics_documentation();
        assert_eq!(docs.len(), 3);
        for doc in docs {
            assert!(doc.name.starts_with("salesweb_database_"));
        }
    }
}
