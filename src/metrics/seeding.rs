//! Seeding metrics.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct SeedingMetrics;

impl SeedingMetrics {
    pub fn record_seeded(departments: usize, sellers: usize, sales: usize) {
        ::metrics::counter!(phase_metric!(counter, "seeding", "runs"), "result" => "seeded")
            .increment(1);
        ::metrics::counter!(phase_metric!(counter, "seeding", "rows"), "table" => "departments")
            .increment(departments as u64);
        ::metrics::counter!(phase_metric!(counter, "seeding", "rows"), "table" => "sellers")
            .increment(sellers as u64);
        ::metrics::counter!(phase_metric!(counter, "seeding", "rows"), "table" => "sales_records")
            .increment(sales as u64);
    }

    pub fn record_skipped() {
        ::metrics::counter!(phase_metric!(counter, "seeding", "runs"), "result" => "skipped")
            .increment(1);
    }
}

impl PhaseMetrics for SeedingMetrics {
    fn register_metrics() {
        use metrics::counter;

        let _ = counter!(phase_metric!(counter, "seeding", "runs"));
        let _ = counter!(phase_metric!(counter, "seeding", "rows"));
    }

    fn phase_name() -> &'static str {
        "seeding"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "seeding", "runs"),
                metric_type: MetricType::Counter,
                help: "Seeding runs, by whether data was inserted or already present",
                labels: vec!["result"],
            },
            MetricDoc {
                name: phase_metric!(counter, "seeding", "rows"),
                metric_type: MetricType::Counter,
                help: "Rows inserted by seeding, by table",
                labels: vec!["table"],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_metrics_documentation() {
        let docs = SeedingMetrics::metrics_documentation();
        assert_eq!(docs.len(), 2);
        for doc in docs {
            assert!(doc.name.starts_with("salesweb_seeding_"));
        }
    }

    #[test]
    fn seeded_rows_are_counted_per_table() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            SeedingMetrics::record_seeded(4, 6, 30);
            SeedingMetrics::record_skipped();
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"salesweb_seeding_rows_total{table="sellers"} 6"#));
        assert!(rendered.contains(r#"salesweb_seeding_rows_total{table="sales_records"} 30"#));
        assert!(rendered.contains(r#"salesweb_seeding_runs_total{result="skipped"} 1"#));
    }
}
