//! Request counters and latency for the HTTP pipeline.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

use crate::metrics::{elapsed_secs, phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct HttpMetrics;

impl HttpMetrics {
    pub fn request_started() {
        ::metrics::gauge!(phase_metric!(gauge, "http", "requests_in_flight")).increment(1.0);
    }

    /// Counts a finished request by method and status class and records its
    /// latency. Status classes (`2xx`, `4xx`, ...) keep ids out of the labels.
    pub fn request_finished(method: &str, status: u16, duration_secs: f64) {
        let class = status_class(status);
        ::metrics::gauge!(phase_metric!(gauge, "http", "requests_in_flight")).decrement(1.0);
        ::metrics::counter!(
            phase_metric!(counter, "http", "requests"),
            "method" => method.to_string(),
            "status" => class
        )
        .increment(1);
        ::metrics::histogram!(
            phase_metric!(histogram, "http", "request_duration_seconds"),
            "method" => method.to_string()
        )
        .record(duration_secs);
        if status >= 500 {
            ::metrics::counter!(phase_metric!(counter, "http", "server_errors")).increment(1);
        }
    }
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Middleware recording every request that passes through the pipeline.
pub async fn track_requests(req: Request<Body>, next: Next<Body>) -> Response {
    let method = req.method().clone();
    let start = Instant::now();
    HttpMetrics::request_started();

    let response = next.run(req).await;

    HttpMetrics::request_finished(method.as_str(), response.status().as_u16(), elapsed_secs(start));
    response
}

impl PhaseMetrics for HttpMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge, histogram};

        let _ = counter!(phase_metric!(counter, "http", "requests"));
        let _ = counter!(phase_metric!(counter, "http", "server_errors"));
        let _ = histogram!(phase_metric!(histogram, "http", "request_duration_seconds"));
        let _ = gauge!(phase_metric!(gauge, "http", "requests_in_flight"));
    }

    fn phase_name() -> &'static str {
        "http"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "http", "requests"),
                metric_type: MetricType::Counter,
                help: "Requests handled, by method and status class",
                labels: vec!["method", "status"],
            },
            MetricDoc {
                name: phase_metric!(counter, "http", "server_errors"),
                metric_type: MetricType::Counter,
                help: "Responses with a 5xx status",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "http", "request_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent in the pipeline per request",
                labels: vec!["method"],
            },
            MetricDoc {
                name: phase_metric!(gauge, "http", "requests_in_flight"),
                metric_type: MetricType::Gauge,
                help: "Requests currently being handled",
                labels: vec![],
            },
        ]
    }
}
