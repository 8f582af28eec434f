//! `Strict-Transport-Security` for responses served over HTTPS.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::middleware::https::{host_name, request_host, request_scheme};

/// 30 days.
pub const HSTS_HEADER: &str = "max-age=2592000";

const EXCLUDED_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

#[derive(Debug, Clone)]
pub struct Hsts {
    enabled: bool,
    value: HeaderValue,
    excluded_hosts: Vec<String>,
}

impl Hsts {
    /// HSTS with the 30 day max-age. Loopback hosts never get the header.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            value: HeaderValue::from_static(HSTS_HEADER),
            excluded_hosts: EXCLUDED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn applies(&self, scheme: &str, host: Option<&str>) -> bool {
        if !self.enabled || !scheme.eq_ignore_ascii_case("https") {
            return false;
        }
        let Some(host) = host else {
            return false;
        };
        let name = host_name(host);
        !self.excluded_hosts.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}

pub async fn add_hsts(State(hsts): State<Arc<Hsts>>, req: Request<Body>, next: Next<Body>) -> Response {
    let applies = hsts.applies(request_scheme(&req), request_host(&req));
    let mut response = next.run(req).await;
    if applies && !response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY) {
        response
            .headers_mut()
            .insert(header::STRICT_TRANSPORT_SECURITY, hsts.value.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_https_requests_get_the_header() {
        let hsts = Hsts::new(true);
        assert!(hsts.applies("https", Some("sales.example.com")));
        assert!(hsts.applies("HTTPS", Some("sales.example.com:5001")));
        assert!(!hsts.applies("http", Some("sales.example.com")));
        assert!(!hsts.applies("https", None));
    }

    #[test]
    fn loopback_hosts_are_excluded() {
        let hsts = Hsts::new(true);
        assert!(!hsts.applies("https", Some("localhost:5001")));
        assert!(!hsts.applies("https", Some("LOCALHOST")));
        assert!(!hsts.applies("https", Some("127.0.0.1:5001")));
        assert!(!hsts.applies("https", Some("[::1]:5001")));
    }

    #[test]
    fn disabled_never_applies() {
        assert!(!Hsts::new(false).applies("https", Some("sales.example.com")));
    }
}
