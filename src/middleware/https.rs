use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Redirects plain HTTP requests to HTTPS when an HTTPS port is known.
#[derive(Debug, Default)]
pub struct HttpsRedirection {
    https_port: Option<u16>,
    warned: AtomicBool,
}

impl HttpsRedirection {
    pub fn new(https_port: Option<u16>) -> Self {
        Self {
            https_port,
            warned: AtomicBool::new(false),
        }
    }

    /// Target URL for a request, or `None` when it should pass through.
    pub fn target(&self, scheme: &str, host: Option<&str>, path_and_query: &str) -> Option<String> {
        if scheme.eq_ignore_ascii_case("https") {
            return None;
        }
        let Some(port) = self.https_port else {
            if !self.warned.swap(true, Ordering::Relaxed) {
                warn!("Failed to determine the https port for redirect.");
            }
            return None;
        };
        let host = host_name(host?);
        Some(if port == 443 {
            format!("https://{host}{path_and_query}")
        } else {
            format!("https://{host}:{port}{path_and_query}")
        })
    }
}

/// `Host` without its port. Bracketed IPv6 literals keep their brackets.
pub fn host_name(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, port)| {
        if port.chars().all(|c| c.is_ascii_digit()) {
            name
        } else {
            host
        }
    })
}

/// Request scheme, preferring `X-Forwarded-Proto` from a proxy.
pub fn request_scheme<B>(req: &Request<B>) -> &str {
    req.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().scheme_str())
        .unwrap_or("http")
}

pub fn request_host<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
}

pub async fn redirect_to_https(
    State(redirection): State<Arc<HttpsRedirection>>,
    req: Request<Body>,
    next: Next<Body>,
) -> Response {
    let scheme = request_scheme(&req);
    let host = request_host(&req);
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    match redirection.target(scheme, host, path_and_query) {
        Some(location) => Redirect::temporary(&location).into_response(),
        None => next.run(req).await,
    }
}
