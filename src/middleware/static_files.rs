use axum::body::{boxed, Body};
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// File server for the web root. Directories never resolve to an index file.
pub fn web_root(path: impl AsRef<Path>) -> ServeDir {
    ServeDir::new(path).append_index_html_on_directories(false)
}

/// Middleware: answers `GET`/`HEAD` requests for existing files under the
/// web root and lets everything else continue down the pipeline.
pub async fn serve_static_files(
    State(files): State<ServeDir>,
    req: Request<Body>,
    next: Next<Body>,
) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return next.run(req).await;
    }

    let mut lookup = Request::builder()
        .method(req.method().clone())
        .uri(req.uri().clone())
        .version(req.version());
    if let Some(headers) = lookup.headers_mut() {
        headers.extend(req.headers().iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let Ok(lookup) = lookup.body(Body::empty()) else {
        return next.run(req).await;
    };

    match files.oneshot(lookup).await {
        Ok(res) if res.status() != StatusCode::NOT_FOUND => res.map(boxed),
        Ok(_) => next.run(req).await,
        Err(never) => match never {},
    }
}
