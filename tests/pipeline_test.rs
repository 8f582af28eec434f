mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use common::{body_text, location, spawn_app, spawn_app_with, spawn_unmigrated_app, TestApp};
use sales_web::config::Environment;
use sales_web::error::{AppError, SalesWebError};
use sales_web::middleware::exception::{handle_exceptions, panic_response};
use sales_web::middleware::{CookiePolicyOptions, ExceptionHandler, ExceptionMode};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::catch_panic::CatchPanicLayer;

async fn panics() -> &'static str {
    panic!("boom")
}

async fn fails() -> Result<&'static str, AppError> {
    Err(SalesWebError::Config("connection refused".into()).into())
}

fn failing_router(mode: ExceptionMode) -> Router {
    Router::new()
        .route("/panic", get(panics))
        .route("/fail", get(fails))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(
                    ExceptionHandler::new(mode, CookiePolicyOptions::default()),
                    handle_exceptions,
                ))
                .layer(CatchPanicLayer::custom(panic_response)),
        )
}

async fn get_text(router: &Router, uri: &str) -> Result<(StatusCode, String)> {
    let response = router
        .clone()
        .oneshot(
            Request::get(uri)
                .header("x-request-id", "req-42")
                .body(Body::empty())?,
        )
        .await?;
    let status = response.status();
    Ok((status, body_text(response).await?))
}

#[tokio::test]
async fn developer_page_shows_error_details() -> Result<()> {
    let router = failing_router(ExceptionMode::DeveloperPage);

    let (status, html) = get_text(&router, "/fail").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.contains("ConfigError"));
    assert!(html.contains("connection refused"));
    assert!(html.contains("req-42"));

    let (status, html) = get_text(&router, "/panic").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.contains("TaskError"));
    assert!(html.contains("boom"));
    Ok(())
}

#[tokio::test]
async fn handler_mode_hides_error_details() -> Result<()> {
    let router = failing_router(ExceptionMode::Handler);

    for uri in ["/fail", "/panic"] {
        let (status, html) = get_text(&router, uri).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(html.contains("An error occurred while processing your request."));
        assert!(html.contains("req-42"));
        assert!(!html.contains("connection refused"));
        assert!(!html.contains("boom"));
    }
    Ok(())
}

#[tokio::test]
async fn handler_error_page_shows_consent_banner_until_accepted() -> Result<()> {
    let router = failing_router(ExceptionMode::Handler);

    let (_, html) = get_text(&router, "/fail").await?;
    assert!(html.contains(r#"id="cookieConsent""#));

    let response = router
        .clone()
        .oneshot(
            Request::get("/fail")
                .header(header::COOKIE, ".AspNet.Consent=yes")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = body_text(response).await?;
    assert!(html.contains("An error occurred while processing your request."));
    assert!(!html.contains(r#"id="cookieConsent""#));
    Ok(())
}

async fn https_get(app: &TestApp, host: &str) -> Result<axum::http::Response<axum::body::BoxBody>> {
    app.request(
        Request::get("/")
            .header(header::HOST, host)
            .header("x-forwarded-proto", "https")
            .body(Body::empty())?,
    )
    .await
}

#[tokio::test]
async fn hsts_only_on_https_outside_development() -> Result<()> {
    let app = spawn_app(Environment::Production).await?;
    let response = https_get(&app, "sales.example.com").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::STRICT_TRANSPORT_SECURITY],
        "max-age=2592000"
    );

    let response = app
        .request(
            Request::get("/")
                .header(header::HOST, "sales.example.com")
                .body(Body::empty())?,
        )
        .await?;
    assert!(!response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));

    for host in ["localhost:5001", "127.0.0.1:5001", "[::1]:5001"] {
        let response = https_get(&app, host).await?;
        assert!(!response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY), "{host}");
    }

    let app = spawn_app(Environment::Development).await?;
    let response = https_get(&app, "sales.example.com").await?;
    assert!(!response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
    Ok(())
}

#[tokio::test]
async fn database_failures_render_generic_error_view_in_production() -> Result<()> {
    let app = spawn_unmigrated_app(Environment::Production).await?;

    let response = app
        .request(
            Request::get("/Departments")
                .header("x-request-id", "req-7")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-request-id"], "req-7");
    assert_eq!(response.headers()[header::CONTENT_LANGUAGE], "en-US");
    let html = body_text(response).await?;
    assert!(html.contains("An error occurred while processing your request."));
    assert!(html.contains("req-7"));
    assert!(html.contains(r#"id="cookieConsent""#));
    assert!(!html.contains("no such table"));
    Ok(())
}

#[tokio::test]
async fn database_failures_show_details_in_development() -> Result<()> {
    let app = spawn_unmigrated_app(Environment::Development).await?;

    let response = app.get("/Sellers").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = body_text(response).await?;
    assert!(html.contains("no such table"));
    Ok(())
}

#[tokio::test]
async fn https_redirect_runs_before_static_files() -> Result<()> {
    let app = spawn_app_with(Environment::Production, |s| s.server.https_port = Some(5001)).await?;

    let response = app
        .request(
            Request::get("/css/site.css")
                .header(header::HOST, "localhost:5000")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response).as_deref(),
        Some("https://localhost:5001/css/site.css")
    );

    let response = app
        .request(
            Request::get("/css/site.css")
                .header(header::HOST, "localhost:5001")
                .header("x-forwarded-proto", "https")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("color: #222"));
    Ok(())
}

#[tokio::test]
async fn redirects_to_https_when_port_is_configured() -> Result<()> {
    let app = spawn_app_with(Environment::Production, |s| s.server.https_port = Some(5001)).await?;

    let response = app
        .request(
            Request::get("/Sellers?page=2")
                .header(header::HOST, "localhost:5000")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response).as_deref(),
        Some("https://localhost:5001/Sellers?page=2")
    );

    let response = app
        .request(
            Request::get("/")
                .header(header::HOST, "localhost:5001")
                .header("x-forwarded-proto", "https")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn plain_http_is_served_without_https_port() -> Result<()> {
    let app = spawn_app(Environment::Production).await?;
    let response = app
        .request(
            Request::get("/")
                .header(header::HOST, "localhost:5000")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[test]
fn pipeline_records_request_and_seeding_metrics() -> Result<()> {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            let app = spawn_app(Environment::Production).await?;
            assert_eq!(app.get("/").await?.status(), StatusCode::OK);
            assert_eq!(app.get("/Nope/Nothing").await?.status(), StatusCode::NOT_FOUND);
            anyhow::Ok(())
        })
    })?;

    let rendered = handle.render();
    assert!(rendered.contains(r#"salesweb_http_requests_total{method="GET",status="2xx"} 1"#));
    assert!(rendered.contains(r#"salesweb_http_requests_total{method="GET",status="4xx"} 1"#));
    assert!(rendered.contains("salesweb_http_request_duration_seconds"));
    assert!(rendered.contains(r#"salesweb_seeding_runs_total{result="seeded"} 1"#));
    assert!(rendered.contains(r#"salesweb_database_calls_total{outcome="ok"}"#));
    Ok(())
}
