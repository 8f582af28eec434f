#![allow(dead_code)]

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use sales_web::config::{Environment, Settings};
use sales_web::data::SalesWebContext;
use sales_web::services::SeedingService;
use sales_web::state::AppState;
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub context: SalesWebContext,
    _web_root: TempDir,
}

pub async fn spawn_app(environment: Environment) -> Result<TestApp> {
    spawn_app_with(environment, |_| {}).await
}

/// Seeded in-memory database plus a temporary web root holding
/// `css/site.css`.
pub async fn spawn_app_with(environment: Environment, configure: impl FnOnce(&mut Settings)) -> Result<TestApp> {
    build(environment, configure, true).await
}

/// Same app over an in-memory database that was never migrated, so every
/// query fails.
pub async fn spawn_unmigrated_app(environment: Environment) -> Result<TestApp> {
    build(environment, |_| {}, false).await
}

async fn build(
    environment: Environment,
    configure: impl FnOnce(&mut Settings),
    migrate: bool,
) -> Result<TestApp> {
    let web_root = tempfile::tempdir()?;
    fs::create_dir_all(web_root.path().join("css"))?;
    fs::write(web_root.path().join("css/site.css"), "body { color: #222; }")?;

    let mut settings = Settings::default();
    settings.environment = environment;
    settings.server.web_root = web_root.path().to_path_buf();
    configure(&mut settings);

    let context = SalesWebContext::open_in_memory()?;
    if migrate {
        context.migrate().await?;
        SeedingService::new(context.clone()).seed().await?;
    }

    let state = AppState {
        context: context.clone(),
        environment,
    };
    let router = sales_web::build_app(&settings, state)?;
    Ok(TestApp {
        router,
        context,
        _web_root: web_root,
    })
}

impl TestApp {
    pub async fn request(&self, req: Request<Body>) -> Result<Response<axum::body::BoxBody>> {
        Ok(self.router.clone().oneshot(req).await?)
    }

    pub async fn get(&self, uri: &str) -> Result<Response<axum::body::BoxBody>> {
        self.request(Request::get(uri).body(Body::empty())?).await
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> Result<Response<axum::body::BoxBody>> {
        self.request(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))?,
        )
        .await
    }
}

pub async fn body_text(response: Response<axum::body::BoxBody>) -> Result<String> {
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn location(response: &Response<axum::body::BoxBody>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
