//! Application bootstrap: service registration and the request pipeline.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use hyper::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::config::Settings;
use crate::controllers;
use crate::data::SalesWebContext;
use crate::error::{Result, SalesWebError};
use crate::localization::{localize, RequestLocalizationOptions};
use crate::metrics::{init_metrics, track_requests};
use crate::middleware::cookie_policy::cookie_policy;
use crate::middleware::exception::{handle_exceptions, panic_response};
use crate::middleware::hsts::add_hsts;
use crate::middleware::https::redirect_to_https;
use crate::middleware::static_files::{serve_static_files, web_root};
use crate::middleware::{
    CookiePolicyOptions, ExceptionHandler, ExceptionMode, Hsts, HttpsRedirection, SameSiteMode,
};
use crate::routing::{canonicalize_route, RouteTemplate, DEFAULT_ROUTE};
use crate::services::SeedingService;
use crate::state::AppState;

pub struct Startup {
    settings: Settings,
}

impl Startup {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Opens the database context and brings its schema up to date.
    pub async fn configure_services(&self) -> Result<AppState> {
        let context = SalesWebContext::open(&self.settings.connection_strings.sales_web_context)?;
        context.migrate().await?;
        Ok(AppState {
            context,
            environment: self.settings.environment,
        })
    }

    /// Builds the request pipeline. Development environments also get the
    /// seed data.
    pub async fn configure(&self, state: AppState) -> Result<Router> {
        if state.environment.is_development() {
            SeedingService::new(state.context.clone()).seed().await?;
        }
        build_app(&self.settings, state)
    }

    pub async fn run(self) -> Result<()> {
        if self.settings.metrics.enabled {
            init_metrics(&self.settings.metrics)?;
        }
        let state = self.configure_services().await?;
        let app = self.configure(state).await?;

        let server = &self.settings.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| SalesWebError::Config(format!("Invalid listen address: {e}")))?;
        info!(
            %addr,
            environment = %self.settings.environment,
            "SalesWeb listening on http://{addr}"
        );

        Server::bind(&addr)
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| SalesWebError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// The full application: MVC routes behind request metrics, localization,
/// exception handling, HSTS, HTTPS redirection, static files and the cookie
/// policy.
///
/// Trailing slashes are trimmed and controller and action names are matched
/// case-insensitively before the request reaches the route table.
pub fn build_app(settings: &Settings, state: AppState) -> Result<Router> {
    let environment = state.environment;

    let cookie_options = CookiePolicyOptions {
        check_consent_needed: true,
        minimum_same_site: SameSiteMode::None,
    };
    let localization = Arc::new(RequestLocalizationOptions::from_settings(&settings.localization)?);
    let exception_mode = if environment.is_development() {
        ExceptionMode::DeveloperPage
    } else {
        ExceptionMode::Handler
    };
    let exceptions = ExceptionHandler::new(exception_mode, cookie_options.clone());
    let hsts = Arc::new(Hsts::new(!environment.is_development()));
    let https = Arc::new(HttpsRedirection::new(settings.server.https_port));
    let files = web_root(&settings.server.web_root);

    let template = RouteTemplate::parse(DEFAULT_ROUTE)?;
    let (routes, names) = controllers::routes(template).into_parts();
    let mvc = ServiceBuilder::new()
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(from_fn_with_state(Arc::new(names), canonicalize_route))
        .service(routes.with_state::<()>(state));

    let pipeline = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request_id,
            )
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(from_fn(track_requests))
        .layer(from_fn_with_state(localization, localize))
        .layer(from_fn_with_state(exceptions, handle_exceptions))
        .layer(from_fn_with_state(hsts, add_hsts))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(https, redirect_to_https))
        .layer(from_fn_with_state(files, serve_static_files))
        .layer(from_fn_with_state(cookie_options, cookie_policy));

    Ok(Router::new().fallback_service(mvc).layer(pipeline))
}
