//! Conventional routing: expands a `{controller=Home}/{action=Index}/{id?}`
//! style template into the concrete paths registered with axum.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Uri};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SalesWebError};
use crate::state::AppState;

pub const DEFAULT_ROUTE: &str = "{controller=Home}/{action=Index}/{id?}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSegment {
    pub name: String,
    pub default: Option<String>,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    segments: Vec<RouteSegment>,
}

impl RouteTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| SalesWebError::Config(format!("Invalid route template '{template}': {reason}"));

        let mut segments = Vec::new();
        for raw in template.trim_matches('/').split('/') {
            let inner = raw
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| invalid("every segment must be a {parameter}"))?;
            let (inner, optional) = match inner.strip_suffix('?') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            let (name, default) = match inner.split_once('=') {
                Some((name, default)) => (name, Some(default.to_string())),
                None => (inner, None),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid("parameter names must be alphanumeric"));
            }
            if optional && default.is_some() {
                return Err(invalid("a parameter cannot be both optional and have a default"));
            }
            segments.push(RouteSegment {
                name: name.to_string(),
                default,
                optional,
            });
        }

        for name in ["controller", "action"] {
            if !segments.iter().any(|s| s.name == name) {
                return Err(invalid(&format!("missing {{{name}}}")));
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// Every path that reaches `controller`/`action`. Trailing segments with
    /// a matching default or marked optional may be left out; parameters
    /// other than controller and action become axum captures.
    pub fn paths(&self, controller: &str, action: &str) -> Vec<String> {
        let values: Vec<(String, bool)> = self
            .segments
            .iter()
            .map(|segment| match segment.name.as_str() {
                "controller" => (controller.to_string(), segment.default.as_deref() == Some(controller)),
                "action" => (action.to_string(), segment.default.as_deref() == Some(action)),
                name => (format!(":{name}"), segment.optional || segment.default.is_some()),
            })
            .collect();

        let mut paths = Vec::new();
        for len in (0..=values.len()).rev() {
            if !values[len..].iter().all(|(_, omittable)| *omittable) {
                break;
            }
            let path = format!(
                "/{}",
                values[..len]
                    .iter()
                    .map(|(v, _)| v.as_str())
                    .collect::<Vec<_>>()
                    .join("/")
            );
            paths.push(path);
        }
        paths
    }

    fn position(&self, name: &str) -> usize {
        self.segments.iter().position(|s| s.name == name).unwrap_or_default()
    }
}

/// Registered spellings of controllers and their actions, looked up
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RouteNames {
    controller_index: usize,
    action_index: usize,
    controllers: HashMap<String, ControllerNames>,
}

#[derive(Debug, Clone, Default)]
struct ControllerNames {
    name: String,
    actions: HashMap<String, String>,
}

impl RouteNames {
    fn for_template(template: &RouteTemplate) -> Self {
        Self {
            controller_index: template.position("controller"),
            action_index: template.position("action"),
            controllers: HashMap::new(),
        }
    }

    fn insert(&mut self, controller: &str, action: &str) {
        let entry = self
            .controllers
            .entry(controller.to_ascii_lowercase())
            .or_insert_with(|| ControllerNames {
                name: controller.to_string(),
                actions: HashMap::new(),
            });
        entry
            .actions
            .insert(action.to_ascii_lowercase(), action.to_string());
    }

    /// `path` with its controller and action segments rewritten to the
    /// registered spelling, or `None` when it already matches or names no
    /// known controller.
    pub fn canonical_path(&self, path: &str) -> Option<String> {
        let mut segments: Vec<String> = path
            .strip_prefix('/')?
            .split('/')
            .map(str::to_string)
            .collect();

        let controller = self
            .controllers
            .get(&segments.get(self.controller_index)?.to_ascii_lowercase())?;
        let mut changed = false;
        if segments[self.controller_index] != controller.name {
            segments[self.controller_index] = controller.name.clone();
            changed = true;
        }
        if let Some(segment) = segments.get_mut(self.action_index) {
            if let Some(action) = controller.actions.get(&segment.to_ascii_lowercase()) {
                if segment != action {
                    *segment = action.clone();
                    changed = true;
                }
            }
        }

        changed.then(|| format!("/{}", segments.join("/")))
    }
}

/// Rewrites the request path to the registered controller and action
/// spelling before routing, so `/SELLERS/index` reaches `/Sellers/Index`.
pub async fn canonicalize_route(
    State(names): State<Arc<RouteNames>>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Response {
    if let Some(path) = names.canonical_path(req.uri().path()) {
        let path_and_query = match req.uri().query() {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };
        let mut parts = req.uri().clone().into_parts();
        if let Ok(path_and_query) = path_and_query.parse() {
            parts.path_and_query = Some(path_and_query);
            if let Ok(uri) = Uri::from_parts(parts) {
                debug!(from = %req.uri(), to = %uri, "Canonicalized route");
                *req.uri_mut() = uri;
            }
        }
    }
    next.run(req).await
}

/// Router builder that registers controller actions under every path the
/// template expands to.
pub struct ConventionalRouter {
    template: RouteTemplate,
    names: RouteNames,
    router: Router<AppState>,
}

impl ConventionalRouter {
    pub fn new(template: RouteTemplate) -> Self {
        Self {
            names: RouteNames::for_template(&template),
            template,
            router: Router::new(),
        }
    }

    /// Registers `handler` for `controller`/`action`. Handlers taking an id
    /// extract `Option<Path<i64>>` and see `None` when it is left out.
    pub fn action(mut self, controller: &str, action: &str, handler: MethodRouter<AppState>) -> Self {
        for path in self.template.paths(controller, action) {
            debug!(%path, controller, action, "Registering route");
            self.router = self.router.route(&path, handler.clone());
        }
        self.names.insert(controller, action);
        self
    }

    pub fn into_parts(self) -> (Router<AppState>, RouteNames) {
        (self.router, self.names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> RouteTemplate {
        RouteTemplate::parse(DEFAULT_ROUTE).unwrap()
    }

    #[test]
    fn parses_defaults_and_optional_segments() {
        let t = template();
        assert_eq!(t.segments().len(), 3);
        assert_eq!(t.segments()[0].default.as_deref(), Some("Home"));
        assert_eq!(t.segments()[1].default.as_deref(), Some("Index"));
        assert!(t.segments()[2].optional);
    }

    #[test]
    fn rejects_malformed_templates() {
        assert!(RouteTemplate::parse("{controller}/static").is_err());
        assert!(RouteTemplate::parse("{action=Index}/{id?}").is_err());
        assert!(RouteTemplate::parse("{controller}/{action}/{id=1?}").is_err());
    }

    #[test]
    fn home_index_is_reachable_from_root() {
        assert_eq!(
            template().paths("Home", "Index"),
            vec!["/Home/Index/:id", "/Home/Index", "/Home", "/"]
        );
    }

    #[test]
    fn controller_index_drops_action() {
        assert_eq!(
            template().paths("Sellers", "Index"),
            vec!["/Sellers/Index/:id", "/Sellers/Index", "/Sellers"]
        );
        assert_eq!(
            template().paths("Sellers", "Create"),
            vec!["/Sellers/Create/:id", "/Sellers/Create"]
        );
    }

    #[test]
    fn required_parameters_are_never_omitted() {
        let t = RouteTemplate::parse("{controller}/{action=Index}/{id}").unwrap();
        assert_eq!(t.paths("Sellers", "Index"), vec!["/Sellers/Index/:id"]);
    }

    fn names() -> RouteNames {
        let mut names = RouteNames::for_template(&template());
        names.insert("Sellers", "Index");
        names.insert("Sellers", "Edit");
        names.insert("SalesRecords", "SimpleSearch");
        names
    }

    #[test]
    fn canonical_path_folds_controller_and_action_case() {
        let names = names();
        assert_eq!(names.canonical_path("/SELLERS").as_deref(), Some("/Sellers"));
        assert_eq!(names.canonical_path("/sellers/index").as_deref(), Some("/Sellers/Index"));
        assert_eq!(names.canonical_path("/sellers/EDIT/3").as_deref(), Some("/Sellers/Edit/3"));
        assert_eq!(
            names.canonical_path("/salesrecords/simplesearch").as_deref(),
            Some("/SalesRecords/SimpleSearch")
        );
    }

    #[test]
    fn canonical_path_leaves_other_paths_alone() {
        let names = names();
        assert_eq!(names.canonical_path("/Sellers/Edit/3"), None);
        assert_eq!(names.canonical_path("/"), None);
        assert_eq!(names.canonical_path("/css/site.css"), None);
        assert_eq!(names.canonical_path("/sellers/Unknown").as_deref(), Some("/Sellers/Unknown"));
    }
}
