//! Path normalization and route selection.

use std::borrow::Cow;

use edge_core::{BuildFormat, RoutingConfig, TrailingSlash};
use tracing::{debug, trace};

use crate::error::RouteError;
use crate::params::Params;
use crate::priority::route_comparator;
use crate::route::RouteDefinition;

/// Why no route was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    /// The path is inside the base but no route accepts it.
    NoRoute,
    /// The path is not under the configured base.
    OutsideBase,
}

/// Outcome of matching one request path.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterMatch<'a> {
    /// A route accepted the path.
    Match {
        route: &'a RouteDefinition,
        params: Params,
        pathname: String,
    },
    /// The path is malformed and the client should be sent elsewhere.
    Redirect { location: String, status: u16 },
    /// Nothing matched.
    NoMatch { reason: NoMatchReason },
}

impl RouterMatch<'_> {
    /// The matched route, if any.
    pub fn route(&self) -> Option<&RouteDefinition> {
        match self {
            Self::Match { route, .. } => Some(route),
            _ => None,
        }
    }

    /// Whether a route matched.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

enum Normalized {
    Path(String),
    Done(RouterMatch<'static>),
}

/// Resolves request paths against a priority-sorted route list.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<RouteDefinition>,
    base: String,
    trailing_slash: TrailingSlash,
    build_format: BuildFormat,
}

impl Router {
    /// Create a router, sorting `routes` into resolution order.
    pub fn new(mut routes: Vec<RouteDefinition>, config: &RoutingConfig) -> Result<Self, RouteError> {
        for route in routes.iter().chain(routes.iter().flat_map(|r| r.fallback_routes())) {
            let captures = route.pattern().captures_len() - 1;
            if captures != route.params().len() {
                return Err(RouteError::CaptureMismatch {
                    route: route.route().to_string(),
                    captures,
                    params: route.params().len(),
                });
            }
        }

        routes.sort_by(route_comparator);
        debug!(routes = routes.len(), base = %config.normalized_base(), "router initialized");

        Ok(Self {
            routes,
            base: config.normalized_base(),
            trailing_slash: config.trailing_slash,
            build_format: config.build_format,
        })
    }

    /// Routes in resolution order.
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Normalized base path.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The custom error route for a status code (404 or 500), if one exists.
    pub fn error_route(&self, status: u16) -> Option<&RouteDefinition> {
        self.routes.iter().find(|route| match status {
            404 => route.is_404(),
            500 => route.is_500(),
            _ => false,
        })
    }

    /// Resolve a request path (query and fragment are ignored).
    pub fn match_path(&self, input: &str) -> RouterMatch<'_> {
        let pathname = match self.normalize(input) {
            Normalized::Path(pathname) => pathname,
            Normalized::Done(outcome) => {
                debug!(input, ?outcome, "path resolved without route lookup");
                return outcome;
            }
        };

        // Literals are matched decoded; the raw form keeps encoded separators inside params.
        let decoded = decode(&pathname);
        let Some(route) = self
            .routes
            .iter()
            .find(|route| route.matches(&decoded) || route.matches(&pathname))
        else {
            debug!(input, %pathname, "no route matched");
            return RouterMatch::NoMatch {
                reason: NoMatchReason::NoRoute,
            };
        };

        let params = self.extract_params(route, &pathname);
        debug!(input, %pathname, route = route.route(), "route matched");

        RouterMatch::Match {
            route,
            params,
            pathname,
        }
    }

    fn extract_params(&self, route: &RouteDefinition, pathname: &str) -> Params {
        let decoded = decode(pathname);
        if let Some(params) = route.extract_params(&decoded) {
            return params;
        }
        // Decoding introduced a separator (e.g. `%2F`); match the raw path and decode each value.
        trace!(%pathname, "decoded path no longer matches, decoding captures individually");
        route
            .extract_params(pathname)
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.map(|v| decode(v).into_owned())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn normalize(&self, input: &str) -> Normalized {
        let path = input.split(['?', '#']).next().unwrap_or_default();

        let mut path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        if path.starts_with("//") {
            return Normalized::Done(RouterMatch::Redirect {
                location: "/".to_string(),
                status: 301,
            });
        }

        if self.base != "/" {
            let bare = self.base.trim_end_matches('/');
            if path == bare || path.strip_prefix(bare) == Some("/") {
                if self.trailing_slash == TrailingSlash::Always && path == bare {
                    return Normalized::Done(RouterMatch::NoMatch {
                        reason: NoMatchReason::NoRoute,
                    });
                }
                path = "/".to_string();
            } else if let Some(rest) = path.strip_prefix(bare).filter(|r| r.starts_with('/')) {
                path = rest.to_string();
            } else {
                return Normalized::Done(RouterMatch::NoMatch {
                    reason: NoMatchReason::OutsideBase,
                });
            }
        }

        if self.build_format == BuildFormat::File {
            let stripped = path
                .strip_suffix("/index.html")
                .or_else(|| path.strip_suffix(".html"));
            if let Some(stripped) = stripped {
                let mut file_path = if stripped.is_empty() {
                    "/".to_string()
                } else {
                    stripped.to_string()
                };
                if self.trailing_slash == TrailingSlash::Always && !file_path.ends_with('/') {
                    file_path.push('/');
                }
                path = file_path;
            }
        }

        if self.trailing_slash == TrailingSlash::Never && path.len() > 1 {
            let trimmed = path.trim_end_matches('/');
            path = if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            };
        }

        Normalized::Path(path)
    }
}

fn decode(value: &str) -> Cow<'_, str> {
    urlencoding::decode(value).unwrap_or(Cow::Borrowed(value))
}
