//! The route model: one immutable route definition.

use edge_core::TrailingSlash;
use regex::Regex;
use serde::Serialize;

use crate::error::RouteError;
use crate::params::Params;
use crate::parse::{build_pattern, generate_path, parse_segments};

/// One part of a path segment: literal text, a dynamic parameter or a rest parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutePart {
    /// Literal text, the parameter name, or `...name` for rest parameters.
    pub content: String,
    /// Whether this part is a parameter.
    pub dynamic: bool,
    /// Whether this part is a rest parameter.
    pub spread: bool,
}

impl RoutePart {
    /// A literal part.
    pub fn literal(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            dynamic: false,
            spread: false,
        }
    }

    /// A single-segment parameter.
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            content: name.into(),
            dynamic: true,
            spread: false,
        }
    }

    /// A rest parameter. `name` may be given with or without the `...` prefix.
    pub fn spread(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let name = name.strip_prefix("...").unwrap_or(name);
        Self {
            content: format!("...{}", name),
            dynamic: true,
            spread: true,
        }
    }

    /// Whether the part is a parameter of either kind.
    pub fn is_param(&self) -> bool {
        self.dynamic || self.spread
    }

    /// Parameter name with any `...` prefix removed.
    pub fn param_name(&self) -> &str {
        self.content.strip_prefix("...").unwrap_or(&self.content)
    }
}

/// An ordered list of parts forming one `/`-separated path segment.
pub type Segment = Vec<RoutePart>;

/// Whether every part of the segment is literal text.
pub fn is_static_segment(segment: &[RoutePart]) -> bool {
    segment.iter().all(|part| !part.is_param())
}

/// What a route resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    /// A rendered page component.
    Page,
    /// A handler producing an arbitrary response.
    Endpoint,
    /// A configured redirect.
    Redirect,
}

/// Destination of a redirect route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectTarget {
    /// Location, possibly containing `[param]` placeholders.
    pub destination: String,
    /// HTTP status code.
    pub status: u16,
}

impl RedirectTarget {
    /// A permanent (301) redirect.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            status: 301,
        }
    }

    /// Set the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// An immutable route definition.
///
/// The compiled pattern's capture groups line up 1:1 with the route's
/// dynamic and rest parts, left to right across all segments. This is
/// checked on construction.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    route: String,
    segments: Vec<Segment>,
    route_type: RouteType,
    prerender: bool,
    component: String,
    pattern: Regex,
    params: Vec<String>,
    trailing_slash: TrailingSlash,
    redirect: Option<RedirectTarget>,
    redirect_route: Option<Box<RouteDefinition>>,
    fallback_routes: Vec<RouteDefinition>,
}

impl RouteDefinition {
    /// Create a route with an explicit pattern.
    pub fn new(
        route: impl Into<String>,
        segments: Vec<Segment>,
        pattern: &str,
        route_type: RouteType,
        component: impl Into<String>,
    ) -> Result<Self, RouteError> {
        let route = route.into();
        let pattern = Regex::new(pattern).map_err(|e| RouteError::InvalidPattern {
            route: route.clone(),
            message: e.to_string(),
        })?;

        let params: Vec<String> = segments
            .iter()
            .flatten()
            .filter(|part| part.is_param())
            .map(|part| part.content.clone())
            .collect();

        let captures = pattern.captures_len() - 1;
        if captures != params.len() {
            return Err(RouteError::CaptureMismatch {
                route,
                captures,
                params: params.len(),
            });
        }

        Ok(Self {
            route,
            segments,
            route_type,
            prerender: false,
            component: component.into(),
            pattern,
            params,
            trailing_slash: TrailingSlash::Ignore,
            redirect: None,
            redirect_route: None,
            fallback_routes: Vec::new(),
        })
    }

    /// Create a route from segments, generating the pattern for the trailing slash policy.
    pub fn from_segments(
        route: impl Into<String>,
        segments: Vec<Segment>,
        route_type: RouteType,
        component: impl Into<String>,
        trailing_slash: TrailingSlash,
    ) -> Result<Self, RouteError> {
        let pattern = build_pattern(&segments, trailing_slash);
        let mut definition = Self::new(route, segments, &pattern, route_type, component)?;
        definition.trailing_slash = trailing_slash;
        Ok(definition)
    }

    /// Parse a route string such as `/blog/[slug]` into a route definition.
    pub fn parse(
        route: &str,
        route_type: RouteType,
        component: impl Into<String>,
        trailing_slash: TrailingSlash,
    ) -> Result<Self, RouteError> {
        let segments = parse_segments(route)?;
        Self::from_segments(route, segments, route_type, component, trailing_slash)
    }

    /// Parse a redirect route from `route` to `target`.
    pub fn redirect(
        route: &str,
        target: RedirectTarget,
        trailing_slash: TrailingSlash,
    ) -> Result<Self, RouteError> {
        let mut definition = Self::parse(route, RouteType::Redirect, "", trailing_slash)?;
        definition.redirect = Some(target);
        Ok(definition)
    }

    /// Mark the route as prerendered.
    pub fn with_prerender(mut self, prerender: bool) -> Self {
        self.prerender = prerender;
        self
    }

    /// Append a fallback route. Fallbacks are tried in insertion order.
    pub fn with_fallback(mut self, fallback: RouteDefinition) -> Self {
        self.fallback_routes.push(fallback);
        self
    }

    /// Attach the route a redirect points at.
    pub fn with_redirect_route(mut self, target: RouteDefinition) -> Self {
        self.redirect_route = Some(Box::new(target));
        self
    }

    /// Canonical route string.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Path segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Route type.
    pub fn route_type(&self) -> RouteType {
        self.route_type
    }

    /// Whether the route is prerendered at build time.
    pub fn is_prerendered(&self) -> bool {
        self.prerender
    }

    /// Opaque component identifier.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Compiled matcher.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Parameter names in capture order, rest parameters keeping their `...` prefix.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Redirect destination, for redirect routes.
    pub fn redirect_target(&self) -> Option<&RedirectTarget> {
        self.redirect.as_ref()
    }

    /// Route a redirect points at, if any.
    pub fn redirect_route(&self) -> Option<&RouteDefinition> {
        self.redirect_route.as_deref()
    }

    /// Alternate routes, in configuration order.
    pub fn fallback_routes(&self) -> &[RouteDefinition] {
        &self.fallback_routes
    }

    /// Whether this is the custom not-found route.
    pub fn is_404(&self) -> bool {
        is_special(&self.route, "404")
    }

    /// Whether this is the custom server-error route.
    pub fn is_500(&self) -> bool {
        is_special(&self.route, "500")
    }

    /// Whether the route's own pattern or any fallback pattern accepts `pathname`.
    pub fn matches(&self, pathname: &str) -> bool {
        self.pattern.is_match(pathname)
            || self
                .fallback_routes
                .iter()
                .any(|fallback| fallback.pattern.is_match(pathname))
    }

    /// Extract parameters from `pathname`.
    ///
    /// Returns `None` when neither the route nor any fallback matches.
    pub fn extract_params(&self, pathname: &str) -> Option<Params> {
        if self.params.is_empty() {
            return self.matches(pathname).then(Params::new);
        }

        let captures = self.pattern.captures(pathname).or_else(|| {
            self.fallback_routes
                .iter()
                .find_map(|fallback| fallback.pattern.captures(pathname))
        })?;

        Some(
            self.params
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    let value = captures.get(i + 1).map(|m| m.as_str());
                    match key.strip_prefix("...") {
                        Some(name) => (
                            name.to_string(),
                            value.filter(|v| !v.is_empty()).map(String::from),
                        ),
                        None => (key.clone(), value.map(String::from)),
                    }
                })
                .collect(),
        )
    }

    /// Build a concrete path for this route from `params`.
    pub fn generate(&self, params: &Params) -> Result<String, RouteError> {
        generate_path(&self.route, &self.segments, params, self.trailing_slash)
    }

    /// Resolve the location of a redirect route for the given parameters.
    ///
    /// A linked target route is generated from the parameters; otherwise
    /// `[name]` and `[...name]` placeholders in the destination are substituted.
    pub fn redirect_location(&self, params: &Params) -> Result<String, RouteError> {
        if let Some(target) = &self.redirect_route {
            return target.generate(params);
        }
        let target = self
            .redirect
            .as_ref()
            .ok_or_else(|| RouteError::MissingRedirect(self.route.clone()))?;

        let mut location = target.destination.clone();
        for (name, value) in params.iter() {
            let value = value.unwrap_or_default();
            location = location
                .replace(&format!("[...{}]", name), value)
                .replace(&format!("[{}]", name), value);
        }
        Ok(location)
    }
}

impl PartialEq for RouteDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.route == other.route
            && self.route_type == other.route_type
            && self.component == other.component
            && self.pattern.as_str() == other.pattern.as_str()
    }
}

fn is_special(route: &str, code: &str) -> bool {
    route.trim_end_matches('/').strip_prefix('/') == Some(code)
}
