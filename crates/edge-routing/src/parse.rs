//! Route string parsing, pattern generation and path generation.

use edge_core::TrailingSlash;

use crate::error::RouteError;
use crate::params::Params;
use crate::route::{RoutePart, Segment};

/// Parse a route string such as `/blog/[slug]` or `/docs/[...path]` into segments.
///
/// Every non-empty `/`-separated piece becomes one segment; a segment can mix
/// literal text and parameters (`game-[title]`).
pub fn parse_segments(route: &str) -> Result<Vec<Segment>, RouteError> {
    route
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| parse_segment(route, segment))
        .collect()
}

fn parse_segment(route: &str, segment: &str) -> Result<Segment, RouteError> {
    if segment.contains("][") {
        return Err(RouteError::AdjacentParams(route.to_string()));
    }
    if segment.matches('[').count() != segment.matches(']').count() {
        return Err(RouteError::UnbalancedBrackets(route.to_string()));
    }

    let mut parts = Vec::new();
    let mut rest = segment;

    while let Some(open) = rest.find('[') {
        if open > 0 {
            parts.push(RoutePart::literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after
            .find(']')
            .ok_or_else(|| RouteError::UnbalancedBrackets(route.to_string()))?;
        let name = &after[..close];

        if !is_valid_param_name(name) {
            return Err(RouteError::InvalidParamName {
                route: route.to_string(),
                name: name.to_string(),
            });
        }

        if let Some(spread_name) = name.strip_prefix("...") {
            let standalone = open == 0 && close + 1 == after.len() && parts.is_empty();
            if !standalone {
                return Err(RouteError::RestNotStandalone(route.to_string()));
            }
            parts.push(RoutePart::spread(spread_name));
        } else {
            parts.push(RoutePart::dynamic(name));
        }

        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        if parts.iter().any(|p| p.spread) {
            return Err(RouteError::RestNotStandalone(route.to_string()));
        }
        parts.push(RoutePart::literal(rest));
    }

    Ok(parts)
}

fn is_valid_param_name(name: &str) -> bool {
    let bare = name.strip_prefix("...").unwrap_or(name);
    !bare.is_empty()
        && bare
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Build the regular expression source matching the given segments.
///
/// A segment made of a single rest part is optional as a whole, so
/// `/docs/[...path]` also matches `/docs`.
pub fn build_pattern(segments: &[Segment], trailing_slash: TrailingSlash) -> String {
    let pathname: String = segments
        .iter()
        .map(|segment| {
            if segment.len() == 1 && segment[0].spread {
                r"(?:\/(.*?))?".to_string()
            } else {
                let body: String = segment
                    .iter()
                    .map(|part| {
                        if part.spread {
                            "(.*?)".to_string()
                        } else if part.dynamic {
                            "([^/]+?)".to_string()
                        } else {
                            escape_literal(&part.content)
                        }
                    })
                    .collect();
                format!(r"\/{}", body)
            }
        })
        .collect();

    let trailing = if segments.is_empty() {
        "$"
    } else {
        match trailing_slash {
            TrailingSlash::Always => r"\/$",
            TrailingSlash::Never => "$",
            TrailingSlash::Ignore => r"\/?$",
        }
    };

    if pathname.is_empty() {
        format!(r"^\/{}", trailing)
    } else {
        format!("^{}{}", pathname, trailing)
    }
}

fn escape_literal(content: &str) -> String {
    let encoded = content
        .replace('?', "%3F")
        .replace('#', "%23")
        .replace("%5B", "[")
        .replace("%5D", "]");
    regex::escape(&encoded)
}

/// Build a concrete path for `segments` from `params`; the inverse of [`build_pattern`].
pub(crate) fn generate_path(
    route: &str,
    segments: &[Segment],
    params: &Params,
    trailing_slash: TrailingSlash,
) -> Result<String, RouteError> {
    let mut path = String::new();

    for segment in segments {
        let mut rendered = String::new();
        for part in segment {
            if part.spread {
                rendered.push_str(params.get(part.param_name()).unwrap_or_default());
            } else if part.dynamic {
                let value =
                    params
                        .get(part.param_name())
                        .ok_or_else(|| RouteError::MissingParam {
                            route: route.to_string(),
                            param: part.param_name().to_string(),
                        })?;
                rendered.push_str(value);
            } else {
                rendered.push_str(&part.content);
            }
        }
        if !rendered.is_empty() {
            path.push('/');
            path.push_str(&rendered);
        }
    }

    if trailing_slash == TrailingSlash::Always && !segments.is_empty() {
        path.push('/');
    }

    if path.is_empty() {
        path.push('/');
    }
    Ok(path)
}
