//! Route construction errors.

use thiserror::Error;

/// Errors raised while building route definitions or a router.
///
/// These are configuration defects: they surface once, when routes are
/// constructed, never while matching a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Pattern capture groups do not line up with dynamic parts.
    #[error("Route {route}: pattern has {captures} capture groups but segments declare {params} parameters")]
    CaptureMismatch {
        route: String,
        captures: usize,
        params: usize,
    },

    /// Two parameters touch without a separator, e.g. `[a][b]`.
    #[error("Invalid route {0}: parameters must be separated")]
    AdjacentParams(String),

    /// Opening and closing brackets do not balance.
    #[error("Invalid route {0}: brackets are unbalanced")]
    UnbalancedBrackets(String),

    /// A rest parameter shares its segment with other content.
    #[error("Invalid route {0}: rest parameter must be a standalone segment")]
    RestNotStandalone(String),

    /// A parameter name contains unsupported characters.
    #[error("Invalid route {route}: parameter name {name:?} must match /^[a-zA-Z0-9_$]+$/")]
    InvalidParamName { route: String, name: String },

    /// The generated or supplied pattern is not a valid regular expression.
    #[error("Invalid pattern for route {route}: {message}")]
    InvalidPattern { route: String, message: String },

    /// Path generation needs a parameter that was not supplied.
    #[error("Missing parameter {param} for route {route}")]
    MissingParam { route: String, param: String },

    /// A redirect route was built without a destination.
    #[error("Redirect route {0} has no destination")]
    MissingRedirect(String),
}
