//! Route resolution for the edge rendering pipeline.
//!
//! Routes are described by [`RouteDefinition`], ordered by [`route_comparator`]
//! and resolved by [`Router`]:
//!
//! ```text
//! /                    static, sorts first among single-segment routes
//! /blog/hello          static segment beats dynamic
//! /blog/[slug]         single dynamic parameter
//! /blog/[...rest]      rest parameter, sorts after single parameters
//! ```
//!
//! # Usage
//!
//! ```
//! use edge_core::RoutingConfig;
//! use edge_routing::{RouteDefinition, RouteType, Router, RouterMatch};
//!
//! let config = RoutingConfig::default();
//! let routes = vec![
//!     RouteDefinition::parse("/blog/[...rest]", RouteType::Page, "rest.html", config.trailing_slash).unwrap(),
//!     RouteDefinition::parse("/blog/[slug]", RouteType::Page, "slug.html", config.trailing_slash).unwrap(),
//! ];
//! let router = Router::new(routes, &config).unwrap();
//!
//! match router.match_path("/blog/hello") {
//!     RouterMatch::Match { route, params, .. } => {
//!         assert_eq!(route.route(), "/blog/[slug]");
//!         assert_eq!(params.get("slug"), Some("hello"));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

mod error;
mod params;
mod parse;
mod priority;
mod route;
mod router;

pub use error::*;
pub use params::*;
pub use parse::{build_pattern, parse_segments};
pub use priority::*;
pub use route::*;
pub use router::*;
