//! Core abstractions for the edge rendering pipeline.
//!
//! This crate provides the fundamental types shared by the router and renderer:
//! - `SiteConfig` - Routing, render and logging configuration
//! - `RequestId` - Request correlation identifier
//! - `TimingContext` / `LifecyclePhase` - Render lifecycle tracking

mod config;
mod context;
mod lifecycle;

pub use config::*;
pub use context::*;
pub use lifecycle::*;
