//! Site configuration: routing policy, render options and logging.

use std::collections::HashMap;
use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Errors produced while parsing configuration text.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the router treats a trailing slash on incoming paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    /// Paths must end with `/`.
    Always,
    /// Trailing slashes are removed before matching.
    Never,
    /// Both forms are accepted.
    #[default]
    Ignore,
}

/// Output layout of the built site, which determines how `.html` paths map to routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFormat {
    /// `/about` is served from `/about/index.html`.
    #[default]
    Directory,
    /// `/about` is served from `/about.html`.
    File,
    /// Whatever layout the source files use.
    Preserve,
}

/// Routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Base path the site is mounted under.
    pub base: String,
    /// Trailing slash policy.
    pub trailing_slash: TrailingSlash,
    /// Build output layout.
    pub build_format: BuildFormat,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            trailing_slash: TrailingSlash::default(),
            build_format: BuildFormat::default(),
        }
    }
}

impl RoutingConfig {
    /// Create a routing configuration with the identity base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base path.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Set the trailing slash policy.
    pub fn with_trailing_slash(mut self, trailing_slash: TrailingSlash) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    /// Set the build format.
    pub fn with_build_format(mut self, build_format: BuildFormat) -> Self {
        self.build_format = build_format;
        self
    }

    /// The base path, always starting with `/`. An empty base is the identity base `/`.
    pub fn normalized_base(&self) -> String {
        let trimmed = self.base.trim();
        if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/// Render pipeline options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Start later siblings rendering into private buffers while the first one streams.
    pub concurrent_siblings: bool,
    /// Bytes to accumulate before handing data to the response sink (0 = every chunk).
    pub flush_threshold: usize,
    /// Markup emitted once per request for the hydration bootstrap instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydration_script: Option<String>,
    /// Directive name to script markup, emitted once per directive per request.
    pub directive_scripts: HashMap<String, String>,
    /// Markup emitted once per request for the server island runtime instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_island_script: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            concurrent_siblings: true,
            flush_threshold: 0,
            hydration_script: None,
            directive_scripts: HashMap::new(),
            server_island_script: None,
        }
    }
}

impl RenderConfig {
    /// Register the script emitted for a hydration directive (e.g. `load`, `visible`).
    pub fn with_directive_script(
        mut self,
        directive: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        self.directive_scripts.insert(directive.into(), script.into());
        self
    }

    /// Set the hydration bootstrap markup.
    pub fn with_hydration_script(mut self, script: impl Into<String>) -> Self {
        self.hydration_script = Some(script.into());
        self
    }

    /// Enable or disable concurrent sibling rendering.
    pub fn with_concurrent_siblings(mut self, enabled: bool) -> Self {
        self.concurrent_siblings = enabled;
        self
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format (for development).
    #[default]
    Human,
    /// JSON format (for production/log aggregation).
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Complete site configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Routing configuration.
    pub routing: RoutingConfig,
    /// Render configuration.
    pub render: RenderConfig,
    /// Logging configuration.
    pub log: LogConfig,
}

impl SiteConfig {
    /// Load config from a file. `.json` files are parsed as JSON, everything else as TOML.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            Self::from_json_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Parse TOML configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse JSON configuration text.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}
