//! Site configuration management for `homer.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[build]`   | Source/output paths, template engine, policies   |
//! | `[serve]`   | Development server (interface, port, prefix)     |
//! | `[context]` | Values passed to every template render           |
//!
//! The file is optional: without it every field takes its default and the
//! CLI flags are applied on top.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "public"
//! output = "build"
//!
//! [serve]
//! port = 8000
//!
//! [context]
//! site_name = "My Wiki"
//! ```

mod build;
pub mod defaults;
mod error;
mod serve;

pub use build::{BuildConfig, ErrorPolicy, MarkdownConfig, TemplateEngineKind};
pub use error::ConfigError;
pub use serve::ServeConfig;

use crate::cli::Cli;
use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
};

/// Values exposed to templates, keyed by variable name.
pub type TemplateContext = BTreeMap<String, toml::Value>;

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing homer.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Project root directory (set from CLI)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Template context
    #[serde(default)]
    pub context: TemplateContext,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Resolve the full configuration for a CLI invocation.
    ///
    /// Defaults, then `<root>/<config>` if present, then CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.config_path = config_path;
        config.update_with_cli(cli, &root);
        Ok(config)
    }

    /// Update configuration with CLI arguments
    fn update_with_cli(&mut self, cli: &Cli, root: &Path) {
        let build_args = cli.build_args();
        Self::update_option(&mut self.build.source, build_args.source.as_ref());
        Self::update_option(&mut self.build.output, build_args.output.as_ref());

        if let Some(serve_args) = cli.serve_args() {
            Self::update_option(&mut self.serve.interface, serve_args.interface.as_ref());
            Self::update_option(&mut self.serve.port, serve_args.port.as_ref());
        }

        self.update_path_with_root(root);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths against the root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path) {
        let root = Self::normalize_path(root);
        self.config_path = Self::normalize_path(&self.config_path);
        self.build.source = Self::normalize_path(&root.join(&self.build.source));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.root = root;
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before building or serving
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.interface.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "[serve.interface] `{}` is not an IP address",
                self.serve.interface
            )));
        }

        let prefix = &self.serve.static_prefix;
        if !prefix.starts_with('/') || prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "[serve.static_prefix] must start with `/` and name a path segment".into(),
            ));
        }

        if self.serve.workers == 0 {
            return Err(ConfigError::Validation(
                "[serve.workers] must be at least 1".into(),
            ));
        }

        // Every build deletes the output directory.
        if self.build.source.starts_with(&self.build.output) {
            return Err(ConfigError::Validation(format!(
                "[build.output] `{}` must not contain [build.source]",
                self.build.output.display()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
