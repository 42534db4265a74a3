//! `[build]` section configuration.
//!
//! Contains the source/output paths, template engine selection and the
//! error policy of the build pipeline.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Enums
// ============================================================================

/// Template engine applied to every HTML page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateEngineKind {
    /// Jinja-style syntax (`{{ var }}`, `{% include %}`).
    #[default]
    #[serde(alias = "jinja2")]
    Jinja,
}

/// What the build does when a single file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort on the first error (default).
    #[default]
    FailFast,
    /// Skip the failing file, keep going, report all failures at the end.
    Continue,
}

// ============================================================================
// Main BuildConfig
// ============================================================================

/// `[build]` section in homer.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// source = "public"     # Markdown, HTML, CSS and JS sources
/// output = "build"      # Wiped and regenerated on every build
/// engine = "jinja"
///
/// [build.markdown]
/// tables = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Source directory.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Output directory. Deleted and recreated by every build.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Template engine for HTML pages.
    #[serde(default)]
    pub engine: TemplateEngineKind,

    /// HTML-escape interpolated values.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub autoescape: bool,

    /// Fail-fast or continue on per-file errors.
    #[serde(default)]
    pub on_error: ErrorPolicy,

    /// Build into a staging directory and swap it in only on success.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub atomic: bool,

    /// Markdown extensions.
    #[serde(default)]
    pub markdown: MarkdownConfig,
}

// ============================================================================
// Sub-configurations
// ============================================================================

/// `[build.markdown]` section - optional CommonMark extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// GitHub-style tables
    pub tables: bool,
    /// Footnote references and definitions
    pub footnotes: bool,
    /// `~~strikethrough~~`
    pub strikethrough: bool,
    /// `- [ ]` task list items
    pub task_lists: bool,
}
