//! File-based routing: request path → file under the output directory.
//!
//! Page routes resolve in order:
//!
//! 1. `<root>/<path>/index.html`
//! 2. `<root>/<path>` with its extension replaced by `.html`
//!
//! An empty path serves `<root>/index.html`. Asset routes skip the fallbacks
//! and name the file exactly.

use crate::utils::path::{is_within, join_relative, sanitize_request_path};
use std::path::{Path, PathBuf};

/// Reserved first segment; never served as a page.
const TEMPLATES_PREFIX: &str = "templates";

/// Outcome of resolving one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Served(PathBuf),
    NotFound,
    /// Reserved or escaping path. Reported to clients as 404.
    Rejected,
}

/// Maps request paths onto files under a fixed root.
#[derive(Debug, Clone)]
pub struct RequestResolver {
    root: PathBuf,
}

impl RequestResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a page route with index and `.html` fallbacks.
    pub fn resolve_page(&self, raw: &str) -> Resolution {
        let path = sanitize_request_path(raw);
        let trimmed = path.trim_matches('/');

        if trimmed == "favicon.ico" || trimmed.starts_with(TEMPLATES_PREFIX) {
            return Resolution::Rejected;
        }

        if trimmed.is_empty() {
            return self.serve_if_file(self.root.join("index.html"));
        }

        let index = join_relative(&self.root, [trimmed, "index.html"]);
        if index.is_file() {
            return self.contained(index);
        }

        let page = join_relative(&self.root, [trimmed]).with_extension("html");
        self.serve_if_file(page)
    }

    /// Resolve an asset route: the exact file, nothing else.
    pub fn resolve_asset(&self, raw: &str) -> Resolution {
        let path = sanitize_request_path(raw);
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Resolution::NotFound;
        }
        self.serve_if_file(join_relative(&self.root, [trimmed]))
    }

    fn serve_if_file(&self, candidate: PathBuf) -> Resolution {
        if candidate.is_file() {
            self.contained(candidate)
        } else {
            Resolution::NotFound
        }
    }

    fn contained(&self, candidate: PathBuf) -> Resolution {
        if is_within(&self.root, &candidate) {
            Resolution::Served(candidate)
        } else {
            Resolution::Rejected
        }
    }
}
