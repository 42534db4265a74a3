//! Source tree enumeration.
//!
//! Walks the source directory and classifies every file by the suffix of its
//! name. Only recognized suffixes are published; everything else is skipped.

use super::error::BuildError;
use crate::utils::path::relative_slash_path;
use std::{
    io,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// What the pipeline does with a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.md`: converted to HTML, then templated.
    Markdown,
    /// `.html`: templated as-is.
    Html,
    /// `.js` / `.css`: copied byte for byte.
    Asset,
}

impl SourceKind {
    /// Classify a file by the suffix of its name.
    pub fn classify(file_name: &str) -> Option<Self> {
        if file_name.ends_with(".md") {
            Some(Self::Markdown)
        } else if file_name.ends_with(".html") {
            Some(Self::Html)
        } else if file_name.ends_with(".js") || file_name.ends_with(".css") {
            Some(Self::Asset)
        } else {
            None
        }
    }
}

/// A classified source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub kind: SourceKind,
    pub full_path: PathBuf,
    /// Path relative to the source root, `/`-separated.
    pub relative_path: String,
}

/// Enumerate the classified files under `source`.
///
/// Directories listed in `excluded` are not entered, which keeps an output
/// directory nested inside the source out of its own build. Files are yielded
/// in file-name order; errors while reading a directory are yielded inline.
///
/// Fails up front with [`BuildError::SourceNotFound`] if `source` is not a
/// directory.
pub fn walk_source(
    source: &Path,
    excluded: Vec<PathBuf>,
) -> Result<impl Iterator<Item = Result<SourceFile, BuildError>> + use<>, BuildError> {
    if !source.is_dir() {
        return Err(BuildError::SourceNotFound(source.to_path_buf()));
    }

    let root = source.to_path_buf();
    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !excluded.iter().any(|dir| entry.path() == dir));

    Ok(walker.filter_map(move |entry| match entry {
        Ok(entry) => classify_entry(&entry, &root).map(Ok),
        Err(err) => {
            let path = err
                .path()
                .and_then(|p| relative_slash_path(p, &root))
                .unwrap_or_default();
            Some(Err(BuildError::SourceRead {
                path,
                source: io::Error::from(err),
            }))
        }
    }))
}

/// Turn a walk entry into a [`SourceFile`], or `None` if it is not published.
fn classify_entry(entry: &DirEntry, root: &Path) -> Option<SourceFile> {
    let is_file =
        entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
    if !is_file {
        return None;
    }

    let kind = SourceKind::classify(entry.file_name().to_str()?)?;
    let relative_path = relative_slash_path(entry.path(), root)?;

    Some(SourceFile {
        kind,
        full_path: entry.path().to_path_buf(),
        relative_path,
    })
}
