//! Turns classified source files into render units or executed copies.
//!
//! ```text
//! SourceFile ──┬── Markdown ──► read ──► to_html ──► RenderUnit (x.md → x.html)
//!              ├── Html     ──► read ──────────────► RenderUnit (same path)
//!              └── Asset    ──► copy now ──────────► CopyInstruction
//! ```

use super::{
    error::BuildError,
    markdown,
    walk::{SourceFile, SourceKind},
};
use crate::{config::MarkdownConfig, debug, logger::Logger, utils::path::join_relative};
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

/// One HTML page on its way to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderUnit {
    /// Raw page until templating, final HTML afterwards.
    pub content: String,
    /// Destination path relative to the output root, `/`-separated.
    pub relative_path: String,
}

/// A file copied byte for byte into the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyInstruction {
    pub source_path: PathBuf,
    pub relative_path: String,
}

/// Result of transforming one source file.
#[derive(Debug)]
pub enum Transformed {
    /// Buffered for templating and writing.
    Render(RenderUnit),
    /// Already copied into the output directory.
    Copied(CopyInstruction),
}

impl CopyInstruction {
    /// Copy into `destination`, creating parent directories.
    ///
    /// Permissions and the modification time of the source are kept.
    pub fn execute(&self, destination: &Path) -> Result<PathBuf, BuildError> {
        let target = join_relative(destination, [self.relative_path.as_str()]);
        copy_preserving_mtime(&self.source_path, &target).map_err(|source| {
            BuildError::CopyFailed {
                path: self.relative_path.clone(),
                source,
            }
        })?;
        Ok(target)
    }
}

fn copy_preserving_mtime(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    let modified = fs::metadata(from)?.modified()?;
    File::options().write(true).open(to)?.set_modified(modified)
}

/// Replace a trailing `.md` with `.html`.
///
/// Only the final suffix is touched: `v1.2.md` → `v1.2.html`,
/// `archive.md.md` → `archive.md.html`.
pub fn html_relative_path(relative_path: &str) -> String {
    match relative_path.strip_suffix(".md") {
        Some(stem) => format!("{stem}.html"),
        None => relative_path.to_owned(),
    }
}

/// Transform one classified file.
///
/// Pages are read as UTF-8 and returned for templating. Assets are copied into
/// `destination` immediately.
pub fn transform(
    file: SourceFile,
    destination: &Path,
    markdown: &MarkdownConfig,
    logger: &Logger,
) -> Result<Transformed, BuildError> {
    match file.kind {
        SourceKind::Markdown => {
            let text = read_source(&file)?;
            let unit = RenderUnit {
                content: markdown::to_html(&text, markdown),
                relative_path: html_relative_path(&file.relative_path),
            };
            debug!(logger, "markdown"; "{} -> {}", file.relative_path, unit.relative_path);
            Ok(Transformed::Render(unit))
        }
        SourceKind::Html => {
            let content = read_source(&file)?;
            debug!(logger, "html"; "{}", file.relative_path);
            Ok(Transformed::Render(RenderUnit {
                content,
                relative_path: file.relative_path,
            }))
        }
        SourceKind::Asset => {
            let instruction = CopyInstruction {
                source_path: file.full_path,
                relative_path: file.relative_path,
            };
            instruction.execute(destination)?;
            Ok(Transformed::Copied(instruction))
        }
    }
}

fn read_source(file: &SourceFile) -> Result<String, BuildError> {
    fs::read_to_string(&file.full_path).map_err(|source| BuildError::SourceRead {
        path: file.relative_path.clone(),
        source,
    })
}
