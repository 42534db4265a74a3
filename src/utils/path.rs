//! Path-safety and path-joining primitives shared by the build and the dev server.

use std::path::{Component, Path, PathBuf};

/// Filter a raw request path before it is mapped onto the output directory.
///
/// Trims surrounding whitespace and removes every `^` and every `..`.
/// `^` goes first so that `.^.` cannot reassemble into `..`; after both
/// passes the result never contains `..`.
///
/// This is a filter, not a canonicalizer: symlinks and `./` segments are left
/// alone. Pair it with [`is_within`] before touching the filesystem.
pub fn sanitize_request_path(raw: &str) -> String {
    raw.trim().replace('^', "").replace("..", "")
}

/// Join `segments` onto `base` with `/`, trimming leading and trailing
/// slashes from every segment. Empty segments are skipped, so the result
/// is always anchored at `base`.
///
/// ```ignore
/// join_relative(Path::new("build"), ["/docs/", "index.html"]) // build/docs/index.html
/// ```
pub fn join_relative<I, S>(base: &Path, segments: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = base.to_path_buf();
    for segment in segments {
        let segment = segment.as_ref().trim_matches('/');
        if !segment.is_empty() {
            joined.push(segment);
        }
    }
    joined
}

/// Check that `candidate` resolves (symlinks included) to a location under `root`.
///
/// Returns `false` when either path cannot be canonicalized, e.g. because it
/// does not exist.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    match (root.canonicalize(), candidate.canonicalize()) {
        (Ok(root), Ok(candidate)) => candidate.starts_with(root),
        _ => false,
    }
}

/// Express `path` relative to `base` using `/` separators.
///
/// Returns `None` if `path` is not under `base`, or if any component is not
/// valid UTF-8 or would step outside `base`.
pub fn relative_slash_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
