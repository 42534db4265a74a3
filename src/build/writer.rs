//! Output directory preparation and page writing.

use super::{
    error::{BuildError, Failures},
    transform::RenderUnit,
};
use crate::{debug, logger::Logger, utils::path::join_relative};
use std::{fs, io, path::Path};

/// Delete `path` if it exists, then create it empty.
pub fn recreate_dir(path: &Path, logger: &Logger) -> Result<(), BuildError> {
    let prepare = |source: io::Error| BuildError::PrepareOutput {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        debug!(logger, "write"; "removing {}", path.display());
        fs::remove_dir_all(path).map_err(prepare)?;
    }
    debug!(logger, "write"; "creating {}", path.display());
    fs::create_dir_all(path).map_err(prepare)
}

/// Write every unit under `destination`, consuming them.
///
/// Returns the number of pages written. Already-written pages stay on disk
/// when a later write fails.
pub fn write_units(
    units: Vec<RenderUnit>,
    destination: &Path,
    failures: &mut Failures,
    logger: &Logger,
) -> Result<usize, BuildError> {
    let mut written = 0;
    for unit in units {
        match write_unit(&unit, destination) {
            Ok(()) => {
                debug!(logger, "write"; "{}", unit.relative_path);
                written += 1;
            }
            Err(source) => failures.absorb(
                BuildError::Write {
                    path: unit.relative_path,
                    source,
                },
                logger,
            )?,
        }
    }
    Ok(written)
}

fn write_unit(unit: &RenderUnit, destination: &Path) -> io::Result<()> {
    let target = join_relative(destination, [unit.relative_path.as_str()]);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, &unit.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ErrorPolicy, logger::Verbosity};
    use tempfile::TempDir;

    fn unit(path: &str, content: &str) -> RenderUnit {
        RenderUnit {
            content: content.into(),
            relative_path: path.into(),
        }
    }

    #[test]
    fn test_recreate_dir_clears_contents() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("build");
        fs::create_dir_all(out.join("stale/deep")).unwrap();
        fs::write(out.join("stale/deep/old.html"), "old").unwrap();
        let logger = Logger::capture(Verbosity::Normal);

        recreate_dir(&out, &logger).unwrap();

        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_recreate_dir_creates_missing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a/b/build");
        let logger = Logger::capture(Verbosity::Normal);

        recreate_dir(&out, &logger).unwrap();

        assert!(out.is_dir());
    }

    #[test]
    fn test_write_units_creates_parents() {
        let dir = TempDir::new().unwrap();
        let logger = Logger::capture(Verbosity::Normal);
        let mut failures = Failures::new(ErrorPolicy::FailFast);

        let written = write_units(
            vec![unit("index.html", "<p>home</p>"), unit("docs/a/b.html", "<p>b</p>")],
            dir.path(),
            &mut failures,
            &logger,
        )
        .unwrap();

        assert_eq!(written, 2);
        assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), "<p>home</p>");
        assert_eq!(fs::read_to_string(dir.path().join("docs/a/b.html")).unwrap(), "<p>b</p>");
    }

    #[test]
    fn test_write_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), "a much longer previous body").unwrap();
        let logger = Logger::capture(Verbosity::Normal);
        let mut failures = Failures::new(ErrorPolicy::FailFast);

        write_units(vec![unit("page.html", "new")], dir.path(), &mut failures, &logger).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("page.html")).unwrap(), "new");
    }

    #[test]
    fn test_write_failure_names_path() {
        let dir = TempDir::new().unwrap();
        // a file where a directory is needed
        fs::write(dir.path().join("docs"), "blocker").unwrap();
        let logger = Logger::capture(Verbosity::Normal);
        let mut failures = Failures::new(ErrorPolicy::FailFast);

        let err = write_units(
            vec![unit("first.html", "1"), unit("docs/page.html", "x"), unit("z.html", "z")],
            dir.path(),
            &mut failures,
            &logger,
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::Write { ref path, .. } if path == "docs/page.html"));
        // no rollback, no further writes
        assert!(dir.path().join("first.html").exists());
        assert!(!dir.path().join("z.html").exists());
    }
}
