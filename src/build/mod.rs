//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── lock::acquire(output)
//!     ├── writer::recreate_dir(target)        target = output, or output.staging
//!     │
//!     ├── walk::walk_source()
//!     │       └── transform::transform()      assets are copied here
//!     │                                       pages are buffered
//!     ├── template::compile_units()
//!     ├── writer::write_units()
//!     │
//!     └── (atomic) swap target into output
//! ```
//!
//! The build is non-incremental: the output directory is wiped every time.
//! Without `atomic`, a failed build leaves the output partially written.

pub mod error;
pub mod lock;
pub mod markdown;
pub mod template;
pub mod transform;
pub mod walk;
pub mod writer;

pub use error::BuildError;

use crate::{config::SiteConfig, debug, log, logger::Logger};
use error::Failures;
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use transform::Transformed;

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// HTML pages written.
    pub pages: usize,
    /// Assets copied.
    pub assets: usize,
    pub elapsed: Duration,
}

impl BuildReport {
    pub const fn files(&self) -> usize {
        self.pages + self.assets
    }
}

/// Sibling directory used by atomic builds: `build` → `build.staging`.
pub fn staging_dir(output: &Path) -> PathBuf {
    sibling_dir(output, ".staging")
}

/// Where the previous output waits while the staging dir is renamed in.
fn backup_dir(output: &Path) -> PathBuf {
    sibling_dir(output, ".previous")
}

fn sibling_dir(output: &Path, suffix: &str) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(suffix);
    output.with_file_name(name)
}

/// Build the entire site.
///
/// Fails with [`BuildError::SourceNotFound`] before touching the output when
/// the source directory is missing.
pub fn build_site(config: &SiteConfig, logger: &Logger) -> Result<BuildReport, BuildError> {
    let source = &config.build.source;
    let output = &config.build.output;

    if !source.is_dir() {
        return Err(BuildError::SourceNotFound(source.clone()));
    }

    let _lock = lock::acquire(output)?;
    let started = Instant::now();

    log!(logger, "build"; "{} -> {}", source.display(), output.display());

    let report = if config.build.atomic {
        let staging = staging_dir(output);
        match run_pipeline(config, &staging, logger) {
            Ok(counts) => {
                swap_into_place(&staging, output)?;
                counts
            }
            Err(err) => {
                fs::remove_dir_all(&staging).ok();
                return Err(err);
            }
        }
    } else {
        run_pipeline(config, output, logger)?
    };

    let report = BuildReport {
        elapsed: started.elapsed(),
        ..report
    };
    log!(
        logger, "build";
        "done: {} files ({} pages, {} assets) in {:.2}s",
        report.files(), report.pages, report.assets, report.elapsed.as_secs_f64()
    );
    Ok(report)
}

/// Walk, transform, template and write into `target`.
fn run_pipeline(
    config: &SiteConfig,
    target: &Path,
    logger: &Logger,
) -> Result<BuildReport, BuildError> {
    let build = &config.build;
    let mut failures = Failures::new(build.on_error);

    writer::recreate_dir(target, logger)?;

    let excluded = vec![build.output.clone(), staging_dir(&build.output)];
    let mut units = Vec::new();
    let mut assets = 0;

    for file in walk::walk_source(&build.source, excluded)? {
        let transformed = file.and_then(|file| {
            transform::transform(file, target, &build.markdown, logger)
        });
        match transformed {
            Ok(Transformed::Render(unit)) => units.push(unit),
            Ok(Transformed::Copied(copy)) => {
                debug!(logger, "copy"; "{}", copy.relative_path);
                assets += 1;
            }
            Err(err) => failures.absorb(err, logger)?,
        }
    }

    template::ensure_templates_dir(&build.source)?;

    let engine = template::create_engine(build.engine, &build.source, build.autoescape);
    debug!(logger, "template"; "{} engine, {} pages", engine.name(), units.len());
    let units =
        template::compile_units(units, engine.as_ref(), &config.context, &mut failures, logger)?;

    let pages = writer::write_units(units, target, &mut failures, logger)?;

    if !failures.is_empty() {
        log!(logger, "error"; "{} file(s) failed, output is incomplete", failures.len());
        return Err(BuildError::Incomplete {
            failed: failures.len(),
        });
    }

    Ok(BuildReport {
        pages,
        assets,
        elapsed: Duration::ZERO,
    })
}

/// Replace `output` with the finished staging directory.
///
/// The old output is moved aside first and moved back if the rename fails,
/// so a failed swap leaves it in place.
fn swap_into_place(staging: &Path, output: &Path) -> Result<(), BuildError> {
    let prepare = |source| BuildError::PrepareOutput {
        path: output.to_path_buf(),
        source,
    };

    let backup = backup_dir(output);
    if backup.exists() {
        fs::remove_dir_all(&backup).map_err(prepare)?;
    }
    let had_output = output.exists();
    if had_output {
        fs::rename(output, &backup).map_err(prepare)?;
    }

    if let Err(err) = fs::rename(staging, output) {
        if had_output {
            fs::rename(&backup, output).ok();
        }
        return Err(prepare(err));
    }

    if had_output {
        fs::remove_dir_all(&backup).map_err(prepare)?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ErrorPolicy, logger::Verbosity};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct Site {
        _dir: TempDir,
        config: SiteConfig,
    }

    impl Site {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = SiteConfig::default();
            config.build.source = dir.path().join("public");
            config.build.output = dir.path().join("build");
            fs::create_dir_all(&config.build.source).unwrap();
            Self { _dir: dir, config }
        }

        fn add(&self, rel: &str, content: impl AsRef<[u8]>) -> &Self {
            let path = self.config.build.source.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
            self
        }

        fn build(&self) -> Result<BuildReport, BuildError> {
            build_site(&self.config, &Logger::capture(Verbosity::Normal))
        }

        fn output(&self) -> &Path {
            &self.config.build.output
        }

        fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.output().join(rel)).unwrap()
        }
    }

    /// Every file under `root` with its bytes, keyed by `/`-separated path.
    fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = crate::utils::path::relative_slash_path(e.path(), root).unwrap();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_staging_dir() {
        assert_eq!(staging_dir(Path::new("/site/build")), Path::new("/site/build.staging"));
    }

    #[test]
    fn test_build_end_to_end() {
        let mut site = Site::new();
        site.config
            .context
            .insert("site".into(), toml::Value::String("Homer".into()));
        site.add("index.md", "# {{ site }}\n")
            .add("about.html", "<p>{{ site }}</p>")
            .add("css/site.css", "body{}")
            .add("js/app.js", "let x = 1;");

        let report = site.build().unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.assets, 2);
        assert_eq!(report.files(), 4);
        assert_eq!(site.read("index.html"), "<h1>Homer</h1>");
        assert_eq!(site.read("about.html"), "<p>Homer</p>");
    }

    #[test]
    fn test_md_extension_mapping() {
        let site = Site::new();
        site.add("notes/v1.2.md", "one")
            .add("archive.md.md", "two")
            .add("deep/a/b/c.md", "three");

        site.build().unwrap();

        let files: Vec<_> = snapshot(site.output()).into_keys().collect();
        assert_eq!(files, vec!["archive.md.html", "deep/a/b/c.html", "notes/v1.2.html"]);
    }

    #[test]
    fn test_assets_byte_identical() {
        let site = Site::new();
        let css = b"/* \xc3\xa9 */ a { color: #fff }\r\n".to_vec();
        let js = b"\xef\xbb\xbfconsole.log('{{ not a template }}');".to_vec();
        site.add("style.css", &css).add("lib/app.js", &js);

        site.build().unwrap();

        assert_eq!(fs::read(site.output().join("style.css")).unwrap(), css);
        assert_eq!(fs::read(site.output().join("lib/app.js")).unwrap(), js);
    }

    #[test]
    fn test_unrecognized_files_ignored() {
        let site = Site::new();
        site.add("index.md", "hi")
            .add("notes.txt", "skip")
            .add("img/photo.png", [0u8, 1, 2])
            .add("README", "skip");

        site.build().unwrap();

        let files: Vec<_> = snapshot(site.output()).into_keys().collect();
        assert_eq!(files, vec!["index.html"]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let site = Site::new();
        site.add("index.md", "# Home\n\n* a\n* b\n")
            .add("docs/page.html", "<main>{{ 2 * 3 }}</main>")
            .add("style.css", "a{}");

        site.build().unwrap();
        let first = snapshot(site.output());
        site.build().unwrap();
        let second = snapshot(site.output());

        assert_eq!(first, second);
    }

    #[test]
    fn test_destructive_rebuild() {
        let site = Site::new();
        site.add("index.md", "hi");
        fs::create_dir_all(site.output().join("old/dir")).unwrap();
        fs::write(site.output().join("old/dir/stale.html"), "stale").unwrap();
        fs::write(site.output().join("unrelated.txt"), "x").unwrap();

        site.build().unwrap();

        let files: Vec<_> = snapshot(site.output()).into_keys().collect();
        assert_eq!(files, vec!["index.html"]);
        assert!(!site.output().join("old").exists());
    }

    #[test]
    fn test_missing_source_leaves_output_untouched() {
        let site = Site::new();
        fs::remove_dir_all(&site.config.build.source).unwrap();
        fs::create_dir_all(site.output()).unwrap();
        fs::write(site.output().join("keep.html"), "keep").unwrap();

        let err = site.build().unwrap_err();

        assert!(matches!(err, BuildError::SourceNotFound(_)));
        assert_eq!(site.read("keep.html"), "keep");
    }

    #[test]
    fn test_templates_dir_created() {
        let site = Site::new();
        site.add("index.md", "hi");

        site.build().unwrap();

        assert!(site.config.build.source.join("templates").is_dir());
    }

    #[test]
    fn test_template_error_aborts() {
        let site = Site::new();
        site.add("a.html", "ok").add("b.html", "{% for %}").add("c.html", "ok");

        let err = site.build().unwrap_err();

        assert!(matches!(err, BuildError::Template { ref path, .. } if path == "b.html"));
        // templating runs before any page is written
        assert!(!site.output().join("a.html").exists());
    }

    #[test]
    fn test_continue_mode_skips_failures() {
        let mut site = Site::new();
        site.config.build.on_error = ErrorPolicy::Continue;
        site.add("good.html", "{{ 1 + 1 }}")
            .add("bad.html", "{{ oops(")
            .add("broken.md", [0xffu8, 0xfe]);

        let err = site.build().unwrap_err();

        assert!(matches!(err, BuildError::Incomplete { failed: 2 }));
        assert_eq!(site.read("good.html"), "2");
        assert!(!site.output().join("bad.html").exists());
        assert!(!site.output().join("broken.html").exists());
    }

    #[test]
    fn test_output_inside_source_not_walked() {
        let mut site = Site::new();
        site.config.build.output = site.config.build.source.join("_build");
        site.add("index.md", "hi");

        site.build().unwrap();
        site.build().unwrap();

        let files: Vec<_> = snapshot(site.output()).into_keys().collect();
        assert_eq!(files, vec!["index.html"]);
    }

    #[test]
    fn test_atomic_success_replaces_output() {
        let mut site = Site::new();
        site.config.build.atomic = true;
        site.add("index.md", "new");
        fs::create_dir_all(site.output()).unwrap();
        fs::write(site.output().join("old.html"), "old").unwrap();

        site.build().unwrap();

        let files: Vec<_> = snapshot(site.output()).into_keys().collect();
        assert_eq!(files, vec!["index.html"]);
        assert!(!staging_dir(site.output()).exists());
    }

    #[test]
    fn test_atomic_failure_keeps_previous_output() {
        let mut site = Site::new();
        site.config.build.atomic = true;
        site.add("index.md", "new").add("bad.html", "{% if %}");
        fs::create_dir_all(site.output()).unwrap();
        fs::write(site.output().join("old.html"), "old").unwrap();

        assert!(site.build().is_err());

        assert_eq!(site.read("old.html"), "old");
        assert!(!staging_dir(site.output()).exists());
    }

    #[test]
    fn test_failed_swap_restores_output() {
        let site = Site::new();
        fs::create_dir_all(site.output()).unwrap();
        fs::write(site.output().join("old.html"), "old").unwrap();
        // no staging dir, so the rename fails
        let staging = staging_dir(site.output());

        let err = swap_into_place(&staging, site.output()).unwrap_err();

        assert!(matches!(err, BuildError::PrepareOutput { .. }));
        assert_eq!(site.read("old.html"), "old");
        assert!(!backup_dir(site.output()).exists());
    }

    #[test]
    fn test_swap_replaces_output() {
        let site = Site::new();
        fs::create_dir_all(site.output()).unwrap();
        fs::write(site.output().join("old.html"), "old").unwrap();
        let staging = staging_dir(site.output());
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("new.html"), "new").unwrap();

        swap_into_place(&staging, site.output()).unwrap();

        let files: Vec<_> = snapshot(site.output()).into_keys().collect();
        assert_eq!(files, vec!["new.html"]);
        assert!(!staging.exists());
        assert!(!backup_dir(site.output()).exists());
    }

    #[test]
    fn test_include_of_page_output_name_fails() {
        let site = Site::new();
        site.add("a.md", "# From Markdown")
            .add("b.html", "{% include \"a.html\" %}");

        let err = site.build().unwrap_err();

        assert!(matches!(err, BuildError::Template { ref path, .. } if path == "b.html"));
    }

    #[test]
    fn test_include_of_source_file_works() {
        let site = Site::new();
        site.add("partials/nav.html", "<nav></nav>")
            .add("z.html", "{% include \"partials/nav.html\" %}<main></main>");

        site.build().unwrap();

        assert_eq!(site.read("z.html"), "<nav></nav><main></main>");
    }

    #[test]
    fn test_copies_logged_verbosely() {
        let site = Site::new();
        site.add("css/site.css", "a{}");
        let logger = Logger::capture(Verbosity::Verbose);

        build_site(&site.config, &logger).unwrap();

        assert!(logger.lines().contains(&"[copy] css/site.css".to_string()));
    }

    #[test]
    fn test_concurrent_build_is_busy() {
        let site = Site::new();
        site.add("index.md", "hi");
        let _held = lock::acquire(site.output()).unwrap();

        let err = site.build().unwrap_err();

        assert!(matches!(err, BuildError::Busy(_)));
    }

    #[test]
    fn test_summary_logged() {
        let site = Site::new();
        site.add("index.md", "hi").add("a.css", "");
        let logger = Logger::capture(Verbosity::Normal);

        build_site(&site.config, &logger).unwrap();

        let lines = logger.lines();
        let summary = lines.last().unwrap();
        assert!(summary.starts_with("[build] done: 2 files (1 pages, 1 assets) in "));
    }
}
