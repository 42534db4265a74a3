//! Build error types and the per-file error policy.

use crate::{config::ErrorPolicy, log, logger::Logger};
use std::{io, path::PathBuf};
use thiserror::Error;

/// Error reported by a template engine.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can stop a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source directory `{}` not found", .0.display())]
    SourceNotFound(PathBuf),

    #[error("read failed for `{path}`")]
    SourceRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("copy failed for `{path}`")]
    CopyFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("template failed for `{path}`")]
    Template {
        path: String,
        #[source]
        source: EngineError,
    },

    #[error("write failed for `{path}`")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("could not prepare `{}`", path.display())]
    PrepareOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("another build is already writing to `{}`", .0.display())]
    Busy(PathBuf),

    #[error("{failed} file(s) failed to build")]
    Incomplete { failed: usize },
}

impl BuildError {
    /// Whether the error concerns a single file, so the build may skip it.
    pub const fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::SourceRead { .. }
                | Self::CopyFailed { .. }
                | Self::Template { .. }
                | Self::Write { .. }
        )
    }
}

/// Applies the configured [`ErrorPolicy`] to per-file errors.
#[derive(Debug)]
pub struct Failures {
    policy: ErrorPolicy,
    errors: Vec<BuildError>,
}

impl Failures {
    pub const fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            errors: Vec::new(),
        }
    }

    /// Hand an error to the policy.
    ///
    /// Returns the error back when the build must stop; records it and
    /// returns `Ok` when the build may skip the file.
    pub fn absorb(&mut self, err: BuildError, logger: &Logger) -> Result<(), BuildError> {
        if self.policy == ErrorPolicy::FailFast || !err.is_per_file() {
            return Err(err);
        }
        log!(logger, "error"; "{}", chain(&err));
        self.errors.push(err);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Render an error with its sources, `outer: inner: innermost`.
pub fn chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Verbosity;

    fn read_error(path: &str) -> BuildError {
        BuildError::SourceRead {
            path: path.into(),
            source: io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8"),
        }
    }

    #[test]
    fn test_display_names_file_and_stage() {
        let err = BuildError::Write {
            path: "docs/index.html".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "write failed for `docs/index.html`");
        assert_eq!(chain(&err), "write failed for `docs/index.html`: denied");
    }

    #[test]
    fn test_fail_fast_returns_error() {
        let logger = Logger::capture(Verbosity::Normal);
        let mut failures = Failures::new(ErrorPolicy::FailFast);

        let result = failures.absorb(read_error("a.md"), &logger);

        assert!(matches!(result, Err(BuildError::SourceRead { .. })));
        assert!(failures.is_empty());
        assert!(logger.lines().is_empty());
    }

    #[test]
    fn test_continue_records_and_logs() {
        let logger = Logger::capture(Verbosity::Normal);
        let mut failures = Failures::new(ErrorPolicy::Continue);

        failures.absorb(read_error("a.md"), &logger).unwrap();
        failures.absorb(read_error("b.md"), &logger).unwrap();

        assert_eq!(failures.len(), 2);
        assert_eq!(
            logger.lines()[0],
            "[error] read failed for `a.md`: stream did not contain valid UTF-8"
        );
    }

    #[test]
    fn test_continue_still_stops_on_global_errors() {
        let logger = Logger::capture(Verbosity::Normal);
        let mut failures = Failures::new(ErrorPolicy::Continue);

        let result = failures.absorb(BuildError::Busy(PathBuf::from("/out")), &logger);

        assert!(matches!(result, Err(BuildError::Busy(_))));
        assert!(failures.is_empty());
    }
}
