//! One build per output directory.
//!
//! Every build clears its output directory first, so two builds racing on the
//! same directory would delete each other's files. Builds register their
//! output path here and hold an [`OutputLock`] until they finish.

use super::error::BuildError;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Output directories with a build in flight.
static ACTIVE: LazyLock<Mutex<FxHashSet<PathBuf>>> = LazyLock::new(Mutex::default);

/// Held for the duration of a build; releases the directory on drop.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

/// Claim `output` for this build.
///
/// Fails with [`BuildError::Busy`] if another build in this process holds it.
pub fn acquire(output: &Path) -> Result<OutputLock, BuildError> {
    let path = output.to_path_buf();
    if !ACTIVE.lock().insert(path.clone()) {
        return Err(BuildError::Busy(path));
    }
    Ok(OutputLock { path })
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        ACTIVE.lock().remove(&self.path);
    }
}
