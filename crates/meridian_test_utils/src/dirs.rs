//! Directory helpers for test data layout.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Join `base` with each of `segments` using the platform separator.
///
/// This is plain string concatenation: no normalization, no existence checks,
/// and an absolute segment does not reset the path the way `Path::join` would.
pub fn join_dirs<S: AsRef<str>>(base: impl AsRef<Path>, segments: &[S]) -> PathBuf {
    let mut joined = base.as_ref().as_os_str().to_os_string();
    for segment in segments {
        joined.push(MAIN_SEPARATOR.to_string());
        joined.push(segment.as_ref());
    }
    PathBuf::from(joined)
}
