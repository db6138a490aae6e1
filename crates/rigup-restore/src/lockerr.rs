//! Platform classification of lock-contention I/O errors.
//!
//! A file copy that fails because another process holds the file open
//! (an application with its own config file locked, for instance) is
//! tolerated: the file is skipped with a warning and the copy moves on.
//! Detection is by platform error code, never by matching the error
//! message text. The classifier is a trait so tests can inject one and
//! exercise the tolerance path with constructed errors instead of real
//! OS-level contention.

use std::io;

pub trait LockClassifier: Send + Sync {
    /// True if the error is a sharing/lock violation from another
    /// process holding the file, as opposed to a genuine I/O failure.
    fn is_contention(&self, err: &io::Error) -> bool;
}

/// Classifier backed by the current platform's error codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformLockClassifier;

#[cfg(windows)]
impl LockClassifier for PlatformLockClassifier {
    fn is_contention(&self, err: &io::Error) -> bool {
        // ERROR_SHARING_VIOLATION (32) / ERROR_LOCK_VIOLATION (33)
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
}

#[cfg(unix)]
impl LockClassifier for PlatformLockClassifier {
    fn is_contention(&self, err: &io::Error) -> bool {
        // EBUSY (16) / ETXTBSY (26)
        matches!(err.raw_os_error(), Some(16) | Some(26))
    }
}

#[cfg(not(any(unix, windows)))]
impl LockClassifier for PlatformLockClassifier {
    fn is_contention(&self, _err: &io::Error) -> bool {
        false
    }
}
