//! Error types for rigup-pkg

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Package-driver failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Driver binary is not on PATH
    #[error("Package manager '{binary}' not found on PATH")]
    DriverNotFound { binary: String },

    /// Driver process exited non-zero
    #[error("{binary} exited with status {status}: {stderr}")]
    CommandFailed {
        binary: String,
        status: i32,
        stderr: String,
    },

    /// Driver process exceeded the bounded wait
    #[error("{binary} timed out after {seconds}s")]
    Timeout { binary: String, seconds: u64 },

    /// Driver output could not be parsed
    #[error("Unreadable output from {binary}: {message}")]
    BadOutput { binary: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn driver_not_found(binary: impl Into<String>) -> Self {
        Self::DriverNotFound {
            binary: binary.into(),
        }
    }

    pub fn command_failed(binary: impl Into<String>, status: i32, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            binary: binary.into(),
            status,
            stderr: stderr.into(),
        }
    }

    pub fn bad_output(binary: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadOutput {
            binary: binary.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the CLI envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DriverNotFound { .. }
            | Self::CommandFailed { .. }
            | Self::Timeout { .. } => "INSTALL_FAILED",
            _ => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_map_to_install_failed() {
        assert_eq!(Error::driver_not_found("winget").code(), "INSTALL_FAILED");
        assert_eq!(
            Error::command_failed("brew", 1, "no such formula").code(),
            "INSTALL_FAILED"
        );
        assert_eq!(
            Error::Timeout {
                binary: "apt-get".to_string(),
                seconds: 120
            }
            .code(),
            "INSTALL_FAILED"
        );
        assert_eq!(Error::bad_output("winget", "not json").code(), "INTERNAL_ERROR");
    }
}
