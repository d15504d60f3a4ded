//! Error taxonomy for the acquisition pipeline.

use std::path::PathBuf;

use crate::session::SessionState;
use crate::traits::{OptionId, StatusCode};

/// Stage of a scan in which the device reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPhase {
    /// The start request (including warm-up polling).
    Start,
    /// Querying or validating the per-scan parameters.
    Parameters,
    /// A chunk read in the middle of the stream.
    Read,
}

impl std::fmt::Display for AcquisitionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Parameters => write!(f, "parameters"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// Error type for scanner operations.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Enumeration returned no devices.
    #[error("no scanner devices found")]
    DeviceNotFound,

    /// Enumeration or opening the first device was rejected.
    #[error("failed to open device {device}: {status}")]
    DeviceOpen {
        /// Device name, empty when enumeration itself failed.
        device: String,
        /// Status reported by the driver.
        status: StatusCode,
    },

    /// A get/set round trip for an option failed.
    #[error("failed to apply option {option} ({name}): {status}")]
    Configuration {
        /// Numeric option id.
        option: OptionId,
        /// Option name from the option table.
        name: &'static str,
        /// Status reported by the device.
        status: StatusCode,
    },

    /// The device failed while starting or streaming a scan.
    #[error("acquisition failed during {phase}: {status}")]
    Acquisition {
        /// Where the failure happened.
        phase: AcquisitionPhase,
        /// Status reported by the device.
        status: StatusCode,
    },

    /// The device kept reporting warm-up past the attempt cap.
    #[error("device still warming up after {attempts} attempts")]
    WarmupTimeout {
        /// Number of start requests issued.
        attempts: u32,
    },

    /// An operation was called in a session state that does not allow it.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// Operation name.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    /// The encoder only writes grayscale or RGB.
    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(usize),

    /// Image encoding or file creation failed.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Creating, sizing or mapping a raw array file failed.
    #[error("storage error for {}: {source}", path.display())]
    Storage {
        /// Backing file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A captured image did not match the expected pattern.
    #[error("image validation failed: {0}")]
    Validation(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The interrupt handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl From<image::ImageError> for ScanError {
    fn from(err: image::ImageError) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<figment::Error> for ScanError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl ScanError {
    /// Build a storage error for `path`.
    pub fn storage<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Result type for scanner operations.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_option() {
        let err = ScanError::Configuration {
            option: OptionId(30),
            name: "light",
            status: StatusCode::Invalid,
        };
        let msg = err.to_string();
        assert!(msg.contains("30"), "{msg}");
        assert!(msg.contains("light"), "{msg}");
    }

    #[test]
    fn test_acquisition_error_display() {
        let err = ScanError::Acquisition {
            phase: AcquisitionPhase::Read,
            status: StatusCode::IoError,
        };
        assert_eq!(
            err.to_string(),
            "acquisition failed during read: Error during device I/O"
        );
    }

    #[test]
    fn test_invalid_state_display() {
        let err = ScanError::InvalidState {
            operation: "start",
            state: SessionState::Closed,
        };
        assert_eq!(err.to_string(), "cannot start while session is closed");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScanError>();
    }
}
