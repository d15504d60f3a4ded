//! Piescan-Capture: an acquisition pipeline for RGBI film scanners.
//!
//! This library drives a scanner through a trait-based device channel:
//! opening and configuring the device, streaming interleaved RGBI scan lines
//! into planar image buffers, and exporting the planes. A scriptable
//! simulated scanner stands in for hardware in tests and in the CLI.

pub mod acquisition;
pub mod buffer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod export;
pub mod logging;
pub mod normalize;
pub mod options;
pub mod session;
pub mod settings;
pub mod signal;
pub mod sim;
pub mod store;
pub mod traits;
pub mod validation;

pub use acquisition::{acquire, scan_image, AcquisitionReport};
pub use buffer::{Channel, ImageBuffer};
pub use error::{AcquisitionPhase, Result, ScanError};
pub use session::{DeviceSession, SessionState, WarmupPolicy};
pub use settings::{CropRect, PerChannel, ScanSettings};
pub use signal::CancelFlag;
pub use traits::{
    DeviceBackend, DeviceControl, DeviceInfo, Fixed, OptionId, OptionValue, ScanParameters,
    ScanStatus, StatusCode,
};
