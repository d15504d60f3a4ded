//! Core traits and types for the scanner device control channel.

/// Numeric identifier of a device option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub u32);

impl std::fmt::Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed-point number as used by the device protocol (16.16 format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fixed(pub i32);

impl Fixed {
    const SCALE: f64 = 65536.0;

    /// Convert a real number to fixed point, truncating toward zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(value: f64) -> Self {
        Self((value * Self::SCALE) as i32)
    }

    /// Convert an integer to fixed point.
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        Self(value.wrapping_shl(16))
    }

    /// Convert back to a real number.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / Self::SCALE
    }
}

/// Type of value an option carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Text value.
    String,
    /// Fixed-point value.
    Fixed,
    /// Boolean flag.
    Bool,
    /// Signed integer.
    Int,
}

/// A typed option value exchanged with the device.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Text value.
    String(String),
    /// Fixed-point value.
    Fixed(Fixed),
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i32),
}

impl OptionValue {
    /// Kind of this value.
    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        match self {
            Self::String(_) => OptionKind::String,
            Self::Fixed(_) => OptionKind::Fixed,
            Self::Bool(_) => OptionKind::Bool,
            Self::Int(_) => OptionKind::Int,
        }
    }

    /// Fixed-point payload, if this is a fixed-point value.
    #[must_use]
    pub const fn as_fixed(&self) -> Option<Fixed> {
        match self {
            Self::Fixed(value) => Some(*value),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => write!(f, "{value}"),
            Self::Fixed(value) => write!(f, "{}", value.to_f64()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

/// Device-advertised metadata for one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor {
    /// Short option name (e.g. `exposure-time-r`).
    pub name: String,
    /// Human readable title.
    pub title: String,
    /// Value type.
    pub kind: OptionKind,
}

/// Failure codes a device may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Operation is not supported.
    Unsupported,
    /// Operation was cancelled.
    Cancelled,
    /// Device is busy; try again later.
    DeviceBusy,
    /// Data or argument is invalid.
    Invalid,
    /// Document feeder jammed.
    Jammed,
    /// Document feeder out of documents.
    NoDocuments,
    /// Scanner cover is open.
    CoverOpen,
    /// Error during device I/O.
    IoError,
    /// Out of memory.
    NoMemory,
    /// Access to resource has been denied.
    AccessDenied,
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::Unsupported => "Operation not supported",
            Self::Cancelled => "Operation was cancelled",
            Self::DeviceBusy => "Device busy",
            Self::Invalid => "Invalid argument",
            Self::Jammed => "Document feeder jammed",
            Self::NoDocuments => "Document feeder out of documents",
            Self::CoverOpen => "Scanner cover is open",
            Self::IoError => "Error during device I/O",
            Self::NoMemory => "Out of memory",
            Self::AccessDenied => "Access to resource has been denied",
        };
        f.write_str(msg)
    }
}

/// Result of a start or read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Request succeeded.
    Good,
    /// No more data for this scan.
    EndOfData,
    /// The lamp is warming up; the start request must be retried.
    WarmingUp,
    /// The device reported a failure.
    Error(StatusCode),
}

/// Geometry of the scan about to be streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    /// Pixels in one line.
    pub pixels_per_line: u32,
    /// Declared number of lines.
    pub lines: u32,
    /// Bytes the device delivers per line.
    pub bytes_per_line: u32,
    /// Bits per sample.
    pub depth: u32,
}

impl ScanParameters {
    /// Interleaved channels per pixel (R, G, B, infrared).
    pub const CHANNELS: u32 = 4;

    /// Parameters for a tightly packed 16-bit RGBI scan.
    ///
    /// Widths whose line size does not fit a `u32` saturate, which the
    /// acquisition loop rejects as too short.
    #[must_use]
    pub const fn new(pixels_per_line: u32, lines: u32) -> Self {
        Self {
            pixels_per_line,
            lines,
            bytes_per_line: pixels_per_line.saturating_mul(Self::CHANNELS * 2),
            depth: 16,
        }
    }
}

/// Identification of an enumerated device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name used to open the device.
    pub name: String,
    /// Vendor string.
    pub vendor: String,
    /// Model string.
    pub model: String,
}

/// Driver-level entry point: device discovery and opening.
pub trait DeviceBackend {
    /// Handle type returned by `open`.
    type Handle: DeviceControl;

    /// List the devices currently attached.
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, StatusCode>;

    /// Open a device by name.
    fn open(&mut self, name: &str) -> Result<Self::Handle, StatusCode>;

    /// Release the driver session. Called once after the handle is closed.
    fn exit(&mut self);
}

/// Control channel of one open device.
pub trait DeviceControl {
    /// Metadata for an option, if the device has it.
    fn descriptor(&self, id: OptionId) -> Option<OptionDescriptor>;

    /// Read the current value of an option.
    fn get_option(&mut self, id: OptionId) -> Result<OptionValue, StatusCode>;

    /// Set an option. Returns the value the device actually applied.
    fn set_option(&mut self, id: OptionId, value: &OptionValue) -> Result<OptionValue, StatusCode>;

    /// Request the start of a scan.
    fn start(&mut self) -> ScanStatus;

    /// Parameters of the scan that was just started.
    fn parameters(&mut self) -> Result<ScanParameters, StatusCode>;

    /// Read the next chunk into `buf`. Returns the number of bytes written.
    fn read(&mut self, buf: &mut [u8]) -> (usize, ScanStatus);

    /// Abort the current operation, or end a completed scan.
    fn cancel(&mut self);

    /// Close the handle.
    fn close(&mut self);
}
