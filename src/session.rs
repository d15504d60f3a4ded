//! Device session: exclusive owner of the device handle and its lifecycle.

use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AcquisitionPhase, Result, ScanError};
use crate::options::{self, OptionReading};
use crate::settings::{CropRect, ScanSettings};
use crate::traits::{
    DeviceBackend, DeviceControl, DeviceInfo, ScanParameters, ScanStatus, StatusCode,
};

/// Lifecycle state of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device handle.
    Closed,
    /// Device opened, not configured yet.
    Open,
    /// Options applied; ready to start a scan.
    Configured,
    /// A scan is running.
    Acquiring,
    /// A cancel was issued for the running scan.
    Cancelling,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Configured => "configured",
            Self::Acquiring => "acquiring",
            Self::Cancelling => "cancelling",
        };
        f.write_str(name)
    }
}

/// Bounds on the warm-up poll performed by [`DeviceSession::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupPolicy {
    /// Maximum number of start requests.
    pub max_attempts: u32,
    /// Delay between two start requests, in milliseconds.
    pub delay_ms: u64,
}

impl Default for WarmupPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            delay_ms: 500,
        }
    }
}

impl WarmupPolicy {
    /// Delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Owns the device backend and the one open handle.
///
/// Every failing device operation closes the device before the error is
/// returned; the caller has to `open` again to retry. State errors
/// ([`ScanError::InvalidState`]) leave the session untouched.
///
/// Dropping the session closes the device.
pub struct DeviceSession<B: DeviceBackend> {
    backend: B,
    handle: Option<B::Handle>,
    device: Option<DeviceInfo>,
    state: SessionState,
    warmup: WarmupPolicy,
    backend_active: bool,
}

impl<B: DeviceBackend> std::fmt::Debug for DeviceSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device", &self.device)
            .field("state", &self.state)
            .field("warmup", &self.warmup)
            .finish_non_exhaustive()
    }
}

impl<B: DeviceBackend> DeviceSession<B> {
    /// New closed session over `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            handle: None,
            device: None,
            state: SessionState::Closed,
            warmup: WarmupPolicy::default(),
            backend_active: false,
        }
    }

    /// Use a different warm-up policy.
    #[must_use]
    pub fn with_warmup(mut self, warmup: WarmupPolicy) -> Self {
        self.warmup = warmup;
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The device opened by this session, if any.
    #[must_use]
    pub const fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// Open the first device the backend reports.
    pub fn open(&mut self) -> Result<()> {
        self.require("open", &[SessionState::Closed])?;
        self.backend_active = true;

        let devices = match self.backend.enumerate() {
            Ok(devices) => devices,
            Err(status) => {
                return Err(self.fail(ScanError::DeviceOpen {
                    device: String::new(),
                    status,
                }))
            }
        };
        let Some(info) = devices.into_iter().next() else {
            return Err(self.fail(ScanError::DeviceNotFound));
        };
        info!("Device found: {} ({} {})", info.name, info.vendor, info.model);

        match self.backend.open(&info.name) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.device = Some(info);
                self.state = SessionState::Open;
                Ok(())
            }
            Err(status) => Err(self.fail(ScanError::DeviceOpen {
                device: info.name,
                status,
            })),
        }
    }

    /// Apply every option of `settings` to the device.
    ///
    /// Without an explicit area the corners the device reports are written
    /// back unchanged. Not transactional: on failure the options before the
    /// failing one have already been applied, and the session is closed.
    pub fn configure(&mut self, settings: &ScanSettings) -> Result<()> {
        self.require(
            "configure",
            &[
                SessionState::Open,
                SessionState::Configured,
                SessionState::Cancelling,
            ],
        )?;

        let resolved;
        let settings = if settings.area.is_some() {
            settings
        } else {
            let area = self.device_area()?;
            debug!("Using device scan area {area:?}");
            resolved = settings.clone().with_area(area);
            &resolved
        };

        let handle = self.handle_mut("configure")?;
        if let Err(err) = options::apply(handle, settings) {
            return Err(self.fail(err));
        }

        debug!("Applied {} options", options::SCAN_OPTIONS.len());
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Start a scan, polling through warm-up within the configured bounds.
    pub fn start(&mut self) -> Result<()> {
        self.require("start", &[SessionState::Configured])?;
        let warmup = self.warmup;
        let max_attempts = warmup.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let status = self.handle_mut("start")?.start();
            match status {
                ScanStatus::Good => {
                    info!("Scan started");
                    self.state = SessionState::Acquiring;
                    return Ok(());
                }
                ScanStatus::WarmingUp => {
                    info!("Warming up... (attempt {attempt}/{max_attempts})");
                    if attempt < max_attempts {
                        std::thread::sleep(warmup.delay());
                    }
                }
                ScanStatus::EndOfData => {
                    return Err(self.abort_scan(ScanError::Acquisition {
                        phase: AcquisitionPhase::Start,
                        status: StatusCode::NoDocuments,
                    }));
                }
                ScanStatus::Error(status) => {
                    return Err(self.abort_scan(ScanError::Acquisition {
                        phase: AcquisitionPhase::Start,
                        status,
                    }));
                }
            }
        }

        warn!("Device did not finish warming up after {max_attempts} attempts");
        Err(self.abort_scan(ScanError::WarmupTimeout {
            attempts: max_attempts,
        }))
    }

    /// Parameters of the running scan.
    pub fn parameters(&mut self) -> Result<ScanParameters> {
        self.require("query parameters", &[SessionState::Acquiring])?;
        let result = self.handle_mut("query parameters")?.parameters();
        match result {
            Ok(params) => Ok(params),
            Err(status) => Err(self.abort_scan(ScanError::Acquisition {
                phase: AcquisitionPhase::Parameters,
                status,
            })),
        }
    }

    /// Read one chunk of the running scan.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<(usize, ScanStatus)> {
        self.require(
            "read",
            &[SessionState::Acquiring, SessionState::Cancelling],
        )?;
        Ok(self.handle_mut("read")?.read(buf))
    }

    /// Ask the device to abort the running scan.
    ///
    /// Idempotent: the device cancel is only issued on the first call.
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            SessionState::Acquiring => {
                info!("Trying to stop scanner...");
                self.handle_mut("cancel")?.cancel();
                self.state = SessionState::Cancelling;
                Ok(())
            }
            SessionState::Cancelling => Ok(()),
            _ => Err(self.state_error("cancel")),
        }
    }

    /// End a scan that reached end-of-data, leaving the session ready for
    /// the next one.
    pub fn finish(&mut self) -> Result<()> {
        self.require("finish", &[SessionState::Acquiring])?;
        self.handle_mut("finish")?.cancel();
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Close the device and release the backend. Safe in any state.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            info!("Closing device");
            handle.close();
        }
        if self.backend_active {
            debug!("Releasing driver session");
            self.backend.exit();
            self.backend_active = false;
        }
        self.device = None;
        self.state = SessionState::Closed;
    }

    /// Default settings with the scan area the device currently reports.
    pub fn default_settings(&mut self) -> Result<ScanSettings> {
        let area = self.device_area()?;
        Ok(ScanSettings::default().with_area(area))
    }

    /// Current value of every table option.
    pub fn option_report(&mut self) -> Result<Vec<OptionReading>> {
        let handle = self.handle_mut("read options")?;
        match options::read_back(handle) {
            Ok(readings) => Ok(readings),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn device_area(&mut self) -> Result<CropRect> {
        let handle = self.handle_mut("read scan area")?;
        match options::read_area(handle) {
            Ok(area) => Ok(area),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Close the device and hand back `err`.
    fn fail(&mut self, err: ScanError) -> ScanError {
        warn!("Scanner error: {err}");
        self.close();
        err
    }

    /// Cancel the running operation, then close and hand back `err`.
    pub(crate) fn abort_scan(&mut self, err: ScanError) -> ScanError {
        if let Some(handle) = self.handle.as_mut() {
            handle.cancel();
        }
        self.fail(err)
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.state_error(operation))
        }
    }

    const fn state_error(&self, operation: &'static str) -> ScanError {
        ScanError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn handle_mut(&mut self, operation: &'static str) -> Result<&mut B::Handle> {
        let state = self.state;
        self.handle
            .as_mut()
            .ok_or(ScanError::InvalidState { operation, state })
    }
}

impl<B: DeviceBackend> Drop for DeviceSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}
