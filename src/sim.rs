//! Simulated scanner for running the pipeline without hardware.
//!
//! [`SimulatedScanner`] streams a synthetic RGBI pattern and can be scripted to
//! warm up, split or pad its reads, overrun the declared height, fail at
//! chosen points, or raise a [`CancelFlag`] mid-scan. Every device call is
//! recorded in a shared [`Journal`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::options::{self, BR_X, BR_Y, TL_X, TL_Y};
use crate::settings::ScanSettings;
use crate::signal::CancelFlag;
use crate::traits::{
    DeviceBackend, DeviceControl, DeviceInfo, Fixed, OptionDescriptor, OptionId, OptionValue,
    ScanParameters, ScanStatus, StatusCode,
};

/// A device call recorded by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    /// Device enumeration.
    Enumerate,
    /// Open by name.
    Open(String),
    /// Option read.
    GetOption(OptionId),
    /// Option write.
    SetOption(OptionId),
    /// Start request.
    Start,
    /// Parameter query.
    Parameters,
    /// Chunk read.
    Read,
    /// Cancel request.
    Cancel,
    /// Handle close.
    Close,
    /// Driver exit.
    Exit,
}

/// Shared, append-only record of device calls.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<DeviceCall>>>,
}

impl Journal {
    fn record(&self, call: DeviceCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Snapshot of every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `call` was recorded at least once.
    #[must_use]
    pub fn contains(&self, call: &DeviceCall) -> bool {
        self.count(call) > 0
    }

    /// How many times `call` was recorded.
    #[must_use]
    pub fn count(&self, call: &DeviceCall) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|recorded| *recorded == call)
            .count()
    }
}

/// Sample pattern streamed by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestPattern {
    /// Horizontal ramps: R full range, G half, B quarter, IR eighth.
    Gradient,
    /// Every pixel has the same RGBI value.
    Solid([u16; 4]),
    /// Explicit row-major RGBI pixels; pixels past the end are zero.
    Pixels(Vec<[u16; 4]>),
}

/// Highest analog gain the simulated device accepts; larger values are clamped.
pub const MAX_GAIN: i32 = 63;

/// Scriptable simulated RGBI film scanner.
#[derive(Debug)]
pub struct SimulatedScanner {
    info: DeviceInfo,
    params: ScanParameters,
    pattern: TestPattern,
    options: BTreeMap<OptionId, OptionValue>,
    journal: Journal,

    warmup_cycles: u32,
    fail_start: Option<StatusCode>,
    fail_option: Option<(OptionId, StatusCode)>,
    fail_read: Option<(u32, StatusCode)>,
    extra_lines: u32,
    short_lines: Option<u32>,
    chunk_size: Option<usize>,
    empty_reads: bool,
    overstated_bytes: usize,
    cancel_trigger: Option<(u32, CancelFlag)>,

    running: bool,
    cancelled: bool,
    lines_sent: u32,
    line: Vec<u8>,
    line_offset: usize,
    empty_pending: bool,
}

impl SimulatedScanner {
    /// Simulated scanner delivering `lines` lines of `pixels_per_line` pixels.
    #[must_use]
    pub fn new(pixels_per_line: u32, lines: u32) -> Self {
        let defaults = ScanSettings::default();
        let mut options: BTreeMap<OptionId, OptionValue> = options::SCAN_OPTIONS
            .iter()
            .map(|entry| (entry.id, (entry.value)(&defaults)))
            .collect();
        // 35mm frame
        options.insert(TL_X, OptionValue::Fixed(Fixed::from_int(0)));
        options.insert(TL_Y, OptionValue::Fixed(Fixed::from_int(0)));
        options.insert(BR_X, OptionValue::Fixed(Fixed::from_int(36)));
        options.insert(BR_Y, OptionValue::Fixed(Fixed::from_int(24)));

        Self {
            info: DeviceInfo {
                name: "pie:sim".to_owned(),
                vendor: "PIE".to_owned(),
                model: "Simulated RGBI scanner".to_owned(),
            },
            params: ScanParameters::new(pixels_per_line, lines),
            pattern: TestPattern::Gradient,
            options,
            journal: Journal::default(),
            warmup_cycles: 0,
            fail_start: None,
            fail_option: None,
            fail_read: None,
            extra_lines: 0,
            short_lines: None,
            chunk_size: None,
            empty_reads: false,
            overstated_bytes: 0,
            cancel_trigger: None,
            running: false,
            cancelled: false,
            lines_sent: 0,
            line: Vec::new(),
            line_offset: 0,
            empty_pending: false,
        }
    }

    /// Journal shared with this scanner.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Device identification.
    #[must_use]
    pub const fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Override the reported scan parameters.
    #[must_use]
    pub fn with_parameters(mut self, params: ScanParameters) -> Self {
        self.params = params;
        self
    }

    /// Set the streamed pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Preset an option value.
    #[must_use]
    pub fn with_option(mut self, id: OptionId, value: OptionValue) -> Self {
        self.options.insert(id, value);
        self
    }

    /// Drop an option, so reading it fails with [`StatusCode::Unsupported`].
    #[must_use]
    pub fn without_option(mut self, id: OptionId) -> Self {
        self.options.remove(&id);
        self
    }

    /// Report warm-up for the first `cycles` start requests.
    #[must_use]
    pub fn with_warmup_cycles(mut self, cycles: u32) -> Self {
        self.warmup_cycles = cycles;
        self
    }

    /// Fail every start request with `status`.
    #[must_use]
    pub fn fail_start(mut self, status: StatusCode) -> Self {
        self.fail_start = Some(status);
        self
    }

    /// Reject writes to option `id` with `status`.
    #[must_use]
    pub fn fail_option(mut self, id: OptionId, status: StatusCode) -> Self {
        self.fail_option = Some((id, status));
        self
    }

    /// Fail the first read after `lines` complete lines with `status`.
    #[must_use]
    pub fn fail_read_after(mut self, lines: u32, status: StatusCode) -> Self {
        self.fail_read = Some((lines, status));
        self
    }

    /// Deliver `extra` lines beyond the declared height.
    #[must_use]
    pub fn with_extra_lines(mut self, extra: u32) -> Self {
        self.extra_lines = extra;
        self
    }

    /// Report end of data after only `lines` lines.
    #[must_use]
    pub fn end_after(mut self, lines: u32) -> Self {
        self.short_lines = Some(lines);
        self
    }

    /// Deliver at most `bytes` bytes per read.
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    /// Answer every other read with zero bytes and a good status.
    #[must_use]
    pub fn with_empty_reads(mut self) -> Self {
        self.empty_reads = true;
        self
    }

    /// Report `bytes` more than were actually copied on every data read.
    #[must_use]
    pub fn overstate_reads(mut self, bytes: usize) -> Self {
        self.overstated_bytes = bytes;
        self
    }

    /// Raise `flag` once `lines` complete lines have been delivered.
    #[must_use]
    pub fn cancel_after(mut self, lines: u32, flag: CancelFlag) -> Self {
        self.cancel_trigger = Some((lines, flag));
        self
    }

    /// RGBI value of pixel (`x`, `y`) for the current pattern.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u16; 4] {
        pattern_pixel(&self.pattern, self.params.pixels_per_line, x, y)
    }

    fn fill_line(&mut self) {
        let width = self.params.pixels_per_line;
        let y = self.lines_sent;
        let mut line = Vec::with_capacity(self.params.bytes_per_line as usize);
        for x in 0..width {
            for sample in pattern_pixel(&self.pattern, width, x, y) {
                line.extend_from_slice(&sample.to_ne_bytes());
            }
        }
        line.resize(self.params.bytes_per_line as usize, 0);
        self.line = line;
        self.line_offset = 0;
    }

    fn total_lines(&self) -> u32 {
        self.short_lines
            .unwrap_or(self.params.lines + self.extra_lines)
    }
}

fn pattern_pixel(pattern: &TestPattern, width: u32, x: u32, y: u32) -> [u16; 4] {
    match pattern {
        TestPattern::Gradient => {
            let span = u64::from(width.saturating_sub(1).max(1));
            #[allow(clippy::cast_possible_truncation)]
            let ramp = (u64::from(x.min(width.saturating_sub(1))) * 65535 / span) as u16;
            [ramp, ramp / 2, ramp / 4, ramp / 8]
        }
        TestPattern::Solid(value) => *value,
        TestPattern::Pixels(pixels) => {
            let index = u64::from(y) * u64::from(width) + u64::from(x);
            usize::try_from(index)
                .ok()
                .and_then(|index| pixels.get(index))
                .copied()
                .unwrap_or_default()
        }
    }
}

impl DeviceControl for SimulatedScanner {
    fn descriptor(&self, id: OptionId) -> Option<OptionDescriptor> {
        options::find(id).map(|entry| OptionDescriptor {
            name: entry.name.to_owned(),
            title: entry.name.replace('-', " "),
            kind: entry.kind,
        })
    }

    fn get_option(&mut self, id: OptionId) -> Result<OptionValue, StatusCode> {
        self.journal.record(DeviceCall::GetOption(id));
        self.options.get(&id).cloned().ok_or(StatusCode::Unsupported)
    }

    fn set_option(&mut self, id: OptionId, value: &OptionValue) -> Result<OptionValue, StatusCode> {
        self.journal.record(DeviceCall::SetOption(id));
        if let Some((failing, status)) = self.fail_option {
            if failing == id {
                return Err(status);
            }
        }
        let entry = options::find(id).ok_or(StatusCode::Unsupported)?;
        if entry.kind != value.kind() {
            return Err(StatusCode::Invalid);
        }

        let applied = match (id.0, value) {
            (36..=39, OptionValue::Int(gain)) => OptionValue::Int((*gain).clamp(0, MAX_GAIN)),
            _ => value.clone(),
        };
        self.options.insert(id, applied.clone());
        Ok(applied)
    }

    fn start(&mut self) -> ScanStatus {
        self.journal.record(DeviceCall::Start);
        if self.warmup_cycles > 0 {
            self.warmup_cycles -= 1;
            return ScanStatus::WarmingUp;
        }
        if let Some(status) = self.fail_start {
            return ScanStatus::Error(status);
        }
        self.running = true;
        self.cancelled = false;
        self.lines_sent = 0;
        self.line.clear();
        self.line_offset = 0;
        self.empty_pending = self.empty_reads;
        ScanStatus::Good
    }

    fn parameters(&mut self) -> Result<ScanParameters, StatusCode> {
        self.journal.record(DeviceCall::Parameters);
        Ok(self.params)
    }

    fn read(&mut self, buf: &mut [u8]) -> (usize, ScanStatus) {
        self.journal.record(DeviceCall::Read);
        if !self.running {
            let status = if self.cancelled {
                StatusCode::Cancelled
            } else {
                StatusCode::Invalid
            };
            return (0, ScanStatus::Error(status));
        }
        if let Some((after, status)) = self.fail_read {
            if self.lines_sent >= after {
                return (0, ScanStatus::Error(status));
            }
        }
        if self.empty_pending {
            self.empty_pending = false;
            return (0, ScanStatus::Good);
        }
        self.empty_pending = self.empty_reads;

        if self.line_offset >= self.line.len() {
            if self.lines_sent >= self.total_lines() {
                return (0, ScanStatus::EndOfData);
            }
            self.fill_line();
        }

        let remaining = self.line.len() - self.line_offset;
        let count = self
            .chunk_size
            .map_or(remaining, |chunk| chunk.min(remaining))
            .min(buf.len());
        let end = self.line_offset + count;
        if let (Some(dst), Some(src)) = (buf.get_mut(..count), self.line.get(self.line_offset..end)) {
            dst.copy_from_slice(src);
        }
        self.line_offset = end;

        if self.line_offset >= self.line.len() {
            self.lines_sent += 1;
            if let Some((after, flag)) = &self.cancel_trigger {
                if self.lines_sent == *after {
                    flag.request();
                }
            }
        }
        (count + self.overstated_bytes, ScanStatus::Good)
    }

    fn cancel(&mut self) {
        self.journal.record(DeviceCall::Cancel);
        if self.running {
            self.cancelled = true;
        }
        self.running = false;
    }

    fn close(&mut self) {
        self.journal.record(DeviceCall::Close);
        self.running = false;
    }
}

/// Backend exposing at most one simulated scanner.
#[derive(Debug)]
pub struct SimulatedBackend {
    devices: Vec<DeviceInfo>,
    scanner: Option<SimulatedScanner>,
    reject_open: Option<StatusCode>,
    fail_enumerate: Option<StatusCode>,
    journal: Journal,
}

impl SimulatedBackend {
    /// Backend with no attached devices.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
            scanner: None,
            reject_open: None,
            fail_enumerate: None,
            journal: Journal::default(),
        }
    }

    /// Backend with `scanner` attached. Shares the scanner's journal.
    #[must_use]
    pub fn with_device(scanner: SimulatedScanner) -> Self {
        Self {
            devices: vec![scanner.info().clone()],
            journal: scanner.journal(),
            scanner: Some(scanner),
            reject_open: None,
            fail_enumerate: None,
        }
    }

    /// Reject open requests with `status`.
    #[must_use]
    pub fn reject_open(mut self, status: StatusCode) -> Self {
        self.reject_open = Some(status);
        self
    }

    /// Fail enumeration with `status`.
    #[must_use]
    pub fn fail_enumerate(mut self, status: StatusCode) -> Self {
        self.fail_enumerate = Some(status);
        self
    }

    /// Journal shared with the attached scanner.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl DeviceBackend for SimulatedBackend {
    type Handle = SimulatedScanner;

    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, StatusCode> {
        self.journal.record(DeviceCall::Enumerate);
        match self.fail_enumerate {
            Some(status) => Err(status),
            None => Ok(self.devices.clone()),
        }
    }

    fn open(&mut self, name: &str) -> Result<Self::Handle, StatusCode> {
        self.journal.record(DeviceCall::Open(name.to_owned()));
        if let Some(status) = self.reject_open {
            return Err(status);
        }
        if !self.devices.iter().any(|device| device.name == name) {
            return Err(StatusCode::Invalid);
        }
        self.scanner.take().ok_or(StatusCode::DeviceBusy)
    }

    fn exit(&mut self) {
        self.journal.record(DeviceCall::Exit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_line(scanner: &mut SimulatedScanner) -> Vec<u8> {
        let mut line = Vec::new();
        let mut buf = vec![0u8; scanner.params.bytes_per_line as usize];
        while line.len() < buf.len() {
            let (count, status) = scanner.read(&mut buf);
            assert_eq!(status, ScanStatus::Good);
            line.extend_from_slice(&buf[..count]);
        }
        line
    }

    #[test]
    fn test_backend_enumerates_attached_scanner() {
        let mut backend = SimulatedBackend::with_device(SimulatedScanner::new(4, 2));
        let devices = backend.enumerate().expect("enumerate should succeed");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "pie:sim");
        assert!(backend.open("pie:sim").is_ok());
        assert_eq!(backend.open("pie:sim").err(), Some(StatusCode::DeviceBusy));
    }

    #[test]
    fn test_gradient_pattern() {
        let scanner = SimulatedScanner::new(5, 1);
        assert_eq!(scanner.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(scanner.pixel(4, 0), [65535, 32767, 16383, 8191]);
        assert!(scanner.pixel(2, 0)[0] > scanner.pixel(1, 0)[0]);
    }

    #[test]
    fn test_single_pixel_gradient_does_not_divide_by_zero() {
        let scanner = SimulatedScanner::new(1, 1);
        assert_eq!(scanner.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_line_is_native_endian_rgbi() {
        let mut scanner =
            SimulatedScanner::new(2, 1).with_pattern(TestPattern::Solid([1, 2, 3, 0x0104]));
        assert_eq!(scanner.start(), ScanStatus::Good);
        let line = read_line(&mut scanner);
        assert_eq!(line.len(), 16);
        assert_eq!(&line[..2], &1u16.to_ne_bytes());
        assert_eq!(&line[6..8], &0x0104u16.to_ne_bytes());
        assert_eq!(&line[8..10], &1u16.to_ne_bytes());
    }

    #[test]
    fn test_end_of_data_after_declared_lines() {
        let mut scanner = SimulatedScanner::new(2, 2);
        assert_eq!(scanner.start(), ScanStatus::Good);
        read_line(&mut scanner);
        read_line(&mut scanner);
        let mut buf = [0u8; 16];
        assert_eq!(scanner.read(&mut buf), (0, ScanStatus::EndOfData));
    }

    #[test]
    fn test_chunked_reads() {
        let mut scanner = SimulatedScanner::new(2, 1).with_chunk_size(5);
        assert_eq!(scanner.start(), ScanStatus::Good);
        let mut buf = [0u8; 16];
        assert_eq!(scanner.read(&mut buf), (5, ScanStatus::Good));
        assert_eq!(scanner.read(&mut buf), (5, ScanStatus::Good));
        assert_eq!(scanner.read(&mut buf), (5, ScanStatus::Good));
        assert_eq!(scanner.read(&mut buf), (1, ScanStatus::Good));
        assert_eq!(scanner.read(&mut buf), (0, ScanStatus::EndOfData));
    }

    #[test]
    fn test_warmup_cycles() {
        let mut scanner = SimulatedScanner::new(2, 1).with_warmup_cycles(2);
        assert_eq!(scanner.start(), ScanStatus::WarmingUp);
        assert_eq!(scanner.start(), ScanStatus::WarmingUp);
        assert_eq!(scanner.start(), ScanStatus::Good);
    }

    #[test]
    fn test_read_after_cancel_reports_cancelled() {
        let mut scanner = SimulatedScanner::new(2, 1);
        assert_eq!(scanner.start(), ScanStatus::Good);
        scanner.cancel();
        let mut buf = [0u8; 16];
        assert_eq!(
            scanner.read(&mut buf),
            (0, ScanStatus::Error(StatusCode::Cancelled))
        );
    }

    #[test]
    fn test_gain_is_clamped() {
        let mut scanner = SimulatedScanner::new(2, 1);
        let applied = scanner
            .set_option(OptionId(36), &OptionValue::Int(100))
            .expect("set should succeed");
        assert_eq!(applied, OptionValue::Int(MAX_GAIN));
    }

    #[test]
    fn test_set_option_kind_mismatch() {
        let mut scanner = SimulatedScanner::new(2, 1);
        assert_eq!(
            scanner.set_option(OptionId(30), &OptionValue::Bool(true)),
            Err(StatusCode::Invalid)
        );
        assert_eq!(
            scanner.set_option(OptionId(5), &OptionValue::Int(1)),
            Err(StatusCode::Unsupported)
        );
    }

    #[test]
    fn test_cancel_trigger_raises_flag() {
        let flag = CancelFlag::new();
        let mut scanner = SimulatedScanner::new(2, 3).cancel_after(2, flag.clone());
        assert_eq!(scanner.start(), ScanStatus::Good);
        read_line(&mut scanner);
        assert!(!flag.is_requested());
        read_line(&mut scanner);
        assert!(flag.is_requested());
    }
}
