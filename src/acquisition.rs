//! Streaming acquisition: reads scan lines from the device and demultiplexes
//! the interleaved RGBI samples into an [`ImageBuffer`].
//!
//! Samples arrive as 16-bit values in host byte order, four per pixel in
//! R, G, B, IR order. A line may be split over several reads; reads may also
//! return zero bytes without the scan being over. Only end-of-data ends a
//! scan normally.
//!
//! Lines beyond the declared height are discarded and counted. If the device
//! stops early, the remaining rows stay zero and the report shows fewer
//! captured lines than the image height.

use log::{debug, info, trace, warn};

use crate::buffer::ImageBuffer;
use crate::error::{AcquisitionPhase, Result, ScanError};
use crate::session::DeviceSession;
use crate::settings::ScanSettings;
use crate::signal::CancelFlag;
use crate::traits::{DeviceBackend, ScanParameters, ScanStatus, StatusCode};

/// Bytes of one interleaved RGBI pixel.
const BYTES_PER_PIXEL: usize = ScanParameters::CHANNELS as usize * 2;

/// Outcome of one acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionReport {
    /// Lines written into the image.
    pub lines_captured: u32,
    /// Lines delivered past the declared height and dropped.
    pub lines_discarded: u32,
    /// Total bytes received.
    pub bytes_read: u64,
    /// Reads that returned no data.
    pub empty_reads: u64,
    /// Whether the scan was stopped by a cancel request.
    pub cancelled: bool,
}

impl AcquisitionReport {
    /// True when every declared line was captured and the scan was not cancelled.
    #[must_use]
    pub const fn is_complete(&self, image: &ImageBuffer) -> bool {
        !self.cancelled && self.lines_captured == image.height()
    }
}

/// Write one raw line into row `row` of `image`.
///
/// Returns `false` and writes nothing if `row` is past the image height.
/// Bytes beyond `width` pixels (line padding) are ignored.
pub fn demultiplex_line(image: &mut ImageBuffer, row: u32, line: &[u8]) -> bool {
    if row >= image.height() {
        return false;
    }
    let width = image.width() as usize;
    let offset = row as usize * width;

    for (i, pixel) in line.chunks_exact(BYTES_PER_PIXEL).take(width).enumerate() {
        let mut rgbi = [0u16; 4];
        for (sample, bytes) in rgbi.iter_mut().zip(pixel.chunks_exact(2)) {
            *sample = u16::from_ne_bytes([bytes[0], bytes[1]]);
        }
        image.set_pixel(offset + i, rgbi);
    }
    true
}

/// Reassembles device chunks into full lines.
struct LineAssembler {
    line: Vec<u8>,
    filled: usize,
}

impl LineAssembler {
    fn new(bytes_per_line: usize) -> Self {
        Self {
            line: vec![0; bytes_per_line],
            filled: 0,
        }
    }

    /// Feed bytes, calling `on_line` for every completed line.
    fn push<F: FnMut(&[u8])>(&mut self, mut data: &[u8], mut on_line: F) {
        while !data.is_empty() {
            let take = (self.line.len() - self.filled).min(data.len());
            let (head, rest) = data.split_at(take);
            if let Some(dst) = self.line.get_mut(self.filled..self.filled + take) {
                dst.copy_from_slice(head);
            }
            self.filled += take;
            data = rest;

            if self.filled == self.line.len() {
                on_line(&self.line);
                self.filled = 0;
            }
        }
    }

    const fn pending(&self) -> usize {
        self.filled
    }
}

/// Stream the running scan into `image`.
///
/// The session must be acquiring (after a successful `start`). The image is
/// resized to the reported geometry before the first read. `cancel` is
/// checked before every read; when it is raised the device is cancelled and
/// the partial image is kept.
///
/// On a device error the scan is cancelled and the session closed before the
/// error is returned.
pub fn acquire<B: DeviceBackend>(
    session: &mut DeviceSession<B>,
    image: &mut ImageBuffer,
    cancel: &CancelFlag,
) -> Result<AcquisitionReport> {
    let params = session.parameters()?;
    if let Err(err) = validate_parameters(&params) {
        return Err(session.abort_scan(err));
    }
    info!(
        "Acquiring {}x{} ({} bytes per line)",
        params.pixels_per_line, params.lines, params.bytes_per_line
    );

    image.resize(params.pixels_per_line, params.lines);
    let mut chunk = vec![0u8; params.bytes_per_line as usize];
    let mut assembler = LineAssembler::new(params.bytes_per_line as usize);
    let mut report = AcquisitionReport::default();
    let mut row = 0u32;

    loop {
        if cancel.is_requested() {
            session.cancel()?;
            report.cancelled = true;
            info!(
                "Scan cancelled after {} of {} lines",
                report.lines_captured, params.lines
            );
            break;
        }

        let (count, status) = session.read(&mut chunk)?;
        match status {
            ScanStatus::EndOfData => {
                if assembler.pending() > 0 {
                    warn!(
                        "Dropping incomplete trailing line ({} of {} bytes)",
                        assembler.pending(),
                        params.bytes_per_line
                    );
                }
                session.finish()?;
                break;
            }
            ScanStatus::Error(status) => {
                return Err(session.abort_scan(ScanError::Acquisition {
                    phase: AcquisitionPhase::Read,
                    status,
                }));
            }
            ScanStatus::WarmingUp => {
                debug!("Device reported warm-up during read, retrying");
                report.empty_reads += 1;
            }
            ScanStatus::Good if count == 0 => {
                report.empty_reads += 1;
            }
            ScanStatus::Good => {
                let Some(data) = chunk.get(..count) else {
                    warn!(
                        "Device reported {count} bytes for a {} byte buffer",
                        chunk.len()
                    );
                    return Err(session.abort_scan(ScanError::Acquisition {
                        phase: AcquisitionPhase::Read,
                        status: StatusCode::Invalid,
                    }));
                };
                report.bytes_read += data.len() as u64;
                assembler.push(data, |line| {
                    if demultiplex_line(image, row, line) {
                        report.lines_captured += 1;
                        trace!("Line {} of {}", row + 1, params.lines);
                    } else {
                        if report.lines_discarded == 0 {
                            warn!(
                                "Device delivered more than the declared {} lines, discarding",
                                params.lines
                            );
                        }
                        report.lines_discarded += 1;
                    }
                    row = row.saturating_add(1);
                });
            }
        }
    }

    if !report.cancelled && report.lines_captured < params.lines {
        warn!(
            "Device delivered {} of {} declared lines",
            report.lines_captured, params.lines
        );
    }
    if report.lines_discarded > 0 {
        warn!("Discarded {} lines past the image height", report.lines_discarded);
    }
    Ok(report)
}

fn validate_parameters(params: &ScanParameters) -> Result<()> {
    let needed = params.pixels_per_line as usize * BYTES_PER_PIXEL;
    if params.depth != 16 || params.bytes_per_line == 0 || (params.bytes_per_line as usize) < needed {
        warn!(
            "Unsupported scan parameters: depth {}, {} pixels, {} bytes per line",
            params.depth, params.pixels_per_line, params.bytes_per_line
        );
        return Err(ScanError::Acquisition {
            phase: AcquisitionPhase::Parameters,
            status: StatusCode::Invalid,
        });
    }
    Ok(())
}

/// Configure the device, log its options, start and acquire one image.
pub fn scan_image<B: DeviceBackend>(
    session: &mut DeviceSession<B>,
    settings: &ScanSettings,
    image: &mut ImageBuffer,
    cancel: &CancelFlag,
) -> Result<AcquisitionReport> {
    session.configure(settings)?;

    let readings = session.option_report()?;
    info!("Scanning image with settings:");
    for reading in &readings {
        info!("\t{:<20}: {}", reading.name, reading.value);
    }

    session.start()?;
    acquire(session, image, cancel)
}
