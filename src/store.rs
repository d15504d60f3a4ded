//! Raw sample archive backed by memory-mapped files.
//!
//! Files hold bare host-order `u16` samples with no header. The image
//! geometry lives in the file name (see [`crate::export`]).
//!
//! Mapping a zero-length file fails on some platforms, so empty arrays are
//! handled without a map.
#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};

use crate::error::{Result, ScanError};

/// Writable array file of a fixed byte size.
#[derive(Debug)]
pub struct MmapArrayWriter {
    path: PathBuf,
    map: Option<MmapMut>,
}

impl MmapArrayWriter {
    /// Create (or truncate) `path`, size it to exactly `size` bytes and map it.
    pub fn create<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| ScanError::storage(&path, e))?;
        file.set_len(size as u64)
            .map_err(|e| ScanError::storage(&path, e))?;

        let map = if size == 0 {
            None
        } else {
            // SAFETY: the file was just created and sized by us; nothing else
            // truncates it while the map is alive.
            let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| ScanError::storage(&path, e))?;
            Some(map)
        };

        Ok(Self { path, map })
    }

    /// Mapped bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.map.as_deref_mut().unwrap_or_default()
    }

    /// Write dirty pages back to the file.
    pub fn flush(&self) -> Result<()> {
        if let Some(map) = &self.map {
            map.flush().map_err(|e| ScanError::storage(&self.path, e))?;
        }
        Ok(())
    }

    /// File path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read-only view of an array file.
#[derive(Debug)]
pub struct MmapArrayReader {
    path: PathBuf,
    map: Option<Mmap>,
}

impl MmapArrayReader {
    /// Map `path` read-only at its current length.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| ScanError::storage(&path, e))?;
        let len = file
            .metadata()
            .map_err(|e| ScanError::storage(&path, e))?
            .len();

        let map = if len == 0 {
            None
        } else {
            // SAFETY: archive files are written once and not modified while read.
            let map = unsafe { Mmap::map(&file) }.map_err(|e| ScanError::storage(&path, e))?;
            #[cfg(unix)]
            if let Err(e) = map.advise(memmap2::Advice::Sequential) {
                log::debug!("madvise failed for {}: {e}", path.display());
            }
            Some(map)
        };

        Ok(Self { path, map })
    }

    /// Mapped bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.map.as_deref().unwrap_or_default()
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True for an empty file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// File path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Store `samples` in `path` as raw host-order bytes.
pub fn write_samples<P: AsRef<Path>>(path: P, samples: &[u16]) -> Result<()> {
    let mut writer = MmapArrayWriter::create(path, std::mem::size_of_val(samples))?;
    for (dst, sample) in writer.as_mut_slice().chunks_exact_mut(2).zip(samples) {
        dst.copy_from_slice(&sample.to_ne_bytes());
    }
    writer.flush()
}

/// Load the samples stored by [`write_samples`].
pub fn read_samples<P: AsRef<Path>>(path: P) -> Result<Vec<u16>> {
    let reader = MmapArrayReader::open(path)?;
    let bytes = reader.as_slice();
    if bytes.len() % 2 != 0 {
        return Err(ScanError::storage(
            reader.path(),
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("odd length {} for a u16 array", bytes.len()),
            ),
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect())
}
