//! Declarative table mapping scan settings to device options.
//!
//! The table is applied in order by [`apply`]. Option ids and names follow the
//! PIE/Reflecta film scanner backend.

use log::debug;

use crate::error::{Result, ScanError};
use crate::settings::{CropRect, ScanSettings};
use crate::traits::{DeviceControl, Fixed, OptionId, OptionKind, OptionValue, StatusCode};

/// One row of the option table.
#[derive(Clone, Copy)]
pub struct OptionEntry {
    /// Device option id.
    pub id: OptionId,
    /// Option name as advertised by the device.
    pub name: &'static str,
    /// Value type.
    pub kind: OptionKind,
    /// Extracts the value to apply from the settings.
    pub value: fn(&ScanSettings) -> OptionValue,
}

impl std::fmt::Debug for OptionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Option id of the top-left x corner of the scan area.
pub const TL_X: OptionId = OptionId(13);
/// Option id of the top-left y corner of the scan area.
pub const TL_Y: OptionId = OptionId(14);
/// Option id of the bottom-right x corner of the scan area.
pub const BR_X: OptionId = OptionId(15);
/// Option id of the bottom-right y corner of the scan area.
pub const BR_Y: OptionId = OptionId(16);

const fn entry(
    id: u32,
    name: &'static str,
    kind: OptionKind,
    value: fn(&ScanSettings) -> OptionValue,
) -> OptionEntry {
    OptionEntry {
        id: OptionId(id),
        name,
        kind,
        value,
    }
}

/// Every option applied before a scan, in application order.
pub const SCAN_OPTIONS: &[OptionEntry] = &[
    entry(2, "mode", OptionKind::String, |s| OptionValue::String(s.mode.clone())),
    entry(3, "depth", OptionKind::Int, |s| OptionValue::Int(s.depth)),
    entry(4, "resolution", OptionKind::Fixed, |s| {
        OptionValue::Fixed(Fixed::from_int(s.resolution))
    }),
    entry(6, "threshold", OptionKind::Fixed, |s| {
        OptionValue::Fixed(Fixed::from_int(s.threshold))
    }),
    entry(7, "sharpen", OptionKind::Bool, |s| OptionValue::Bool(s.sharpen)),
    entry(8, "shading-analysis", OptionKind::Bool, |s| {
        OptionValue::Bool(s.shading_analysis)
    }),
    entry(9, "fast-infrared", OptionKind::Bool, |s| {
        OptionValue::Bool(s.fast_infrared)
    }),
    entry(10, "advance", OptionKind::Bool, |s| OptionValue::Bool(s.auto_advance)),
    entry(11, "calibration", OptionKind::String, |s| {
        OptionValue::String(s.calibration.clone())
    }),
    entry(TL_X.0, "tl-x", OptionKind::Fixed, |s| {
        OptionValue::Fixed(Fixed::from_f64(s.area.unwrap_or_default().tl_x))
    }),
    entry(TL_Y.0, "tl-y", OptionKind::Fixed, |s| {
        OptionValue::Fixed(Fixed::from_f64(s.area.unwrap_or_default().tl_y))
    }),
    entry(BR_X.0, "br-x", OptionKind::Fixed, |s| {
        OptionValue::Fixed(Fixed::from_f64(s.area.unwrap_or_default().br_x))
    }),
    entry(BR_Y.0, "br-y", OptionKind::Fixed, |s| {
        OptionValue::Fixed(Fixed::from_f64(s.area.unwrap_or_default().br_y))
    }),
    entry(18, "correct-shading", OptionKind::Bool, |s| {
        OptionValue::Bool(s.correct_shading)
    }),
    entry(19, "correct-infrared", OptionKind::Bool, |s| {
        OptionValue::Bool(s.correct_infrared)
    }),
    entry(20, "clean-image", OptionKind::Bool, |s| {
        OptionValue::Bool(s.clean_image)
    }),
    entry(21, "gain-adjust", OptionKind::String, |s| {
        OptionValue::String(s.gain_adjust.clone())
    }),
    entry(22, "crop", OptionKind::String, |s| OptionValue::String(s.crop.clone())),
    entry(23, "smooth", OptionKind::Int, |s| OptionValue::Int(s.smooth)),
    entry(27, "preview", OptionKind::Bool, |s| OptionValue::Bool(s.preview)),
    entry(28, "save-shading-data", OptionKind::Bool, |s| {
        OptionValue::Bool(s.save_shading)
    }),
    entry(29, "save-ccdmask", OptionKind::Bool, |s| {
        OptionValue::Bool(s.save_ccdmask)
    }),
    entry(30, "light", OptionKind::Int, |s| OptionValue::Int(s.light)),
    entry(31, "double-times", OptionKind::Int, |s| {
        OptionValue::Int(s.double_times)
    }),
    entry(32, "exposure-time-r", OptionKind::Int, |s| {
        OptionValue::Int(s.exposure.r)
    }),
    entry(33, "exposure-time-g", OptionKind::Int, |s| {
        OptionValue::Int(s.exposure.g)
    }),
    entry(34, "exposure-time-b", OptionKind::Int, |s| {
        OptionValue::Int(s.exposure.b)
    }),
    entry(35, "exposure-time-i", OptionKind::Int, |s| {
        OptionValue::Int(s.exposure.i)
    }),
    entry(36, "gain-r", OptionKind::Int, |s| OptionValue::Int(s.gain.r)),
    entry(37, "gain-g", OptionKind::Int, |s| OptionValue::Int(s.gain.g)),
    entry(38, "gain-b", OptionKind::Int, |s| OptionValue::Int(s.gain.b)),
    entry(39, "gain-i", OptionKind::Int, |s| OptionValue::Int(s.gain.i)),
    entry(40, "offset-r", OptionKind::Int, |s| OptionValue::Int(s.offset.r)),
    entry(41, "offset-g", OptionKind::Int, |s| OptionValue::Int(s.offset.g)),
    entry(42, "offset-b", OptionKind::Int, |s| OptionValue::Int(s.offset.b)),
    entry(43, "offset-i", OptionKind::Int, |s| OptionValue::Int(s.offset.i)),
];

/// Look up a table row by option id.
#[must_use]
pub fn find(id: OptionId) -> Option<&'static OptionEntry> {
    SCAN_OPTIONS.iter().find(|entry| entry.id == id)
}

/// Apply every option of `settings` to the device, in table order.
///
/// Stops at the first failing option. Options before it stay applied; the
/// device protocol has no rollback. An unset area is written as zeros, so
/// callers resolve it with [`read_area`] first.
pub fn apply<D: DeviceControl>(device: &mut D, settings: &ScanSettings) -> Result<()> {
    for entry in SCAN_OPTIONS {
        let requested = (entry.value)(settings);
        let applied =
            device
                .set_option(entry.id, &requested)
                .map_err(|status| ScanError::Configuration {
                    option: entry.id,
                    name: entry.name,
                    status,
                })?;

        if applied != requested {
            debug!(
                "Option {} ({}) adjusted by device: requested {requested}, applied {applied}",
                entry.id, entry.name
            );
        }
    }
    Ok(())
}

/// Scan area the device currently reports through options 13 to 16.
pub fn read_area<D: DeviceControl>(device: &mut D) -> Result<CropRect> {
    let mut corner = |id: OptionId| -> Result<f64> {
        let error = |status: StatusCode| ScanError::Configuration {
            option: id,
            name: find(id).map_or("scan area", |entry| entry.name),
            status,
        };
        let value = device.get_option(id).map_err(error)?;
        value
            .as_fixed()
            .map(Fixed::to_f64)
            .ok_or_else(|| error(StatusCode::Invalid))
    };

    Ok(CropRect {
        tl_x: corner(TL_X)?,
        tl_y: corner(TL_Y)?,
        br_x: corner(BR_X)?,
        br_y: corner(BR_Y)?,
    })
}

/// Current value of one option, labelled with the device's option name.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionReading {
    /// Option id.
    pub id: OptionId,
    /// Name from the device descriptor, or the table name if none.
    pub name: String,
    /// Current value.
    pub value: OptionValue,
}

/// Read back every table option from the device.
pub fn read_back<D: DeviceControl>(device: &mut D) -> Result<Vec<OptionReading>> {
    SCAN_OPTIONS
        .iter()
        .map(|entry| {
            let value = device
                .get_option(entry.id)
                .map_err(|status| ScanError::Configuration {
                    option: entry.id,
                    name: entry.name,
                    status,
                })?;
            let name = device
                .descriptor(entry.id)
                .map_or_else(|| entry.name.to_owned(), |desc| desc.name);
            Ok(OptionReading {
                id: entry.id,
                name,
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PerChannel;
    use crate::sim::SimulatedScanner;
    use std::collections::HashSet;

    #[test]
    fn test_table_ids_are_unique_and_ordered() {
        let ids: Vec<u32> = SCAN_OPTIONS.iter().map(|entry| entry.id.0).collect();
        let unique: HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_table_covers_all_settings() {
        // 4 strings + 6 fixed + 10 bools + 4 ints + 12 per-channel ints
        assert_eq!(SCAN_OPTIONS.len(), 36);
        let count = |kind| SCAN_OPTIONS.iter().filter(|s| s.kind == kind).count();
        assert_eq!(count(OptionKind::String), 4);
        assert_eq!(count(OptionKind::Fixed), 6);
        assert_eq!(count(OptionKind::Bool), 10);
        assert_eq!(count(OptionKind::Int), 16);
    }

    #[test]
    fn test_accessor_kinds_match_table() {
        let settings = ScanSettings::default();
        for entry in SCAN_OPTIONS {
            assert_eq!((entry.value)(&settings).kind(), entry.kind, "{}", entry.name);
        }
    }

    #[test]
    fn test_accessors_read_the_right_fields() {
        let settings = ScanSettings {
            area: Some(CropRect {
                tl_x: 1.5,
                tl_y: 2.0,
                br_x: 36.0,
                br_y: 24.25,
            }),
            offset: PerChannel {
                r: 1,
                g: 2,
                b: 3,
                i: 4,
            },
            ..ScanSettings::default()
        };

        let value_of = |id| find(OptionId(id)).map(|entry| (entry.value)(&settings));

        assert_eq!(
            value_of(4),
            Some(OptionValue::Fixed(Fixed::from_int(300)))
        );
        assert_eq!(
            value_of(16),
            Some(OptionValue::Fixed(Fixed::from_f64(24.25)))
        );
        assert_eq!(value_of(30), Some(OptionValue::Int(4)));
        assert_eq!(value_of(42), Some(OptionValue::Int(3)));
        assert_eq!(value_of(43), Some(OptionValue::Int(4)));
        assert_eq!(value_of(5), None);
    }

    #[test]
    fn test_read_area_from_device() {
        let mut scanner = SimulatedScanner::new(4, 2)
            .with_option(TL_Y, OptionValue::Fixed(Fixed::from_f64(1.5)));
        let area = read_area(&mut scanner).expect("area should read");
        assert!((area.tl_y - 1.5).abs() < 1e-9);
        assert!((area.br_x - 36.0).abs() < 1e-9);
        assert!((area.br_y - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_read_area_rejects_non_fixed_corner() {
        let mut scanner = SimulatedScanner::new(4, 2).with_option(BR_X, OptionValue::Int(36));
        let err = read_area(&mut scanner).expect_err("int corner should be rejected");
        assert!(matches!(
            err,
            ScanError::Configuration {
                option: BR_X,
                name: "br-x",
                status: StatusCode::Invalid
            }
        ));
    }
}
