//! Scan settings applied to the device before every scan.

use serde::{Deserialize, Serialize};

/// One integer value per capture channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerChannel {
    /// Red channel.
    pub r: i32,
    /// Green channel.
    pub g: i32,
    /// Blue channel.
    pub b: i32,
    /// Infrared channel.
    pub i: i32,
}

impl PerChannel {
    /// Same value on all four channels.
    #[must_use]
    pub const fn uniform(value: i32) -> Self {
        Self {
            r: value,
            g: value,
            b: value,
            i: value,
        }
    }
}

/// Scan area in device units (millimetres on the supported scanners).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropRect {
    /// Top-left x.
    pub tl_x: f64,
    /// Top-left y.
    pub tl_y: f64,
    /// Bottom-right x.
    pub br_x: f64,
    /// Bottom-right y.
    pub br_y: f64,
}

/// Flat record of every option the pipeline sets on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScanSettings {
    /// Colour mode (`RGBI`, `RGB`, `Gray`, ...).
    pub mode: String,
    /// Calibration strategy.
    pub calibration: String,
    /// Gain adjustment expression.
    pub gain_adjust: String,
    /// Crop mode.
    pub crop: String,

    /// Resolution in dpi.
    pub resolution: i32,
    /// Threshold in percent.
    pub threshold: i32,
    /// Scan area. `None` keeps the area the device reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<CropRect>,

    /// Sharpen the image.
    pub sharpen: bool,
    /// Run shading analysis.
    pub shading_analysis: bool,
    /// Fast infrared scan.
    pub fast_infrared: bool,
    /// Advance the film holder after the scan.
    pub auto_advance: bool,
    /// Apply shading correction.
    pub correct_shading: bool,
    /// Apply infrared correction.
    pub correct_infrared: bool,
    /// Apply dust and scratch cleaning.
    pub clean_image: bool,
    /// Preview scan.
    pub preview: bool,
    /// Save shading data.
    pub save_shading: bool,
    /// Save the CCD mask.
    pub save_ccdmask: bool,

    /// Bits per sample.
    pub depth: i32,
    /// Smoothing level.
    pub smooth: i32,
    /// Light source index.
    pub light: i32,
    /// Number of exposures per line.
    pub double_times: i32,
    /// Exposure time per channel.
    pub exposure: PerChannel,
    /// Analog gain per channel.
    pub gain: PerChannel,
    /// Analog offset per channel.
    pub offset: PerChannel,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            mode: "RGBI".to_owned(),
            calibration: "from options".to_owned(),
            gain_adjust: "* 1.0".to_owned(),
            crop: "None".to_owned(),

            resolution: 300,
            threshold: 50,
            area: None,

            sharpen: false,
            shading_analysis: false,
            fast_infrared: false,
            auto_advance: false,
            correct_shading: false,
            correct_infrared: false,
            clean_image: false,
            preview: false,
            save_shading: false,
            save_ccdmask: false,

            depth: 16,
            smooth: 0,
            light: 4,
            double_times: 0,
            exposure: PerChannel::uniform(2937),
            gain: PerChannel::uniform(19),
            offset: PerChannel::uniform(0),
        }
    }
}

impl ScanSettings {
    /// Set the scan area.
    #[must_use]
    pub fn with_area(mut self, area: CropRect) -> Self {
        self.area = Some(area);
        self
    }

    /// Set the resolution in dpi.
    #[must_use]
    pub fn with_resolution(mut self, resolution: i32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the light source index.
    #[must_use]
    pub fn with_light(mut self, light: i32) -> Self {
        self.light = light;
        self
    }

    /// Set the exposure time per channel.
    #[must_use]
    pub fn with_exposure(mut self, exposure: PerChannel) -> Self {
        self.exposure = exposure;
        self
    }

    /// Set the analog gain per channel.
    #[must_use]
    pub fn with_gain(mut self, gain: PerChannel) -> Self {
        self.gain = gain;
        self
    }
}
