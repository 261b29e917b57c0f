//! Conversions from everyday color descriptions to the bridge's light-state fields.
//!
//! The bridge takes color temperature in mireds (`ct`) and color as CIE 1931 xy
//! chromaticity (`xy`) plus a separate brightness (`bri`, 0..=254).

use serde_json::{json, Value};
use thiserror::Error;

/// D65 white point chromaticity, used when the input carries no light at all.
pub const D65_WHITE_XY: (f64, f64) = (0.3127, 0.3290);

/// Linear sRGB to XYZ, derived from the IEC 61966-2-1 primaries and the D65 white point.
const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412_390_80, 0.357_584_34, 0.180_480_79],
    [0.212_639_01, 0.715_168_68, 0.072_192_32],
    [0.019_330_82, 0.119_194_78, 0.950_532_15],
];

const MAX_BRIGHTNESS: f64 = 254.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColorError {
    #[error("color temperature must be a positive number of kelvins, got {0}")]
    NonPositiveTemperature(f64),

    #[error("RGB components must be within [0, 1], got {0}")]
    ComponentOutOfRange(f64),
}

/// Converts a color temperature in kelvins to mireds.
pub fn mired_from_kelvin(kelvin: f64) -> Result<u64, ColorError> {
    if !kelvin.is_finite() || kelvin <= 0.0 {
        return Err(ColorError::NonPositiveTemperature(kelvin));
    }
    Ok((1_000_000.0 / kelvin).round() as u64)
}

/// A color expressed as the bridge wants it: chromaticity plus brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XyBrightness {
    pub x: f64,
    pub y: f64,
    pub brightness: u8,
}

impl XyBrightness {
    /// The light-state fragment for this color, e.g. `{"xy": [0.64, 0.33], "bri": 138}`.
    pub fn to_light_state(&self) -> Value {
        json!({ "xy": [self.x, self.y], "bri": self.brightness })
    }
}

/// Converts gamma-encoded sRGB components in `[0, 1]` to xy chromaticity and brightness.
pub fn xy_brightness_from_rgb(r: f64, g: f64, b: f64) -> Result<XyBrightness, ColorError> {
    let rgb = [r, g, b];
    if let Some(bad) = rgb
        .iter()
        .copied()
        .find(|c| !c.is_finite() || !(0.0..=1.0).contains(c))
    {
        return Err(ColorError::ComponentOutOfRange(bad));
    }

    let linear = rgb.map(srgb_decode);
    let [big_x, big_y, big_z] =
        SRGB_TO_XYZ.map(|row| row[0] * linear[0] + row[1] * linear[1] + row[2] * linear[2]);

    let sum = big_x + big_y + big_z;
    let (x, y) = if sum == 0.0 {
        D65_WHITE_XY
    } else {
        (big_x / sum, big_y / sum)
    };

    let brightness = (big_y.powf(1.0 / 2.2) * MAX_BRIGHTNESS)
        .round()
        .clamp(0.0, MAX_BRIGHTNESS) as u8;

    Ok(XyBrightness { x, y, brightness })
}

/// The sRGB electro-optical transfer function (gamma decode).
fn srgb_decode(c: f64) -> f64 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
