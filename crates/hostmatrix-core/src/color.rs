//! Weighted success/failure color coding.

use serde::{Deserialize, Serialize};

/// Color reported when a host has neither passes nor failures.
pub const NEUTRAL_COLOR: &str = "black";

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// `limegreen`.
    pub const GOOD: Self = Self(0x32, 0xcd, 0x32);
    /// `tomato`.
    pub const BAD: Self = Self(0xff, 0x63, 0x47);

    /// `#rrggbb`, lowercase and zero padded.
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Linear interpolation between a good and a bad color, with failures
/// weighted more heavily than successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScale {
    pub good: Rgb,
    pub bad: Rgb,
    pub failure_weight: u32,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            good: Rgb::GOOD,
            bad: Rgb::BAD,
            failure_weight: 5,
        }
    }
}

impl ColorScale {
    /// Share of the good color, `success / (success + weight * failure)`.
    #[must_use]
    pub fn weight(&self, success: usize, failure: usize) -> Option<f64> {
        let denominator = success as f64 + f64::from(self.failure_weight) * failure as f64;
        if denominator <= 0.0 {
            return None;
        }
        Some(success as f64 / denominator)
    }

    /// Host color for the given counts, or [`NEUTRAL_COLOR`] when both are
    /// zero. Each channel is rounded to the nearest integer.
    #[must_use]
    pub fn color(&self, success: usize, failure: usize) -> String {
        let Some(w) = self.weight(success, failure) else {
            return NEUTRAL_COLOR.to_owned();
        };
        let mix = |good: u8, bad: u8| -> u8 {
            let value = f64::from(good).mul_add(w, f64::from(bad) * (1.0 - w));
            value.round().clamp(0.0, 255.0) as u8
        };
        Rgb(
            mix(self.good.0, self.bad.0),
            mix(self.good.1, self.bad.1),
            mix(self.good.2, self.bad.2),
        )
        .hex()
    }
}

/// Host color on the default scale.
#[must_use]
pub fn success_color(success: usize, failure: usize) -> String {
    ColorScale::default().color(success, failure)
}
