//! Temperature color banding.
//!
//! Thresholds are proportional splits of the observed range: two thirds
//! and one third of the maximum on the hot side, one third and two
//! thirds of the minimum on the cold side.

use serde::{Deserialize, Serialize};

use heatflow_grid::Grid;
use heatflow_types::constants::NEUTRAL_EPSILON;
use heatflow_types::Scalar;

/// Display band of a temperature, hottest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    VeryHot,
    Hot,
    Warm,
    Neutral,
    Chilly,
    Cold,
    VeryCold,
}

impl Band {
    /// All bands, hottest first.
    pub const ALL: [Band; 7] = [
        Band::VeryHot,
        Band::Hot,
        Band::Warm,
        Band::Neutral,
        Band::Chilly,
        Band::Cold,
        Band::VeryCold,
    ];
}

/// Band thresholds derived once from a set of temperatures.
///
/// Values outside the range seen at construction fall into the extreme
/// bands; the thresholds are never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBanding {
    min: Scalar,
    max: Scalar,
    orange_th: Scalar,
    yellow_th: Scalar,
    cyan_th: Scalar,
    blue_th: Scalar,
}

impl ColorBanding {
    /// Scans `values` once for min and max. An empty slice yields a
    /// zero range.
    pub fn from_values(values: &[Scalar]) -> Self {
        let range = values.iter().fold(None, |acc: Option<(Scalar, Scalar)>, &t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        });
        let (min, max) = range.unwrap_or((0.0, 0.0));
        Self::from_range(min, max)
    }

    /// Bands for the grid's `current` temperatures.
    pub fn from_grid(grid: &Grid) -> Self {
        let (min, max) = grid.temperature_range();
        Self::from_range(min, max)
    }

    pub fn from_range(min: Scalar, max: Scalar) -> Self {
        Self {
            min,
            max,
            orange_th: max * 2.0 / 3.0,
            yellow_th: max / 3.0,
            cyan_th: min / 3.0,
            blue_th: min * 2.0 / 3.0,
        }
    }

    /// Band of `value`. First match wins:
    /// near zero, then the hot side, then the cold side.
    pub fn classify(&self, value: Scalar) -> Band {
        if value.abs() <= NEUTRAL_EPSILON {
            Band::Neutral
        } else if value > self.orange_th {
            Band::VeryHot
        } else if value > self.yellow_th {
            Band::Hot
        } else if value > 0.0 {
            Band::Warm
        } else if value > self.cyan_th {
            Band::Chilly
        } else if value > self.blue_th {
            Band::Cold
        } else {
            Band::VeryCold
        }
    }

    pub fn min(&self) -> Scalar {
        self.min
    }

    pub fn max(&self) -> Scalar {
        self.max
    }

    /// `[orange, yellow, cyan, blue]` thresholds.
    pub fn thresholds(&self) -> [Scalar; 4] {
        [self.orange_th, self.yellow_th, self.cyan_th, self.blue_th]
    }
}
