use crate::error::error::InvalidGridSizeSnafu;
use crate::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

/// Bucket indices of a grid cell, the bucket in degrees is `index * grid size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub lat_index: i32,
    pub lon_index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    size: f64,
}

impl Grid {
    pub fn new(size: f64) -> Result<Self> {
        ensure!(size.is_finite() && size > 0.0, InvalidGridSizeSnafu { size });
        Ok(Self { size })
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    /// Nearest multiple of the grid size in both dimensions, ties go to the even multiple.
    pub fn cell(&self, latitude: f64, longitude: f64) -> GridCell {
        GridCell {
            lat_index: (latitude / self.size).round_ties_even() as i32,
            lon_index: (longitude / self.size).round_ties_even() as i32,
        }
    }

    pub fn latitude(&self, cell: &GridCell) -> f64 {
        cell.lat_index as f64 * self.size
    }

    pub fn longitude(&self, cell: &GridCell) -> f64 {
        cell.lon_index as f64 * self.size
    }
}
