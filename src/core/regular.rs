//! Regular (flat) area detection
//!
//! Same neighbor-delta computation as disturbance detection with the
//! acceptance inverted: a pixel is regular when its local slope stays at or
//! below the threshold. The resulting binary mask feeds the downstream
//! terrain extraction stage.

use crate::core::disturbance::connectivity_offsets;
use crate::core::tiling::{TileFilter, TiledExecutor};
use crate::types::{DsmError, DsmResult, MaskBuffer, RasterProfile};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Regular area detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularParams {
    /// Maximum neighbor delta of a regular area
    pub regular_slope: f32,
    /// Evaluate N/S/E/W only, or the diagonals as well
    pub is_four_connexity: bool,
}

impl Default for RegularParams {
    fn default() -> Self {
        Self {
            regular_slope: 1.0,
            is_four_connexity: true,
        }
    }
}

impl RegularParams {
    pub fn validate(&self) -> DsmResult<()> {
        if !self.regular_slope.is_finite() || self.regular_slope < 0.0 {
            return Err(DsmError::Configuration(format!(
                "Regular slope must be finite and non-negative, got {}",
                self.regular_slope
            )));
        }
        Ok(())
    }
}

/// Per-tile regular area filter (margin 1).
///
/// A pixel is regular when it is valid and no evaluated neighbor delta
/// exceeds the slope. No-data neighbors are excluded from the comparison.
pub struct RegularAreasFilter {
    params: RegularParams,
    nodata: f32,
}

impl RegularAreasFilter {
    pub fn new(params: RegularParams, nodata: f32) -> Self {
        Self { params, nodata }
    }
}

impl TileFilter for RegularAreasFilter {
    type Output = u8;

    fn margin(&self) -> usize {
        1
    }

    fn apply(&self, windows: &[ArrayView2<'_, f32>]) -> DsmResult<Array2<u8>> {
        let dsm = windows
            .first()
            .ok_or_else(|| DsmError::Processing("Regular filter expects one input".to_string()))?;

        let (rows, cols) = dsm.dim();
        let mut mask = MaskBuffer::zeros((rows, cols));
        let offsets = connectivity_offsets(self.params.is_four_connexity);

        for i in 1..rows.saturating_sub(1) {
            for j in 1..cols.saturating_sub(1) {
                let center = dsm[[i, j]];
                if center == self.nodata {
                    continue;
                }
                let mut regular = true;
                for &(di, dj) in offsets {
                    let ni = (i as isize + di) as usize;
                    let nj = (j as isize + dj) as usize;
                    let neighbor = dsm[[ni, nj]];
                    if neighbor == self.nodata {
                        continue;
                    }
                    if (center - neighbor).abs() > self.params.regular_slope {
                        regular = false;
                        break;
                    }
                }
                if regular {
                    mask[[i, j]] = 1;
                }
            }
        }

        Ok(mask)
    }

    fn output_profile(&self, input: &RasterProfile) -> RasterProfile {
        input.as_mask_profile()
    }
}

/// Build the regular area mask of a DSM through the tiled executor.
pub fn build_regular_mask(
    dsm: ArrayView2<'_, f32>,
    nodata: f32,
    params: &RegularParams,
    executor: &TiledExecutor,
) -> DsmResult<MaskBuffer> {
    params.validate()?;
    log::debug!(
        "Building regular area mask (slope {}, {}-connexity)",
        params.regular_slope,
        if params.is_four_connexity { 4 } else { 8 }
    );

    let filter = RegularAreasFilter::new(params.clone(), nodata);
    executor.run(&[dsm], &filter)
}
