//! Disturbed area detection
//!
//! Disturbed pixels are local slope outliers, mostly water surfaces and
//! correlation failures (occlusion) from the DSM generation step.

use crate::core::tiling::{TileFilter, TiledExecutor};
use crate::types::{DsmError, DsmResult, MaskBuffer, RasterProfile};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

const FOUR_CONNEXITY: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const EIGHT_CONNEXITY: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

pub(crate) fn connectivity_offsets(is_four_connexity: bool) -> &'static [(isize, isize)] {
    if is_four_connexity {
        &FOUR_CONNEXITY
    } else {
        &EIGHT_CONNEXITY
    }
}

/// Disturbance detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisturbanceParams {
    /// A neighbor delta above this threshold marks the pixel as disturbed
    pub slope_threshold: f32,
    /// Evaluate N/S/E/W only, or the diagonals as well
    pub is_four_connexity: bool,
}

impl Default for DisturbanceParams {
    fn default() -> Self {
        Self {
            slope_threshold: 2.0,
            is_four_connexity: true,
        }
    }
}

impl DisturbanceParams {
    pub fn validate(&self) -> DsmResult<()> {
        if !self.slope_threshold.is_finite() || self.slope_threshold < 0.0 {
            return Err(DsmError::Configuration(format!(
                "Slope threshold must be finite and non-negative, got {}",
                self.slope_threshold
            )));
        }
        Ok(())
    }
}

/// Per-tile disturbance filter (margin 1).
///
/// A pixel is disturbed when the absolute elevation delta to any evaluated
/// neighbor exceeds the threshold and neither pixel is no-data. No-data
/// neighbors never trigger. Pixels without their full neighbor set (image
/// boundary after margin clipping) are not evaluated.
pub struct DisturbedAreasFilter {
    params: DisturbanceParams,
    nodata: f32,
}

impl DisturbedAreasFilter {
    pub fn new(params: DisturbanceParams, nodata: f32) -> Self {
        Self { params, nodata }
    }
}

impl TileFilter for DisturbedAreasFilter {
    type Output = u8;

    fn margin(&self) -> usize {
        1
    }

    fn apply(&self, windows: &[ArrayView2<'_, f32>]) -> DsmResult<Array2<u8>> {
        let dsm = windows.first().ok_or_else(|| {
            DsmError::Processing("Disturbance filter expects one input".to_string())
        })?;

        let (rows, cols) = dsm.dim();
        let mut mask = MaskBuffer::zeros((rows, cols));
        let offsets = connectivity_offsets(self.params.is_four_connexity);

        for i in 1..rows.saturating_sub(1) {
            for j in 1..cols.saturating_sub(1) {
                let center = dsm[[i, j]];
                if center == self.nodata {
                    continue;
                }
                for &(di, dj) in offsets {
                    let ni = (i as isize + di) as usize;
                    let nj = (j as isize + dj) as usize;
                    let neighbor = dsm[[ni, nj]];
                    if neighbor == self.nodata {
                        continue;
                    }
                    if (center - neighbor).abs() > self.params.slope_threshold {
                        mask[[i, j]] = 1;
                        break;
                    }
                }
            }
        }

        Ok(mask)
    }

    fn output_profile(&self, input: &RasterProfile) -> RasterProfile {
        input.as_mask_profile()
    }
}

/// Build the disturbed area mask of a DSM through the tiled executor.
pub fn build_disturbance_mask(
    dsm: ArrayView2<'_, f32>,
    nodata: f32,
    params: &DisturbanceParams,
    executor: &TiledExecutor,
) -> DsmResult<MaskBuffer> {
    params.validate()?;
    log::debug!(
        "Building disturbance mask (threshold {}, {}-connexity)",
        params.slope_threshold,
        if params.is_four_connexity { 4 } else { 8 }
    );

    let filter = DisturbedAreasFilter::new(params.clone(), nodata);
    executor.run(&[dsm], &filter)
}
