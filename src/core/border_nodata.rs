//! Border no-data detection
//!
//! Flags no-data pixels reachable from an image edge without crossing valid
//! data (skew artifacts around the footprint), leaving interior holes to the
//! inner no-data mask.

use crate::core::tiling::{TileFilter, TiledExecutor, DEFAULT_TILE_ROWS};
use crate::types::{DsmError, DsmResult, MaskBuffer, RasterProfile};
use ndarray::{Array2, ArrayView2, Zip};

/// One-directional border no-data scan filter.
///
/// Scans every row from both ends, marking no-data pixels until the first
/// valid sample. Each row is self-contained, so the filter needs no margin —
/// but it does need complete rows, hence execution over full-width row
/// strips. The vertical case reuses this same filter on a transposed view.
pub struct BorderNodataFilter {
    nodata: f32,
}

impl BorderNodataFilter {
    pub fn new(nodata: f32) -> Self {
        Self { nodata }
    }
}

impl TileFilter for BorderNodataFilter {
    type Output = u8;

    fn margin(&self) -> usize {
        0
    }

    fn apply(&self, windows: &[ArrayView2<'_, f32>]) -> DsmResult<Array2<u8>> {
        let dsm = windows
            .first()
            .ok_or_else(|| DsmError::Processing("Border filter expects one input".to_string()))?;

        let mut mask = MaskBuffer::zeros(dsm.dim());
        for (i, row) in dsm.outer_iter().enumerate() {
            let width = row.len();

            // Left to right: mark until the first valid pixel
            let mut j = 0;
            while j < width && row[j] == self.nodata {
                mask[[i, j]] = 1;
                j += 1;
            }

            // Right to left
            let mut j = width;
            while j > 0 && row[j - 1] == self.nodata {
                mask[[i, j - 1]] = 1;
                j -= 1;
            }
        }

        Ok(mask)
    }

    fn output_profile(&self, input: &RasterProfile) -> RasterProfile {
        input.as_mask_profile()
    }
}

/// Build the border no-data mask of a DSM.
///
/// Runs the row scan horizontally over the image, then again over the
/// transposed image (the vertical case, transposed back), and keeps only the
/// pixels both directional scans agree on. An all-no-data row or column is
/// fully marked in its direction.
pub fn build_border_nodata_mask(
    dsm: ArrayView2<'_, f32>,
    nodata: f32,
    nb_max_workers: usize,
) -> DsmResult<MaskBuffer> {
    log::debug!("Building border no-data mask (nodata {})", nodata);

    let filter = BorderNodataFilter::new(nodata);
    let executor = TiledExecutor::row_strips(DEFAULT_TILE_ROWS, nb_max_workers)?;

    let horizontal = executor.run(&[dsm], &filter)?;
    let vertical = executor.run(&[dsm.t()], &filter)?;
    let vertical = vertical.t();

    let mut mask = MaskBuffer::zeros(dsm.dim());
    Zip::from(&mut mask)
        .and(&horizontal)
        .and(&vertical)
        .for_each(|m, &h, &v| *m = u8::from(h != 0 && v != 0));
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const ND: f32 = -32768.0;

    #[test]
    fn test_interior_hole_is_not_border() {
        let dsm = array![
            [10.0, 10.0, 10.0],
            [10.0, ND, 10.0],
            [10.0, 10.0, 10.0],
        ];
        let mask = build_border_nodata_mask(dsm.view(), ND, 1).unwrap();
        assert_eq!(mask.sum(), 0);
    }

    #[test]
    fn test_nodata_column_touching_edge_is_border() {
        let dsm = array![
            [ND, 10.0, 10.0],
            [ND, 10.0, 10.0],
            [ND, 10.0, 10.0],
        ];
        let mask = build_border_nodata_mask(dsm.view(), ND, 1).unwrap();
        assert_eq!(mask.column(0).sum(), 3);
        assert_eq!(mask.sum(), 3);
    }

    #[test]
    fn test_scan_path_invariant() {
        // Every pixel between a marked pixel and the nearest edge along the
        // scan direction must itself be no-data.
        let dsm = array![
            [ND, ND, 10.0, ND],
            [ND, 10.0, 10.0, 10.0],
            [ND, ND, ND, ND],
        ];
        let mask = build_border_nodata_mask(dsm.view(), ND, 1).unwrap();
        for ((i, j), &m) in mask.indexed_iter() {
            if m != 0 {
                let row = dsm.row(i);
                let left_clear = row.iter().take(j).all(|&v| v == ND);
                let right_clear = row.iter().skip(j + 1).all(|&v| v == ND);
                assert!(left_clear || right_clear, "Pixel ({}, {}) has no clear path", i, j);
            }
        }
    }
}
