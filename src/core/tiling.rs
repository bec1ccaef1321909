//! Tiled filter execution for large rasters
//!
//! Splits same-extent input rasters into a non-overlapping output grid of
//! tiles, reads each tile through a stable margin (clipped at image bounds),
//! applies a per-tile filter sequentially or across a worker pool, then
//! crops the margins away and stitches the results into a full-extent
//! output buffer. As long as the margin covers the filter's true dependency
//! radius, the stitched output is identical for every tile shape and worker
//! count.

use crate::types::{DsmError, DsmResult, RasterProfile};
use ndarray::{s, Array2, ArrayView2};
use num_traits::Zero;

/// Default tile shape: a tile plus margin fits comfortably in memory
pub const DEFAULT_TILE_ROWS: usize = 1024;
pub const DEFAULT_TILE_COLS: usize = 1024;

/// A rectangular sub-window of a raster in full-image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub rows: usize,
    pub cols: usize,
}

/// A tile window expanded by a margin and clipped at the image bounds.
///
/// `crop_row`/`crop_col` locate the logical tile inside the expanded
/// window, so margin pixels can be discarded before stitching.
#[derive(Debug, Clone, Copy)]
pub struct MarginedWindow {
    pub row_start: usize,
    pub col_start: usize,
    pub rows: usize,
    pub cols: usize,
    pub crop_row: usize,
    pub crop_col: usize,
}

impl TileWindow {
    /// Expand this window by `margin` pixels in every direction, clipped at
    /// the image bounds. Boundary tiles receive a smaller effective margin
    /// rather than out-of-bounds reads.
    pub fn margined(&self, margin: usize, height: usize, width: usize) -> MarginedWindow {
        let row_start = self.row_off.saturating_sub(margin);
        let col_start = self.col_off.saturating_sub(margin);
        let row_end = (self.row_off + self.rows + margin).min(height);
        let col_end = (self.col_off + self.cols + margin).min(width);

        MarginedWindow {
            row_start,
            col_start,
            rows: row_end - row_start,
            cols: col_end - col_start,
            crop_row: self.row_off - row_start,
            crop_col: self.col_off - col_start,
        }
    }
}

/// Non-overlapping grid of tiles covering a raster extent exactly once
#[derive(Debug, Clone)]
pub struct TileGrid {
    tiles: Vec<TileWindow>,
    height: usize,
    width: usize,
}

impl TileGrid {
    /// Compute the output grid. The last tile in each dimension is clipped
    /// to the image bound, not padded.
    pub fn new(height: usize, width: usize, tile_rows: usize, tile_cols: usize) -> Self {
        let mut tiles = Vec::new();
        let mut row_off = 0;
        while row_off < height {
            let rows = tile_rows.min(height - row_off);
            let mut col_off = 0;
            while col_off < width {
                let cols = tile_cols.min(width - col_off);
                tiles.push(TileWindow {
                    row_off,
                    col_off,
                    rows,
                    cols,
                });
                col_off += cols;
            }
            row_off += rows;
        }

        Self {
            tiles,
            height,
            width,
        }
    }

    pub fn tiles(&self) -> &[TileWindow] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn extent(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Per-tile filter capability.
///
/// Detectors declare their dependency radius through `margin` and receive
/// one margined window per input raster; the returned array must have the
/// margined window's shape. `output_profile` derives the metadata profile
/// of the full-extent output (dtype/no-data may differ from the input).
pub trait TileFilter: Sync {
    type Output: Copy + Zero + Send + Sync;

    /// Neighbor lookup distance of this filter, in pixels
    fn margin(&self) -> usize;

    /// Process one margined window per input raster
    fn apply(&self, windows: &[ArrayView2<'_, f32>]) -> DsmResult<Array2<Self::Output>>;

    /// Derive the output raster profile from the input profile
    fn output_profile(&self, input: &RasterProfile) -> RasterProfile;
}

/// Tiled filter executor
///
/// Tiles have no ordering dependency and never alias each other's output
/// region, so parallel execution needs no synchronization beyond the final
/// copy placement. A failing tile aborts the whole run; nothing partial is
/// stitched.
#[derive(Debug, Clone)]
pub struct TiledExecutor {
    tile_rows: usize,
    tile_cols: usize,
    nb_workers: usize,
}

impl TiledExecutor {
    /// Create an executor with an explicit tile shape and worker count.
    pub fn new(tile_shape: (usize, usize), nb_workers: usize) -> DsmResult<Self> {
        let (tile_rows, tile_cols) = tile_shape;
        if tile_rows == 0 || tile_cols == 0 {
            return Err(DsmError::Configuration(format!(
                "Tile shape {}x{} is invalid: both dimensions must be positive",
                tile_rows, tile_cols
            )));
        }
        if nb_workers == 0 {
            return Err(DsmError::Configuration(
                "Worker count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            tile_rows,
            tile_cols,
            nb_workers,
        })
    }

    /// Executor cutting full-width row strips. Row-oriented filters with
    /// margin 0 (border no-data scans) require every row to be complete.
    pub fn row_strips(strip_rows: usize, nb_workers: usize) -> DsmResult<Self> {
        Self::new((strip_rows, usize::MAX), nb_workers)
    }

    pub fn nb_workers(&self) -> usize {
        self.nb_workers
    }

    /// Run a filter over every tile of the input rasters and stitch the
    /// per-tile outputs into one full-extent buffer.
    ///
    /// All inputs must share the same extent; the filter sees the same
    /// margined window of each.
    pub fn run<F: TileFilter>(
        &self,
        inputs: &[ArrayView2<'_, f32>],
        filter: &F,
    ) -> DsmResult<Array2<F::Output>> {
        let first = inputs.first().ok_or_else(|| {
            DsmError::Configuration("At least one input raster is required".to_string())
        })?;
        let (height, width) = first.dim();
        for input in inputs {
            if input.dim() != (height, width) {
                return Err(DsmError::Configuration(format!(
                    "Input extents differ: expected {}x{}, got {}x{}",
                    height,
                    width,
                    input.nrows(),
                    input.ncols()
                )));
            }
        }

        let grid = TileGrid::new(height, width, self.tile_rows, self.tile_cols);
        let margin = filter.margin();
        log::debug!(
            "Dispatching {} tiles over {}x{} (margin {}, {} workers)",
            grid.len(),
            height,
            width,
            margin,
            self.nb_workers
        );

        let process = |tile: &TileWindow| -> DsmResult<(TileWindow, Array2<F::Output>)> {
            let m = tile.margined(margin, height, width);
            let windows: Vec<ArrayView2<'_, f32>> = inputs
                .iter()
                .map(|input| {
                    input.slice(s![
                        m.row_start..m.row_start + m.rows,
                        m.col_start..m.col_start + m.cols
                    ])
                })
                .collect();

            let result = filter.apply(&windows)?;
            if result.dim() != (m.rows, m.cols) {
                return Err(DsmError::Processing(format!(
                    "Filter returned a {}x{} array for a {}x{} window",
                    result.nrows(),
                    result.ncols(),
                    m.rows,
                    m.cols
                )));
            }

            // Discard margin pixels before stitching
            let cropped = result
                .slice(s![
                    m.crop_row..m.crop_row + tile.rows,
                    m.crop_col..m.crop_col + tile.cols
                ])
                .to_owned();
            Ok((*tile, cropped))
        };

        let results = self.dispatch(grid.tiles(), &process)?;

        let mut output = Array2::zeros((height, width));
        for (tile, data) in results {
            output
                .slice_mut(s![
                    tile.row_off..tile.row_off + tile.rows,
                    tile.col_off..tile.col_off + tile.cols
                ])
                .assign(&data);
        }
        Ok(output)
    }

    #[cfg(feature = "parallel")]
    fn dispatch<O, P>(
        &self,
        tiles: &[TileWindow],
        process: &P,
    ) -> DsmResult<Vec<(TileWindow, Array2<O>)>>
    where
        O: Send,
        P: Fn(&TileWindow) -> DsmResult<(TileWindow, Array2<O>)> + Sync,
    {
        use rayon::prelude::*;

        if self.nb_workers == 1 {
            return tiles.iter().map(process).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.nb_workers)
            .build()
            .map_err(|e| DsmError::Processing(format!("Failed to build worker pool: {}", e)))?;

        pool.install(|| tiles.par_iter().map(process).collect())
    }

    #[cfg(not(feature = "parallel"))]
    fn dispatch<O, P>(
        &self,
        tiles: &[TileWindow],
        process: &P,
    ) -> DsmResult<Vec<(TileWindow, Array2<O>)>>
    where
        O: Send,
        P: Fn(&TileWindow) -> DsmResult<(TileWindow, Array2<O>)> + Sync,
    {
        tiles.iter().map(process).collect()
    }
}

impl Default for TiledExecutor {
    fn default() -> Self {
        Self {
            tile_rows: DEFAULT_TILE_ROWS,
            tile_cols: DEFAULT_TILE_COLS,
            nb_workers: 1,
        }
    }
}
