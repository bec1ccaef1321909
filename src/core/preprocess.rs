//! DSM preprocessing pipeline
//!
//! Orchestrates the detection stages over the tiled executor and persists
//! the fused quality mask plus the cleaned DSM, the two inputs of the
//! downstream terrain extraction step.

use crate::core::border_nodata::build_border_nodata_mask;
use crate::core::disturbance::{build_disturbance_mask, DisturbanceParams};
use crate::core::quality_mask::{apply_disturbance, fuse_quality_mask, inner_nodata_mask};
use crate::core::store::RasterStore;
use crate::core::tiling::{TiledExecutor, DEFAULT_TILE_COLS, DEFAULT_TILE_ROWS};
use crate::io::{RasterReader, RasterWriter};
use crate::types::{DsmError, DsmResult, NO_DATA_VALUE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// File name of the persisted quality mask
pub const QUALITY_MASK_FILENAME: &str = "quality_mask.tif";
/// File name of the persisted cleaned DSM
pub const PREPROCESSED_DSM_FILENAME: &str = "preprocessed_DSM.tif";

/// Preprocessing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Worker count for tile dispatch
    pub nb_max_workers: usize,
    /// No-data value of the input DSM. When unset, the DSM profile value is
    /// used, falling back to the fixed sentinel.
    pub nodata: Option<f32>,
    /// Neighbor delta above which a pixel is disturbed
    pub slope_threshold: f32,
    /// Evaluate N/S/E/W only, or the diagonals as well
    pub is_four_connexity: bool,
    /// Samples below this height are rewritten to no-data before detection
    /// (DSMs with dynamic no-data values, MicMac for example)
    pub min_valid_height: Option<f32>,
    /// Tile shape (rows, cols) for the margin-1 detectors
    pub tile_shape: (usize, usize),
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            nb_max_workers: 1,
            nodata: None,
            slope_threshold: 2.0,
            is_four_connexity: true,
            min_valid_height: None,
            tile_shape: (DEFAULT_TILE_ROWS, DEFAULT_TILE_COLS),
        }
    }
}

impl PreprocessParams {
    /// Validate the configuration before any tile runs.
    pub fn validate(&self) -> DsmResult<()> {
        if self.nb_max_workers == 0 {
            return Err(DsmError::Configuration(
                "Worker count must be at least 1".to_string(),
            ));
        }
        self.disturbance_params().validate()?;
        if let Some(min_valid) = self.min_valid_height {
            if !min_valid.is_finite() {
                return Err(DsmError::Configuration(format!(
                    "Min valid height must be finite, got {}",
                    min_valid
                )));
            }
        }
        // Tile shape is checked again by the executor constructor
        if self.tile_shape.0 == 0 || self.tile_shape.1 == 0 {
            return Err(DsmError::Configuration(format!(
                "Tile shape {}x{} is invalid",
                self.tile_shape.0, self.tile_shape.1
            )));
        }
        Ok(())
    }

    fn disturbance_params(&self) -> DisturbanceParams {
        DisturbanceParams {
            slope_threshold: self.slope_threshold,
            is_four_connexity: self.is_four_connexity,
        }
    }
}

/// Instrumentation hook reporting stage completion.
///
/// Timing is an explicit collaborator of the pipeline rather than global
/// logging state; the default implementation reports through `log`.
pub trait StageObserver: Send + Sync {
    fn stage_completed(&self, stage: &str, elapsed: Duration);
}

/// Default observer logging stage runtimes
pub struct LogObserver;

impl StageObserver for LogObserver {
    fn stage_completed(&self, stage: &str, elapsed: Duration) {
        log::info!("{} completed in {:.3}s", stage, elapsed.as_secs_f64());
    }
}

/// Paths of the two persisted pipeline outputs
#[derive(Debug, Clone)]
pub struct PreprocessOutputs {
    pub preprocessed_dsm_path: PathBuf,
    pub quality_mask_path: PathBuf,
}

/// DSM preprocessing pipeline runner
pub struct DsmPreprocessor {
    params: PreprocessParams,
    observer: Box<dyn StageObserver>,
}

impl DsmPreprocessor {
    pub fn new(params: PreprocessParams) -> Self {
        Self::with_observer(params, Box::new(LogObserver))
    }

    pub fn with_observer(params: PreprocessParams, observer: Box<dyn StageObserver>) -> Self {
        Self { params, observer }
    }

    /// Run the preprocessing pipeline on a DSM file.
    ///
    /// Either both outputs are written consistently, or the run fails and
    /// nothing partial is persisted.
    pub fn run<P, Q>(&self, dsm_path: P, output_dir: Q) -> DsmResult<PreprocessOutputs>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        log::info!("Starting DSM preprocessing");
        self.params.validate()?;

        let started = Instant::now();
        let (mut dsm, mut profile) = RasterReader::read_dsm(dsm_path.as_ref())?;
        self.observer.stage_completed("load_dsm", started.elapsed());

        // Resolve the working no-data value: explicit parameter, then the
        // DSM profile, then the fixed sentinel.
        let mut nodata = self
            .params
            .nodata
            .or(profile.nodata.map(|v| v as f32))
            .unwrap_or_else(|| {
                log::info!("No data value is set to {}", NO_DATA_VALUE);
                NO_DATA_VALUE
            });

        // NaN cannot be compared for equality; normalize both the declared
        // no-data value and the NaN samples to the sentinel.
        if nodata.is_nan() {
            dsm.mapv_inplace(|v| if v.is_nan() { NO_DATA_VALUE } else { v });
            nodata = NO_DATA_VALUE;
        }

        if let Some(min_valid) = self.params.min_valid_height {
            log::info!("Min valid height set to {}", min_valid);
            dsm.mapv_inplace(|v| if v < min_valid { nodata } else { v });
        }

        profile.nodata = Some(nodata as f64);

        let mut store = RasterStore::new();
        store.insert_float("dsm", dsm, profile);
        let mask_profile = store.profile("dsm")?.as_mask_profile();

        // Border and inner no-data masks
        let started = Instant::now();
        let border = build_border_nodata_mask(
            store.float_view("dsm")?,
            nodata,
            self.params.nb_max_workers,
        )?;
        store.insert_byte("border_nodata", border, mask_profile.clone());

        let inner = inner_nodata_mask(
            store.float_view("dsm")?,
            nodata,
            store.byte_view("border_nodata")?,
        )?;
        store.insert_byte("inner_nodata", inner, mask_profile.clone());
        self.observer.stage_completed("nodata_masks", started.elapsed());

        // Disturbed areas (occlusion, water, correlation errors)
        let started = Instant::now();
        let executor = TiledExecutor::new(self.params.tile_shape, self.params.nb_max_workers)?;
        let disturbed = build_disturbance_mask(
            store.float_view("dsm")?,
            nodata,
            &self.params.disturbance_params(),
            &executor,
        )?;
        store.insert_byte("disturbed", disturbed, mask_profile.clone());
        self.observer.stage_completed("disturbance_mask", started.elapsed());

        // Fuse the masks and clean the DSM
        let started = Instant::now();
        let quality_mask = fuse_quality_mask(
            store.byte_view("border_nodata")?,
            store.byte_view("inner_nodata")?,
            store.byte_view("disturbed")?,
        )?;

        let (mut dsm, dsm_profile) = store.take_float("dsm")?;
        let (disturbed, _) = store.take_byte("disturbed")?;
        apply_disturbance(&mut dsm, disturbed.view(), nodata);
        self.observer.stage_completed("mask_fusion", started.elapsed());

        // Persist both outputs
        let started = Instant::now();
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir).map_err(|e| DsmError::OutputDir {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let quality_mask_path = output_dir.join(QUALITY_MASK_FILENAME);
        RasterWriter::write_u8(&quality_mask_path, &quality_mask, &mask_profile)?;

        let preprocessed_dsm_path = output_dir.join(PREPROCESSED_DSM_FILENAME);
        RasterWriter::write_f32(&preprocessed_dsm_path, &dsm, &dsm_profile)?;
        self.observer.stage_completed("write_outputs", started.elapsed());

        log::info!("DSM preprocessing done");
        Ok(PreprocessOutputs {
            preprocessed_dsm_path,
            quality_mask_path,
        })
    }
}

/// Run the preprocessing pipeline with the default log-based observer.
pub fn preprocess<P, Q>(
    dsm_path: P,
    output_dir: Q,
    params: PreprocessParams,
) -> DsmResult<PreprocessOutputs>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    DsmPreprocessor::new(params).run(dsm_path, output_dir)
}
