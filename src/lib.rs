//! dsmprep: A Fast, Tiled DSM Preprocessor for Terrain Extraction
//!
//! This library prepares a Digital Surface Model for DTM extraction by
//! detecting border no-data, disturbed areas and locally regular areas,
//! then fusing them into a prioritized quality mask and a cleaned DSM.
//! Detection runs through a generic tiled execution engine so rasters far
//! larger than memory can be processed tile by tile, in parallel, without
//! seams at tile boundaries.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    DsmBuffer, DsmError, DsmResult, Elevation, GeoTransform, MaskBuffer, RasterDType,
    RasterProfile, NO_DATA_VALUE,
};

pub use crate::core::border_nodata::build_border_nodata_mask;
pub use crate::core::disturbance::{build_disturbance_mask, DisturbanceParams};
pub use crate::core::preprocess::{
    preprocess, DsmPreprocessor, LogObserver, PreprocessOutputs, PreprocessParams, StageObserver,
};
pub use crate::core::quality_mask::fuse_quality_mask;
pub use crate::core::regular::{build_regular_mask, RegularParams};
pub use crate::core::store::{RasterBuffer, RasterStore};
pub use crate::core::tiling::{TileFilter, TileGrid, TileWindow, TiledExecutor};
pub use crate::io::{RasterReader, RasterWriter};
