//! Core DSM preprocessing modules

pub mod border_nodata;
pub mod disturbance;
pub mod preprocess;
pub mod quality_mask;
pub mod regular;
pub mod store;
pub mod tiling;

pub use border_nodata::build_border_nodata_mask;
pub use disturbance::build_disturbance_mask;
pub use preprocess::{preprocess, DsmPreprocessor, PreprocessParams};
pub use quality_mask::fuse_quality_mask;
pub use regular::build_regular_mask;
pub use store::RasterStore;
pub use tiling::{TileFilter, TiledExecutor};
