//! Raster I/O at the codec boundary
//!
//! The pipeline exchanges `(array, profile)` pairs with GDAL here and
//! nowhere else; geotransform and projection are copied through unchanged.

pub mod raster;

pub use raster::{RasterReader, RasterWriter};
