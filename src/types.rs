use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Elevation sample type used throughout the pipeline
pub type Elevation = f32;

/// 2D elevation data array (rows x cols)
pub type DsmBuffer = Array2<Elevation>;

/// 2D byte mask array (rows x cols)
pub type MaskBuffer = Array2<u8>;

/// Fixed no-data sentinel applied when neither the caller nor the raster
/// profile provides one, and when a NaN no-data value is normalized.
pub const NO_DATA_VALUE: f32 = -32768.0;

/// Quality mask classification values
pub mod quality {
    /// Valid DSM sample
    pub const VALID: u8 = 0;
    /// No-data fully enclosed by valid data (interior hole)
    pub const INNER_NODATA: u8 = 1;
    /// Disturbed area (occlusion, water, correlation error)
    pub const DISTURBED: u8 = 2;
    /// No-data reachable from the image edge (border/skew artifact)
    pub const BORDER_NODATA: u8 = 3;
}

/// Sample data type of a raster band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterDType {
    Float32,
    UInt8,
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }
}

/// Raster metadata profile (TIF metadata equivalent)
///
/// The geotransform and projection are opaque to the pipeline: they are
/// copied from the input DSM to every derived raster, never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterProfile {
    pub width: usize,
    pub height: usize,
    pub dtype: RasterDType,
    pub nodata: Option<f64>,
    pub geo_transform: Option<GeoTransform>,
    pub projection: Option<String>,
}

impl RasterProfile {
    /// Profile of a binary/quality byte mask derived from this raster.
    /// Masks classify every pixel, so they carry no no-data value.
    pub fn as_mask_profile(&self) -> RasterProfile {
        RasterProfile {
            dtype: RasterDType::UInt8,
            nodata: None,
            ..self.clone()
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Error types for DSM preprocessing
#[derive(Debug, thiserror::Error)]
pub enum DsmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Raster I/O failed for '{path}': {source}")]
    RasterIo {
        path: PathBuf,
        source: gdal::errors::GdalError,
    },

    #[error("Cannot create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for DSM preprocessing operations
pub type DsmResult<T> = Result<T, DsmError>;
