use crate::types::{DsmError, DsmResult, GeoTransform, RasterDType, RasterProfile};
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;

/// Georeferenced raster reader
pub struct RasterReader;

impl RasterReader {
    /// Read the first band of a georeferenced raster into memory.
    ///
    /// Returns the sample array together with the metadata profile
    /// (size, dtype, no-data value, geotransform, projection).
    pub fn read_dsm<P: AsRef<Path>>(path: P) -> DsmResult<(Array2<f32>, RasterProfile)> {
        let path = path.as_ref();
        log::info!("Reading DSM from: {}", path.display());

        let dataset = Dataset::open(path).map_err(|e| DsmError::RasterIo {
            path: path.to_path_buf(),
            source: e,
        })?;

        let (width, height) = dataset.raster_size();
        log::debug!("DSM size: {}x{}", width, height);

        let rasterband = dataset.rasterband(1)?;
        let nodata = rasterband.no_data_value();
        let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        let dsm_array = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| DsmError::Processing(format!("Failed to reshape DSM data: {}", e)))?;

        let geo_transform = dataset.geo_transform().ok().map(|gt| GeoTransform::from_gdal(&gt));
        let projection = match dataset.projection() {
            p if p.is_empty() => None,
            p => Some(p),
        };

        let profile = RasterProfile {
            width,
            height,
            dtype: RasterDType::Float32,
            nodata,
            geo_transform,
            projection,
        };

        log::debug!("DSM profile: {:?}", profile);
        Ok((dsm_array, profile))
    }
}

/// Georeferenced raster writer (GTiff)
pub struct RasterWriter;

impl RasterWriter {
    /// Write a float raster as a single-band GeoTIFF.
    pub fn write_f32<P: AsRef<Path>>(
        path: P,
        data: &Array2<f32>,
        profile: &RasterProfile,
    ) -> DsmResult<()> {
        Self::write_band::<f32, _>(path, data, profile)
    }

    /// Write a byte mask raster as a single-band GeoTIFF.
    pub fn write_u8<P: AsRef<Path>>(
        path: P,
        data: &Array2<u8>,
        profile: &RasterProfile,
    ) -> DsmResult<()> {
        Self::write_band::<u8, _>(path, data, profile)
    }

    fn write_band<T, P>(path: P, data: &Array2<T>, profile: &RasterProfile) -> DsmResult<()>
    where
        T: Copy + gdal::raster::GdalType,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        log::info!("Writing raster to: {}", path.display());

        let (height, width) = data.dim();
        if (height, width) != profile.shape() {
            return Err(DsmError::Processing(format!(
                "Raster shape {}x{} does not match profile {}x{}",
                height, width, profile.height, profile.width
            )));
        }

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset = driver
            .create_with_band_type::<T, _>(path, width as isize, height as isize, 1)
            .map_err(|e| DsmError::RasterIo {
                path: path.to_path_buf(),
                source: e,
            })?;

        if let Some(transform) = &profile.geo_transform {
            dataset.set_geo_transform(&transform.to_gdal())?;
        }
        if let Some(projection) = &profile.projection {
            dataset.set_projection(projection)?;
        }

        let mut rasterband = dataset.rasterband(1)?;
        let flat_data: Vec<T> = data.iter().cloned().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
        rasterband.set_no_data_value(profile.nodata)?;

        log::debug!("Raster written: {}x{} pixels", width, height);
        Ok(())
    }
}
