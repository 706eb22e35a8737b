use gdal::Dataset;
use gdal::DriverManager;
use gdal::raster::Buffer;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::io::gdal::GeoReference;
use crate::io::writers::OutputSink;

/// Write a single-band Float32 GeoTIFF with nodata and georeferencing.
pub fn write_tiff_f32(
    output: &Path,
    cols: usize,
    rows: usize,
    data: &[f32],
    no_data: f64,
    georef: &GeoReference,
) -> Result<Dataset> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<f32, _>(output, cols, rows, 1)?;
    if let Some(gt) = georef.geotransform {
        ds.set_geo_transform(&gt)?;
    }
    if let Some(proj) = &georef.projection {
        ds.set_projection(proj)?;
    }
    let mut band = ds.rasterband(1)?;
    band.set_no_data_value(Some(no_data))?;
    let mut buf = Buffer::new((cols, rows), data.to_vec());
    band.write((0, 0), (cols, rows), &mut buf)?;
    Ok(ds)
}

/// Saves parameter grids as `<dir>/<name>.tif`.
pub struct GeoTiffSaver {
    dir: PathBuf,
    georef: GeoReference,
}

impl GeoTiffSaver {
    pub fn new(dir: impl Into<PathBuf>, georef: GeoReference) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, georef })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for GeoTiffSaver {
    fn save_array(&mut self, array: &Array2<f64>, name: &str, no_data: f64) -> Result<PathBuf> {
        let (rows, cols) = array.dim();
        let data: Vec<f32> = array.iter().map(|&v| v as f32).collect();
        let path = self.dir.join(format!("{}.tif", name));
        write_tiff_f32(&path, cols, rows, &data, no_data, &self.georef)?;
        info!("Saved {} to {:?}", name, path);
        Ok(path)
    }
}
