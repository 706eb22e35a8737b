use gdal::Dataset;
use gdal::raster::ResampleAlg;
use ndarray::Array2;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::mask::WaterMask;
use crate::error::{Error, Result};
use crate::io::bands::BandProvider;
use crate::types::Product;

/// Georeferencing shared by the mask, the band grids and every output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoReference {
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: Option<[f64; 6]>,
    /// Projection in WKT format
    pub projection: Option<String>,
}

impl GeoReference {
    fn from_dataset(dataset: &Dataset) -> Self {
        let geotransform = dataset.geo_transform().ok();
        let projection = dataset.projection();
        Self {
            geotransform,
            projection: if projection.is_empty() {
                None
            } else {
                Some(projection)
            },
        }
    }
}

/// Read band 1 of `dataset` resampled to `shape` (rows, cols); the band's
/// nodata value becomes NaN.
fn read_resampled(dataset: &Dataset, shape: (usize, usize), alg: ResampleAlg) -> Result<Array2<f64>> {
    let (rows, cols) = shape;
    let (size_x, size_y) = dataset.raster_size();
    let band = dataset.rasterband(1)?;
    let no_data = band.no_data_value();
    let buf = band.read_as::<f64>((0, 0), (size_x, size_y), (cols, rows), Some(alg))?;
    let mut data = buf.data().to_vec();
    if let Some(nd) = no_data {
        for v in data.iter_mut() {
            if *v == nd {
                *v = f64::NAN;
            }
        }
    }
    Array2::from_shape_vec((rows, cols), data).map_err(|_| Error::ShapeMismatch {
        expected: shape,
        actual: (size_y, size_x),
    })
}

/// Read a water mask GeoTIFF (band 1) produced by the detection pipeline.
pub fn read_water_mask(path: &Path) -> Result<(WaterMask, GeoReference)> {
    let dataset = Dataset::open(path)?;
    let (size_x, size_y) = dataset.raster_size();
    let raw = read_resampled(&dataset, (size_y, size_x), ResampleAlg::NearestNeighbour)?;
    let mask = WaterMask::from_raw(&raw);
    info!(
        "Water mask {:?}: {}x{}, {} water pixels",
        path,
        size_x,
        size_y,
        mask.water_count()
    );
    Ok((mask, GeoReference::from_dataset(&dataset)))
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Band provider reading the band files of a product directory through GDAL.
///
/// Band files are located by the suffix the product uses for each band and
/// are resampled on read to the shape of the water mask, then divided by the
/// product's reflectance scale.
pub struct GdalBandProvider {
    product: Product,
    shape: (usize, usize),
    files: HashMap<String, PathBuf>,
    bands: HashMap<String, Array2<f64>>,
}

impl GdalBandProvider {
    pub fn open(dir: &Path, product: Product, shape: (usize, usize)) -> Result<Self> {
        let mut all = Vec::new();
        collect_files(dir, &mut all)?;

        let mut files = HashMap::new();
        for band in product.band_names() {
            let Some(suffix) = product.band_suffix(band) else {
                continue;
            };
            let suffix = suffix.to_ascii_lowercase();
            let found = all.iter().find(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().to_ascii_lowercase().ends_with(&suffix))
                    .unwrap_or(false)
            });
            match found {
                Some(path) => {
                    debug!("Band {} -> {:?}", band, path);
                    files.insert(band.to_string(), path.clone());
                }
                None => debug!("Band {} has no file in {:?}", band, dir),
            }
        }
        if files.is_empty() {
            warn!("No {} band files found in {:?}", product, dir);
        }

        Ok(Self {
            product,
            shape,
            files,
            bands: HashMap::new(),
        })
    }

    /// Bands with a file in the product directory.
    pub fn available_bands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.files.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn load(&self, band: &str) -> Result<Array2<f64>> {
        let path = self.files.get(band).ok_or_else(|| Error::BandLoad {
            band: band.to_string(),
            reason: format!(
                "no file ending with {} found",
                self.product.band_suffix(band).unwrap_or("?")
            ),
        })?;
        let dataset = Dataset::open(path).map_err(|e| Error::BandLoad {
            band: band.to_string(),
            reason: e.to_string(),
        })?;
        let raw = read_resampled(&dataset, self.shape, ResampleAlg::Bilinear).map_err(|e| {
            Error::BandLoad {
                band: band.to_string(),
                reason: e.to_string(),
            }
        })?;
        let scale = self.product.reflectance_scale();
        Ok(raw.mapv(|v| v / scale))
    }
}

impl BandProvider for GdalBandProvider {
    fn product(&self) -> Product {
        self.product
    }

    fn ensure_loaded(&mut self, bands: &[String]) -> Result<()> {
        for band in bands {
            if self.bands.contains_key(band) {
                continue;
            }
            info!("Loading band {}", band);
            let data = self.load(band)?;
            self.bands.insert(band.clone(), data);
        }
        Ok(())
    }

    fn band(&self, name: &str) -> Result<&Array2<f64>> {
        self.bands.get(name).ok_or_else(|| Error::BandNotLoaded {
            band: name.to_string(),
        })
    }

    fn loaded_bands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bands.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
