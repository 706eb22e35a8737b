//! Band providers: named reflectance grids for one scene, loaded on demand.
use std::collections::{BTreeSet, HashMap};

use ndarray::Array2;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Product;

/// Source of the band grids of one scene.
pub trait BandProvider {
    /// Product the scene belongs to; its catalog lists the known band names.
    fn product(&self) -> Product;

    /// Materialize `bands`. Bands already loaded are not loaded again.
    fn ensure_loaded(&mut self, bands: &[String]) -> Result<()>;

    /// Read access to a loaded band.
    fn band(&self, name: &str) -> Result<&Array2<f64>>;

    /// Names of the bands currently loaded.
    fn loaded_bands(&self) -> Vec<String>;
}

/// Provider over grids already held in memory. Bands become readable only
/// after `ensure_loaded`, like with a file-backed provider.
#[derive(Debug, Clone)]
pub struct InMemoryBandProvider {
    product: Product,
    available: HashMap<String, Array2<f64>>,
    loaded: BTreeSet<String>,
    loads: usize,
}

impl InMemoryBandProvider {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            available: HashMap::new(),
            loaded: BTreeSet::new(),
            loads: 0,
        }
    }

    pub fn with_band(mut self, name: impl Into<String>, data: Array2<f64>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, data: Array2<f64>) {
        self.available.insert(name.into(), data);
    }

    /// Number of individual band loads performed so far.
    pub fn load_count(&self) -> usize {
        self.loads
    }
}

impl BandProvider for InMemoryBandProvider {
    fn product(&self) -> Product {
        self.product
    }

    fn ensure_loaded(&mut self, bands: &[String]) -> Result<()> {
        for band in bands {
            if self.loaded.contains(band) {
                continue;
            }
            if !self.available.contains_key(band) {
                return Err(Error::BandLoad {
                    band: band.clone(),
                    reason: "band not present in scene".to_string(),
                });
            }
            debug!("Loading band {}", band);
            self.loaded.insert(band.clone());
            self.loads += 1;
        }
        Ok(())
    }

    fn band(&self, name: &str) -> Result<&Array2<f64>> {
        if !self.loaded.contains(name) {
            return Err(Error::BandNotLoaded {
                band: name.to_string(),
            });
        }
        self.available.get(name).ok_or_else(|| Error::BandNotLoaded {
            band: name.to_string(),
        })
    }

    fn loaded_bands(&self) -> Vec<String> {
        self.loaded.iter().cloned().collect()
    }
}
