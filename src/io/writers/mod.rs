//! Output writers: Float32 GeoTIFF parameter grids, JPEG report pages and
//! world files. [`OutputSink`] is the seam the inversion executor saves through.
pub mod jpeg;
pub mod tiff;
pub mod worldfile;

use std::path::PathBuf;

use ndarray::Array2;

use crate::error::Result;

pub use tiff::GeoTiffSaver;

/// Destination of the masked parameter grids.
pub trait OutputSink {
    /// Persist `array` under `name`, tagged with its no-data value. Returns
    /// where it was written.
    fn save_array(&mut self, array: &Array2<f64>, name: &str, no_data: f64) -> Result<PathBuf>;
}

/// A grid handed to a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArray {
    pub name: String,
    pub data: Array2<f64>,
    pub no_data: f64,
}

/// Sink keeping every saved grid in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub saved: Vec<SavedArray>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&SavedArray> {
        self.saved.iter().find(|s| s.name == name)
    }
}

impl OutputSink for MemorySink {
    fn save_array(&mut self, array: &Array2<f64>, name: &str, no_data: f64) -> Result<PathBuf> {
        self.saved.push(SavedArray {
            name: name.to_string(),
            data: array.clone(),
            no_data,
        });
        Ok(PathBuf::from(format!("memory://{}", name)))
    }
}
