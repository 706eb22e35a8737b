//! I/O layer: band providers (in-memory and GDAL-backed), water mask reading,
//! and `writers` for GeoTIFF outputs, JPEG report pages and world files.
pub mod bands;
pub use bands::{BandProvider, InMemoryBandProvider};

pub mod gdal;
pub use gdal::{GdalBandProvider, GeoReference, read_water_mask};

pub mod writers;
pub use writers::{GeoTiffSaver, MemorySink, OutputSink};
