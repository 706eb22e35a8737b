#![doc = r##"
waterquality: water quality parameters from optical reflectance products.

This crate runs a registry of bio-optical inversion functions over the water
pixels of a satellite scene. Each function declares the spectral bands it needs;
the bands are resolved against the product's band catalog, loaded on demand,
and the result is masked to the water area, saved as a Float32 GeoTIFF and,
optionally, rendered into a visual report (colorbar and burn-in pages).

Requirements
------------
- GDAL development headers and runtime available on your system (file-backed
  band providers, mask reading and GeoTIFF output).
- Rust 2024 edition toolchain.

Quick start: process a product directory
----------------------------------------
```rust,no_run
use std::path::Path;
use waterquality::{process_product_to_path, Product, QualityConfig, Registry};

fn main() -> waterquality::Result<()> {
    let config = QualityConfig::from_json_file(Path::new("WaterQuality.json"))?;
    let run = process_product_to_path(
        Path::new("/data/SENTINEL2A_20200101_T31TCJ"),
        Path::new("/masks/SENTINEL2A_20200101_T31TCJ.tif"),
        Path::new("/out/SENTINEL2A_20200101_T31TCJ"),
        Product::S2Theia,
        &config,
        Registry::with_builtins(),
    )?;
    for outcome in run.succeeded() {
        println!("{} -> {:?}", outcome.parameter, outcome.output);
    }
    Ok(())
}
```

Registering your own inversion function
---------------------------------------
```rust
use waterquality::{Registry, Signature};

let mut registry = Registry::with_builtins();
registry
    .register_fn(
        "Turbidity_Dogliotti",
        Signature::new().band("Red").coefficient("a", 228.1).coefficient("c", 0.1641),
        Some("FNU"),
        |inputs| {
            let red = inputs.band("Red")?;
            let a = inputs.coefficient("a")?;
            let c = inputs.coefficient("c")?;
            Ok(red.mapv(|r| a * r / (1.0 - r / c)))
        },
    )
    .unwrap();
assert_eq!(registry.names(), vec!["SPM_Nechad", "Turbidity_Dogliotti"]);
```

In-memory scenes
----------------
```rust
use ndarray::Array2;
use waterquality::core::mask::{WATER, WaterMask};
use waterquality::{process_scene, InMemoryBandProvider, MemorySink, Product, QualityConfig, Registry};

let mask = WaterMask::filled((2, 2), WATER);
let mut bands = InMemoryBandProvider::new(Product::S2Theia)
    .with_band("Red", Array2::from_elem((2, 2), 0.05));
let mut sink = MemorySink::new();
let config = QualityConfig::from_json_str(r#"{"inversion": {}}"#).unwrap();

let run = process_scene(Registry::with_builtins(), &mut bands, &mask, &config, &mut sink, None).unwrap();
assert!(run.parameters.get("SPM_Nechad").is_some());
```

Error handling
--------------
All public functions return `waterquality::Result<T>`; match on
`waterquality::Error` to handle specific cases. The executor itself never
aborts a run: each parameter's failure is logged and kept in its outcome.

Useful modules
--------------
- [`api`]: high-level entry points for scenes, product directories and batches.
- [`core`]: registry, resolver, formula loader, executor, display range, mask, config.
- [`io`]: band providers, GDAL readers and writers.
- [`report`]: report sinks, colormaps and page rendering.
- [`types`]: product catalogs and shared enums.
- [`error`]: crate-level `Error` and `Result`.
"##]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod report;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::{InversionConfig, QualityConfig, ReportConfig};
pub use error::{Error, Result};
pub use types::{NegativeValues, Product};

// Registry and executor
pub use crate::core::executor::{InversionContext, InversionRun, ParameterOutcome, run_inversion};
pub use crate::core::formula::FormulaSpec;
pub use crate::core::limits::{DisplayRange, RangeOptions, display_range};
pub use crate::core::mask::WaterMask;
pub use crate::core::registry::{Descriptor, InversionFunction, Inputs, Registry, Signature};
pub use crate::core::resolver::resolve_bands;

// Band providers and sinks
pub use io::{BandProvider, GdalBandProvider, GeoTiffSaver, InMemoryBandProvider, MemorySink, OutputSink};
pub use report::{ImageReport, MemoryReport, ReportSink};

// High-level API re-exports
pub use api::{
    BatchReport, build_registry, process_directory_to_path, process_product_to_path,
    process_scene,
};
