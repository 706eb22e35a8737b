//! High-level, ergonomic library API: run the inversion over a scene held
//! behind the band/output/report seams, process a product directory to files,
//! and batch helpers for directories of products. Prefer these entrypoints over
//! the executor when integrating the crate.
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::core::executor::{InversionContext, InversionRun, run_inversion};
use crate::core::mask::{PARAM_NO_DATA, WaterMask};
use crate::core::params::{InversionConfig, QualityConfig};
use crate::core::registry::Registry;
use crate::error::{Error, Result};
use crate::io::bands::BandProvider;
use crate::io::gdal::{GdalBandProvider, read_water_mask};
use crate::io::writers::{GeoTiffSaver, OutputSink};
use crate::report::{ImageReport, ReportSink};
use crate::types::Product;

/// Sub-directory of the output directory receiving the report pages.
pub const REPORT_DIR: &str = "report";

/// Extend `base` with the formula functions declared in `config`.
///
/// A formula that fails to parse or collides with a registered name is left
/// out and returned with its error; the other formulas are still registered.
pub fn build_registry(
    mut base: Registry,
    config: &InversionConfig,
) -> (Registry, Vec<(String, Error)>) {
    let mut rejected = Vec::new();
    for spec in &config.functions {
        match spec.to_descriptor().and_then(|d| base.register(d)) {
            Ok(()) => info!("Registered formula {} = {}", spec.parameter, spec.formula),
            Err(e) => {
                warn!("Formula {} not registered: {}. Skipping it.", spec.parameter, e);
                rejected.push((spec.parameter.clone(), e));
            }
        }
    }
    (base, rejected)
}

/// Run the inversion over one scene.
///
/// A configuration without inversion section, or with the inversion disabled,
/// yields an empty run. Config formulas that cannot be registered show up as
/// failed outcomes after the registry's own. The report sink, when given, is
/// finished after the last parameter; a finish failure is logged and the run
/// is still returned.
pub fn process_scene(
    registry: Registry,
    bands: &mut dyn BandProvider,
    mask: &WaterMask,
    config: &QualityConfig,
    output: &mut dyn OutputSink,
    mut report: Option<&mut dyn ReportSink>,
) -> Result<InversionRun> {
    let inversion = match config.inversion() {
        Ok(inv) => inv,
        Err(Error::MissingInversionConfig) => {
            warn!("No inversion section found in configuration. Skipping inversion.");
            return Ok(InversionRun::default());
        }
        Err(e) => return Err(e),
    };
    if !inversion.enabled {
        info!("Inversion disabled in configuration");
        return Ok(InversionRun::default());
    }

    let (registry, rejected) = build_registry(registry, inversion);
    info!(
        "Running {} inversion function(s) on {} water pixels",
        registry.len(),
        mask.water_count()
    );

    let mut run = run_inversion(InversionContext {
        mask,
        bands,
        registry: &registry,
        config: inversion,
        output,
        report: report.as_mut().map(|r| &mut **r as &mut dyn ReportSink),
        no_data: PARAM_NO_DATA,
    });

    run.outcomes.extend(rejected.into_iter().map(|(name, e)| (name, Err(e))));

    if let Some(report) = report {
        if let Err(e) = report.finish() {
            warn!("Report not finished: {}", e);
        }
    }
    Ok(run)
}

/// Process one product directory: read the water mask with GDAL, load bands
/// on demand from `input_dir`, write `<parameter>.tif` grids into
/// `output_dir` and, when enabled, the report pages into
/// `output_dir/report`.
pub fn process_product_to_path(
    input_dir: &Path,
    mask_path: &Path,
    output_dir: &Path,
    product: Product,
    config: &QualityConfig,
    registry: Registry,
) -> Result<InversionRun> {
    let (mask, georef) = read_water_mask(mask_path)?;
    let mut bands = GdalBandProvider::open(input_dir, product, mask.dim())?;
    let mut output = GeoTiffSaver::new(output_dir, georef.clone())?;

    let mut report = if config.report.enabled {
        Some(ImageReport::new(
            output_dir.join(REPORT_DIR),
            config.report.size,
            georef,
        )?)
    } else {
        None
    };

    let run = process_scene(
        registry,
        &mut bands,
        &mask,
        config,
        &mut output,
        report.as_mut().map(|r| r as &mut dyn ReportSink),
    )?;
    info!(
        "{:?}: {} parameter(s) computed, {} failed",
        input_dir,
        run.succeeded().count(),
        run.error_count()
    );
    Ok(run)
}

/// Batch processing report
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Return an iterator over immediate subdirectories of `input_dir` (candidate products)
pub fn iterate_products(input_dir: &Path) -> Result<std::vec::IntoIter<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs.into_iter())
}

/// Mask file of a product directory: `<mask_dir>/<product name>.tif`.
pub fn mask_path_for(product_dir: &Path, mask_dir: &Path) -> Option<PathBuf> {
    let name = product_dir.file_name()?.to_string_lossy();
    Some(mask_dir.join(format!("{}.tif", name)))
}

/// Process all product subdirectories of `input_dir` into
/// `output_dir/<product name>`. Products without a mask are skipped.
/// `make_registry` is called once per product.
/// If `continue_on_error` is true, errors are counted in the report and processing continues; otherwise, the first error is returned.
pub fn process_directory_to_path(
    input_dir: &Path,
    mask_dir: &Path,
    output_dir: &Path,
    product: Product,
    config: &QualityConfig,
    make_registry: impl Fn() -> Registry,
    continue_on_error: bool,
) -> Result<BatchReport> {
    std::fs::create_dir_all(output_dir)?;

    let mut report = BatchReport::default();

    for path in iterate_products(input_dir)? {
        let Some(mask_path) = mask_path_for(&path, mask_dir).filter(|p| p.is_file()) else {
            warn!("No water mask for {:?} in {:?}, skipping", path, mask_dir);
            report.skipped += 1;
            continue;
        };
        let Some(name) = path.file_name() else {
            report.skipped += 1;
            continue;
        };
        let product_output = output_dir.join(name);

        info!("Processing: {:?} -> {:?}", path, product_output);
        match process_product_to_path(
            &path,
            &mask_path,
            &product_output,
            product,
            config,
            make_registry(),
        ) {
            Ok(_) => report.processed += 1,
            Err(e) => {
                error!("Error processing {:?}: {}", path, e);
                report.errors += 1;
                if !continue_on_error {
                    return Err(e);
                }
            }
        }
    }

    Ok(report)
}
