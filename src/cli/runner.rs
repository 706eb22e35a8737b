use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waterquality::api::{process_directory_to_path, process_product_to_path};
use waterquality::core::params::QualityConfig;
use waterquality::core::registry::Registry;

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }
}

fn parse_report_size(size: &str) -> Result<Option<usize>, AppError> {
    if size == "original" {
        return Ok(None);
    }
    let parsed = size.parse::<usize>().map_err(|_| AppError::InvalidSize {
        size: size.to_string(),
    })?;
    if parsed == 0 {
        return Err(AppError::ZeroSize { size: parsed });
    }
    Ok(Some(parsed))
}

/// Explicit `--config`, else `./WaterQuality.json`, else the bundled default.
fn load_config(args: &CliArgs) -> Result<QualityConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.is_file() {
                return Err(AppError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            info!("Using configuration {:?}", path);
            QualityConfig::from_json_file(path)?
        }
        None => {
            let local = PathBuf::from(QualityConfig::FILE_NAME);
            if local.is_file() {
                info!("Using configuration {:?}", local);
                QualityConfig::from_json_file(&local)?
            } else {
                warn!(
                    "No {} found in the working directory, using the default configuration",
                    QualityConfig::FILE_NAME
                );
                QualityConfig::default_template()
            }
        }
    };

    if args.report {
        config.report.enabled = true;
    }
    if let Some(size) = &args.report_size {
        config.report.size = parse_report_size(size)?;
    }
    Ok(config)
}

fn write_default_config(dir: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(QualityConfig::FILE_NAME);
    QualityConfig::default_template().write_json_file(&path)?;
    info!("Default configuration written to {:?}", path);
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    if let Some(dir) = &args.get_config {
        write_default_config(dir)?;
        return Ok(());
    }

    let config = load_config(&args)?;
    let batch_mode = args.batch || args.input_dir.is_some();

    if batch_mode {
        let input_dir = args.input_dir.ok_or(AppError::MissingArgument {
            arg: "--input-dir".to_string(),
        })?;
        let mask_dir = args.mask_dir.ok_or(AppError::MissingArgument {
            arg: "--mask-dir".to_string(),
        })?;
        let output_dir = args.output_dir.ok_or(AppError::MissingArgument {
            arg: "--output-dir".to_string(),
        })?;

        info!("Starting batch processing from directory: {:?}", input_dir);
        info!("Output directory: {:?}", output_dir);

        let report = process_directory_to_path(
            &input_dir,
            &mask_dir,
            &output_dir,
            args.product,
            &config,
            Registry::with_builtins,
            args.batch,
        )?;

        info!("Batch processing complete!");
        info!("Processed: {}", report.processed);
        info!("Skipped: {}", report.skipped);
        info!("Errors: {}", report.errors);
    } else {
        let input = args.input.ok_or(AppError::MissingArgument {
            arg: "--input".to_string(),
        })?;
        let mask = args.mask.ok_or(AppError::MissingArgument {
            arg: "--mask".to_string(),
        })?;
        let output = args.output.ok_or(AppError::MissingArgument {
            arg: "--output".to_string(),
        })?;

        let run = process_product_to_path(
            &input,
            &mask,
            &output,
            args.product,
            &config,
            Registry::with_builtins(),
        )?;
        for (name, err) in run.failed() {
            warn!("{} not computed: {}", name, err);
        }
        info!("Successfully processed: {:?} -> {:?}", input, output);
    }

    Ok(())
}
