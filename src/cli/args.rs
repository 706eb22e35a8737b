use clap::Parser;
use std::path::PathBuf;

use waterquality::types::Product;

#[derive(Parser)]
#[command(
    name = "waterquality",
    version,
    about = "Water quality parameters from optical reflectance and a water mask"
)]
pub struct CliArgs {
    /// Input product directory holding the band files (single product mode)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Water mask GeoTIFF of the product (single product mode)
    #[arg(short, long)]
    pub mask: Option<PathBuf>,

    /// Output directory for parameter GeoTIFFs and report (single product mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Input directory containing product subdirectories (batch mode)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory of water masks named `<product>.tif` (batch mode)
    #[arg(long)]
    pub mask_dir: Option<PathBuf>,

    /// Output directory for batch processing, one subdirectory per product (batch mode)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Product type, selects the band catalog and file suffixes
    #[arg(short, long, value_enum, default_value_t = Product::S2Theia)]
    pub product: Product,

    /// JSON configuration file (defaults to ./WaterQuality.json when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Produce the visual report regardless of the configuration
    #[arg(long, default_value_t = false)]
    pub report: bool,

    /// Long side of report pages in pixels. Options:
    /// - Custom: any positive integer (e.g., 1024)
    /// - Original: "original" (no scaling)
    #[arg(long)]
    pub report_size: Option<String>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,

    /// Batch mode: continue processing other products when one fails
    #[arg(long, default_value_t = false)]
    pub batch: bool,

    /// Write the default configuration to <DIR>/WaterQuality.json and exit
    #[arg(long, value_name = "DIR")]
    pub get_config: Option<PathBuf>,
}
