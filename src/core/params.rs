use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::formula::FormulaSpec;
use crate::core::limits::RangeOptions;
use crate::error::{Error, Result};
use crate::report::colormap::Colormap;
use crate::types::NegativeValues;

fn default_percentile() -> f64 {
    75.0
}

fn default_colormap() -> String {
    "viridis".to_string()
}

fn default_enabled() -> bool {
    true
}

/// Options of the inversion step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InversionConfig {
    #[serde(default = "default_enabled", alias = "inversion")]
    pub enabled: bool,
    /// Restrict the run to these parameters; None runs every registered one
    #[serde(default)]
    pub parameter: Option<Vec<String>>,
    #[serde(default)]
    pub negative_values: NegativeValues,
    #[serde(default)]
    pub min_param_value: Option<f64>,
    #[serde(default)]
    pub max_param_value: Option<f64>,
    #[serde(default = "default_percentile")]
    pub max_param_percentile: f64,
    #[serde(default = "default_colormap")]
    pub colormap: String,
    #[serde(default)]
    pub uniform_distribution: bool,
    /// Formula-based functions added to the registry
    #[serde(default)]
    pub functions: Vec<FormulaSpec>,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            parameter: None,
            negative_values: NegativeValues::Keep,
            min_param_value: None,
            max_param_value: None,
            max_param_percentile: default_percentile(),
            colormap: default_colormap(),
            uniform_distribution: false,
            functions: Vec::new(),
        }
    }
}

impl InversionConfig {
    pub fn range_options(&self) -> RangeOptions {
        RangeOptions {
            max_percentile: self.max_param_percentile,
            min_value: self.min_param_value,
            max_value: self.max_param_value,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.max_param_percentile) {
            return Err(Error::InvalidArgument {
                arg: "max_param_percentile",
                value: self.max_param_percentile.to_string(),
            });
        }
        if let (Some(min), Some(max)) = (self.min_param_value, self.max_param_value) {
            if min > max {
                return Err(Error::InvalidArgument {
                    arg: "min_param_value",
                    value: format!("{} > max_param_value {}", min, max),
                });
            }
        }
        self.colormap.parse::<Colormap>()?;
        Ok(())
    }
}

/// Options of the visual report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Long side of report pages in pixels; None keeps the scene size
    #[serde(default)]
    pub size: Option<usize>,
}

/// Water quality configuration, loaded from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default)]
    pub inversion: Option<InversionConfig>,
    #[serde(default)]
    pub report: ReportConfig,
}

impl QualityConfig {
    pub const FILE_NAME: &'static str = "WaterQuality.json";

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: QualityConfig = serde_json::from_str(text)?;
        if let Some(inv) = &config.inversion {
            inv.validate()?;
        }
        Ok(config)
    }

    /// The inversion section, or `MissingInversionConfig` if absent.
    pub fn inversion(&self) -> Result<&InversionConfig> {
        self.inversion.as_ref().ok_or(Error::MissingInversionConfig)
    }

    /// Configuration written by `--get-config`, with the Nechad formula as an
    /// example of a user-defined function.
    pub fn default_template() -> Self {
        Self {
            inversion: Some(InversionConfig {
                functions: vec![FormulaSpec {
                    parameter: "SPM_Nechad_formula".to_string(),
                    formula: "a * Red / (1 - Red / c)".to_string(),
                    coefficients: [("a".to_string(), 610.94), ("c".to_string(), 0.2324)]
                        .into_iter()
                        .collect(),
                    units: Some("mg/l".to_string()),
                }],
                ..InversionConfig::default()
            }),
            report: ReportConfig {
                enabled: true,
                size: Some(1024),
            },
        }
    }

    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
