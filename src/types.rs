//! Shared types and enums used across the crate.
//! Includes `Product` (with its band catalog) and `NegativeValues`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Satellite products understood by the band loaders.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
pub enum Product {
    #[value(name = "S2_THEIA")]
    #[serde(rename = "S2_THEIA")]
    S2Theia,
    #[value(name = "S2_S2COR")]
    #[serde(rename = "S2_S2COR")]
    S2S2Cor,
    #[value(name = "S2_L1C")]
    #[serde(rename = "S2_L1C")]
    S2L1c,
    #[value(name = "L8_USGS")]
    #[serde(rename = "L8_USGS")]
    L8Usgs,
}

const S2_THEIA_BANDS: &[(&str, &str)] = &[
    ("Blue", "_FRE_B2.tif"),
    ("Green", "_FRE_B3.tif"),
    ("Red", "_FRE_B4.tif"),
    ("RedEdg1", "_FRE_B5.tif"),
    ("RedEdg2", "_FRE_B6.tif"),
    ("RedEdg3", "_FRE_B7.tif"),
    ("Nir", "_FRE_B8.tif"),
    ("Nir2", "_FRE_B8A.tif"),
    ("Mir", "_FRE_B11.tif"),
    ("Mir2", "_FRE_B12.tif"),
];

const S2_S2COR_BANDS: &[(&str, &str)] = &[
    ("Blue", "_B02_10m.jp2"),
    ("Green", "_B03_10m.jp2"),
    ("Red", "_B04_10m.jp2"),
    ("RedEdg1", "_B05_20m.jp2"),
    ("RedEdg2", "_B06_20m.jp2"),
    ("RedEdg3", "_B07_20m.jp2"),
    ("Nir", "_B08_10m.jp2"),
    ("Nir2", "_B8A_20m.jp2"),
    ("Mir", "_B11_20m.jp2"),
    ("Mir2", "_B12_20m.jp2"),
];

const S2_L1C_BANDS: &[(&str, &str)] = &[
    ("Blue", "_B02.jp2"),
    ("Green", "_B03.jp2"),
    ("Red", "_B04.jp2"),
    ("RedEdg1", "_B05.jp2"),
    ("RedEdg2", "_B06.jp2"),
    ("RedEdg3", "_B07.jp2"),
    ("Nir", "_B08.jp2"),
    ("Nir2", "_B8A.jp2"),
    ("Mir", "_B11.jp2"),
    ("Mir2", "_B12.jp2"),
];

const L8_USGS_BANDS: &[(&str, &str)] = &[
    ("Aerosol", "_B1.TIF"),
    ("Blue", "_B2.TIF"),
    ("Green", "_B3.TIF"),
    ("Red", "_B4.TIF"),
    ("Nir", "_B5.TIF"),
    ("Mir", "_B6.TIF"),
    ("Mir2", "_B7.TIF"),
];

impl Product {
    fn bands(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Product::S2Theia => S2_THEIA_BANDS,
            Product::S2S2Cor => S2_S2COR_BANDS,
            Product::S2L1c => S2_L1C_BANDS,
            Product::L8Usgs => L8_USGS_BANDS,
        }
    }

    /// Band catalog: every band name an inversion function may ask for.
    pub fn band_names(&self) -> Vec<&'static str> {
        self.bands().iter().map(|(name, _)| *name).collect()
    }

    pub fn has_band(&self, band: &str) -> bool {
        self.bands().iter().any(|(name, _)| *name == band)
    }

    /// File name suffix identifying `band` inside a product directory.
    pub fn band_suffix(&self, band: &str) -> Option<&'static str> {
        self.bands()
            .iter()
            .find(|(name, _)| *name == band)
            .map(|(_, suffix)| *suffix)
    }

    /// Divisor turning stored digital numbers into surface reflectance.
    pub fn reflectance_scale(&self) -> f64 {
        10_000.0
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Product::S2Theia => "S2_THEIA",
            Product::S2S2Cor => "S2_S2COR",
            Product::S2L1c => "S2_L1C",
            Product::L8Usgs => "L8_USGS",
        };
        write!(f, "{}", s)
    }
}

/// What to do with negative parameter values produced by an inversion function.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeValues {
    /// Leave them untouched
    #[default]
    Keep,
    /// Replace them by the no-data value
    Mask,
    /// Clamp them to zero
    Zero,
}

impl std::fmt::Display for NegativeValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegativeValues::Keep => write!(f, "keep"),
            NegativeValues::Mask => write!(f, "mask"),
            NegativeValues::Zero => write!(f, "zero"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel2_catalog_has_ten_bands() {
        assert_eq!(Product::S2Theia.band_names().len(), 10);
        assert!(Product::S2Theia.has_band("Red"));
        assert!(!Product::S2Theia.has_band("Aerosol"));
        assert!(Product::L8Usgs.has_band("Aerosol"));
    }

    #[test]
    fn landsat_suffixes_do_not_collide() {
        let b1 = Product::L8Usgs.band_suffix("Aerosol").unwrap();
        assert!(!"LC08_X_B11.TIF".ends_with(b1));
        assert!("LC08_X_B1.TIF".ends_with(b1));
    }

    #[test]
    fn product_names_round_trip_through_serde() {
        let json = serde_json::to_string(&Product::S2S2Cor).unwrap();
        assert_eq!(json, "\"S2_S2COR\"");
        let back: Product = serde_json::from_str("\"L8_USGS\"").unwrap();
        assert_eq!(back, Product::L8Usgs);
        assert_eq!(Product::S2L1c.to_string(), "S2_L1C");
    }

    #[test]
    fn negative_values_parse_lowercase() {
        let policy: NegativeValues = serde_json::from_str("\"mask\"").unwrap();
        assert_eq!(policy, NegativeValues::Mask);
        assert_eq!(NegativeValues::default(), NegativeValues::Keep);
    }
}
