//! Band resolution: which bands an inversion function consumes, checked
//! against the band catalog of the active product.
use crate::core::registry::InversionFunction;
use crate::error::{Error, Result};
use crate::types::Product;

/// Return the bands required by `function`, in declaration order.
///
/// Every input declared without a default is a band name and must be part of
/// the catalog of `product`.
pub fn resolve_bands(function: &dyn InversionFunction, product: Product) -> Result<Vec<String>> {
    let bands: Vec<String> = function
        .signature()
        .required()
        .into_iter()
        .map(str::to_string)
        .collect();

    for band in &bands {
        if !product.has_band(band) {
            return Err(Error::BandNotAvailable {
                band: band.clone(),
                product,
            });
        }
    }

    Ok(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::Nechad;
    use crate::core::registry::{FnInversion, Signature};

    #[test]
    fn nechad_requires_only_red() {
        let bands = resolve_bands(&Nechad::new(), Product::S2Theia).unwrap();
        assert_eq!(bands, vec!["Red".to_string()]);
    }

    #[test]
    fn order_follows_declaration() {
        let f = FnInversion::new(
            "ndci",
            Signature::new().band("RedEdg1").coefficient("k", 1.0).band("Red"),
            |inputs| Ok(inputs.band("Red")?.clone()),
        );
        let bands = resolve_bands(&f, Product::S2L1c).unwrap();
        assert_eq!(bands, vec!["RedEdg1".to_string(), "Red".to_string()]);
    }

    #[test]
    fn unknown_band_names_the_product() {
        let f = FnInversion::new("edge", Signature::new().band("RedEdg1"), |inputs| {
            Ok(inputs.band("RedEdg1")?.clone())
        });
        let err = resolve_bands(&f, Product::L8Usgs).unwrap_err();
        assert_eq!(err.to_string(), "Band RedEdg1 not available in product L8_USGS");
    }
}
