//! Water mask: class 1 is water, 0 non-water, 255 no-data. Parameter cells
//! outside water take the no-data sentinel.
use ndarray::{Array2, Zip};

/// Canonical class of a water pixel.
pub const WATER: u8 = 1;
/// Canonical class of a dry pixel.
pub const NON_WATER: u8 = 0;
/// Canonical class of a pixel without data.
pub const NO_DATA: u8 = 255;

/// Value written to parameter cells outside the water area.
pub const PARAM_NO_DATA: f64 = -9999.0;

/// Per-pixel water classification aligned with the scene bands.
///
/// Classes are stored as `1` (water), `0` (non-water) and `255` (no-data).
/// Only class `1` counts as water; the other two are treated the same when
/// masking parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterMask {
    classes: Array2<u8>,
}

impl WaterMask {
    /// Wrap an already canonical class grid. Any value other than `1` or `0`
    /// is normalized to no-data.
    pub fn new(classes: Array2<u8>) -> Self {
        let classes = classes.mapv(|c| match c {
            WATER | NON_WATER => c,
            _ => NO_DATA,
        });
        Self { classes }
    }

    /// Build a mask from a raw raster. `1` is water, `0` is non-water, and
    /// everything else (`-1`, `255`, NaN, the raster nodata value) is no-data.
    pub fn from_raw(raw: &Array2<f64>) -> Self {
        let classes = raw.mapv(|v| {
            if v == 1.0 {
                WATER
            } else if v == 0.0 {
                NON_WATER
            } else {
                NO_DATA
            }
        });
        Self { classes }
    }

    /// Mask where every pixel has the same class.
    pub fn filled(shape: (usize, usize), class: u8) -> Self {
        Self::new(Array2::from_elem(shape, class))
    }

    pub fn dim(&self) -> (usize, usize) {
        self.classes.dim()
    }

    pub fn classes(&self) -> &Array2<u8> {
        &self.classes
    }

    pub fn is_water(&self, row: usize, col: usize) -> bool {
        self.classes[(row, col)] == WATER
    }

    pub fn water_count(&self) -> usize {
        self.classes.iter().filter(|&&c| c == WATER).count()
    }

    /// Overwrite every non-water cell of `parameter` with `no_data`.
    pub fn apply(&self, parameter: &mut Array2<f64>, no_data: f64) {
        Zip::from(parameter)
            .and(&self.classes)
            .par_for_each(|value, &class| {
                if class != WATER {
                    *value = no_data;
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn legacy_minus_one_is_no_data() {
        let raw = array![[1.0, 0.0], [-1.0, 255.0]];
        let mask = WaterMask::from_raw(&raw);
        assert_eq!(mask.classes(), &array![[WATER, NON_WATER], [NO_DATA, NO_DATA]]);
        assert_eq!(mask.water_count(), 1);
    }

    #[test]
    fn apply_keeps_only_water_cells() {
        let mask = WaterMask::new(array![[1, 0], [255, 1]]);
        let mut param = array![[3.0, 4.0], [5.0, 6.0]];
        mask.apply(&mut param, PARAM_NO_DATA);
        assert_eq!(param, array![[3.0, PARAM_NO_DATA], [PARAM_NO_DATA, 6.0]]);
    }

    #[test]
    fn unknown_classes_become_no_data() {
        let mask = WaterMask::new(array![[7, 1]]);
        assert_eq!(mask.classes(), &array![[NO_DATA, WATER]]);
        assert!(mask.is_water(0, 1));
    }
}
