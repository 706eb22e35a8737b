//! Built-in inversion functions.
use ndarray::{Array2, Zip};

use crate::core::registry::{Descriptor, Inputs, InversionFunction, Signature};
use crate::error::Result;

/// Suspended particulate matter from red reflectance (Nechad et al., 2010):
/// `spm = a * Red / (1 - Red / c)`.
pub struct Nechad {
    signature: Signature,
}

impl Nechad {
    pub const A: f64 = 610.94;
    pub const C: f64 = 0.2324;

    pub fn new() -> Self {
        Self {
            signature: Signature::new()
                .band("Red")
                .coefficient("a", Self::A)
                .coefficient("c", Self::C),
        }
    }
}

impl Default for Nechad {
    fn default() -> Self {
        Self::new()
    }
}

impl InversionFunction for Nechad {
    fn name(&self) -> &str {
        "nechad"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn invert(&self, inputs: &Inputs<'_>) -> Result<Array2<f64>> {
        let red = inputs.band("Red")?;
        let a = inputs.coefficient("a")?;
        let c = inputs.coefficient("c")?;

        let mut spm = Array2::<f64>::zeros(red.dim());
        Zip::from(&mut spm).and(red).par_for_each(|out, &r| {
            *out = a * r / (1.0 - r / c);
        });
        Ok(spm)
    }
}

/// Descriptors registered by [`Registry::with_builtins`](crate::core::registry::Registry::with_builtins).
pub fn builtins() -> Vec<Descriptor> {
    vec![Descriptor::new("SPM_Nechad", Box::new(Nechad::new())).with_units("mg/l")]
}
