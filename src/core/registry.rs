//! Inversion function registry.
//!
//! An inversion function maps one or more band grids to a water quality
//! parameter grid. Every function declares its inputs through a [`Signature`]:
//! inputs without a default value are band names, inputs with a default are
//! numeric coefficients. The registry keeps one [`Descriptor`] per parameter,
//! in registration order, and is read-only once a run starts.
use std::collections::HashMap;
use std::fmt;

use ndarray::Array2;

use crate::error::{Error, Result};

/// One declared input of an inversion function.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A band consumed by the function, no default
    Band(String),
    /// A coefficient with its default value
    Coefficient { name: String, default: f64 },
}

impl Input {
    pub fn name(&self) -> &str {
        match self {
            Input::Band(name) => name,
            Input::Coefficient { name, .. } => name,
        }
    }

    pub fn default(&self) -> Option<f64> {
        match self {
            Input::Band(_) => None,
            Input::Coefficient { default, .. } => Some(*default),
        }
    }
}

/// Ordered list of inputs declared by an inversion function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    inputs: Vec<Input>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn band(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(Input::Band(name.into()));
        self
    }

    pub fn coefficient(mut self, name: impl Into<String>, default: f64) -> Self {
        self.inputs.push(Input::Coefficient {
            name: name.into(),
            default,
        });
        self
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Names of the inputs without a default, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|i| i.default().is_none())
            .map(Input::name)
            .collect()
    }

    /// Default value of every coefficient.
    pub fn defaults(&self) -> HashMap<String, f64> {
        self.inputs
            .iter()
            .filter_map(|i| i.default().map(|d| (i.name().to_string(), d)))
            .collect()
    }

    pub fn has_coefficient(&self, name: &str) -> bool {
        self.inputs
            .iter()
            .any(|i| matches!(i, Input::Coefficient { name: n, .. } if n == name))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .inputs
            .iter()
            .map(|i| match i {
                Input::Band(name) => name.clone(),
                Input::Coefficient { name, default } => format!("{}={}", name, default),
            })
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Arguments handed to [`InversionFunction::invert`]: the requested bands and
/// the effective coefficient values.
pub struct Inputs<'a> {
    bands: HashMap<String, &'a Array2<f64>>,
    coefficients: HashMap<String, f64>,
}

impl<'a> Inputs<'a> {
    pub fn new(bands: HashMap<String, &'a Array2<f64>>, coefficients: HashMap<String, f64>) -> Self {
        Self {
            bands,
            coefficients,
        }
    }

    pub fn band(&self, name: &str) -> Result<&'a Array2<f64>> {
        self.bands
            .get(name)
            .copied()
            .ok_or_else(|| Error::BandNotLoaded {
                band: name.to_string(),
            })
    }

    pub fn coefficient(&self, name: &str) -> Result<f64> {
        self.coefficients
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidArgument {
                arg: "coefficient",
                value: name.to_string(),
            })
    }
}

/// Capability implemented by every inversion formula.
pub trait InversionFunction: Send + Sync {
    /// Function identity used in logs
    fn name(&self) -> &str;

    fn signature(&self) -> &Signature;

    /// Compute the parameter grid. The result must have the shape of the
    /// input bands.
    fn invert(&self, inputs: &Inputs<'_>) -> Result<Array2<f64>>;
}

type InvertFn = dyn Fn(&Inputs<'_>) -> Result<Array2<f64>> + Send + Sync;

/// Inversion function backed by a closure, for user code registering
/// formulas at start-up.
pub struct FnInversion {
    name: String,
    signature: Signature,
    f: Box<InvertFn>,
}

impl FnInversion {
    pub fn new<F>(name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(&Inputs<'_>) -> Result<Array2<f64>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            f: Box::new(f),
        }
    }
}

impl InversionFunction for FnInversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn invert(&self, inputs: &Inputs<'_>) -> Result<Array2<f64>> {
        (self.f)(inputs)
    }
}

/// A registered parameter: its function, display units and coefficient overrides.
pub struct Descriptor {
    parameter: String,
    function: Box<dyn InversionFunction>,
    units: Option<String>,
    overrides: HashMap<String, f64>,
}

impl Descriptor {
    pub fn new(parameter: impl Into<String>, function: Box<dyn InversionFunction>) -> Self {
        Self {
            parameter: parameter.into(),
            function,
            units: None,
            overrides: HashMap::new(),
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Replace the default of a declared coefficient.
    pub fn with_coefficient(mut self, name: impl Into<String>, value: f64) -> Result<Self> {
        let name = name.into();
        if !self.function.signature().has_coefficient(&name) {
            return Err(Error::InvalidArgument {
                arg: "coefficient",
                value: format!("{} (not declared by {})", name, self.function.name()),
            });
        }
        self.overrides.insert(name, value);
        Ok(self)
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn function(&self) -> &dyn InversionFunction {
        self.function.as_ref()
    }

    pub fn units(&self) -> &str {
        self.units.as_deref().unwrap_or("")
    }

    /// Signature defaults overlaid with the configured overrides.
    pub fn coefficients(&self) -> HashMap<String, f64> {
        let mut values = self.function.signature().defaults();
        for (name, value) in &self.overrides {
            values.insert(name.clone(), *value);
        }
        values
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("parameter", &self.parameter)
            .field("function", &self.function.name())
            .field("signature", self.function.signature())
            .field("units", &self.units)
            .finish()
    }
}

/// Insertion-ordered mapping from parameter name to descriptor.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Descriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in inversion functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in crate::core::functions::builtins() {
            // built-in names are unique
            registry.entries.push(descriptor);
        }
        registry
    }

    /// Add a descriptor. Names are unique: registering an existing parameter
    /// name is rejected.
    pub fn register(&mut self, descriptor: Descriptor) -> Result<()> {
        if self.get(descriptor.parameter()).is_some() {
            return Err(Error::DuplicateParameter {
                name: descriptor.parameter().to_string(),
            });
        }
        self.entries.push(descriptor);
        Ok(())
    }

    /// Register a closure-backed function under `parameter`.
    pub fn register_fn<F>(
        &mut self,
        parameter: &str,
        signature: Signature,
        units: Option<&str>,
        f: F,
    ) -> Result<()>
    where
        F: Fn(&Inputs<'_>) -> Result<Array2<f64>> + Send + Sync + 'static,
    {
        let mut descriptor = Descriptor::new(parameter, Box::new(FnInversion::new(parameter, signature, f)));
        if let Some(u) = units {
            descriptor = descriptor.with_units(u);
        }
        self.register(descriptor)
    }

    pub fn get(&self, parameter: &str) -> Option<&Descriptor> {
        self.entries.iter().find(|d| d.parameter() == parameter)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(Descriptor::parameter).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
