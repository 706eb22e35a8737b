//! Inversion executor.
//!
//! For every registered parameter, in registry order: resolve the bands the
//! function declares, have the band provider load them, invoke the function,
//! mask the result to the water area, keep it in the run results, save it,
//! and optionally append colorbar and burn-in pages to the report.
//!
//! A failure in one parameter is logged and recorded in its outcome; the
//! remaining parameters still run.
use std::collections::HashMap;
use std::path::PathBuf;

use ndarray::Array2;
use tracing::{info, warn};

use crate::core::limits::{DisplayRange, display_range};
use crate::core::mask::WaterMask;
use crate::core::params::InversionConfig;
use crate::core::registry::{Descriptor, Inputs, Registry};
use crate::core::resolver::resolve_bands;
use crate::error::{Error, Result};
use crate::io::bands::BandProvider;
use crate::io::writers::OutputSink;
use crate::report::ReportSink;
use crate::report::colormap::Colormap;
use crate::types::NegativeValues;

/// Everything one run works on. The executor has exclusive use of the
/// provider and sinks for the duration of the run.
pub struct InversionContext<'a> {
    pub mask: &'a WaterMask,
    pub bands: &'a mut dyn BandProvider,
    pub registry: &'a Registry,
    pub config: &'a InversionConfig,
    pub output: &'a mut dyn OutputSink,
    pub report: Option<&'a mut dyn ReportSink>,
    pub no_data: f64,
}

/// Successful processing of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterOutcome {
    pub parameter: String,
    pub function: String,
    pub bands: Vec<String>,
    pub output: PathBuf,
    pub valid_pixels: usize,
    /// Present when a report was produced
    pub display_range: Option<DisplayRange>,
}

/// Masked parameter grids of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityParameters {
    entries: Vec<(String, Array2<f64>)>,
}

impl QualityParameters {
    fn insert(&mut self, name: &str, data: Array2<f64>) -> &Array2<f64> {
        self.entries.retain(|(n, _)| n != name);
        self.entries.push((name.to_string(), data));
        &self.entries[self.entries.len() - 1].1
    }

    pub fn get(&self, name: &str) -> Option<&Array2<f64>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array2<f64>)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a run: one outcome per attempted parameter and the grids that
/// were computed.
#[derive(Debug, Default)]
pub struct InversionRun {
    pub outcomes: Vec<(String, Result<ParameterOutcome>)>,
    pub parameters: QualityParameters,
}

impl InversionRun {
    pub fn succeeded(&self) -> impl Iterator<Item = &ParameterOutcome> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    pub fn outcome(&self, parameter: &str) -> Option<&Result<ParameterOutcome>> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, r)| r)
    }

    pub fn error_count(&self) -> usize {
        self.failed().count()
    }
}

/// Replace non-finite values by `no_data` and apply the negative-value policy.
pub fn sanitize(parameter: &mut Array2<f64>, no_data: f64, policy: NegativeValues) {
    parameter.par_mapv_inplace(|v| {
        if !v.is_finite() {
            no_data
        } else if v < 0.0 && v != no_data {
            match policy {
                NegativeValues::Keep => v,
                NegativeValues::Mask => no_data,
                NegativeValues::Zero => 0.0,
            }
        } else {
            v
        }
    });
}

/// Descriptors selected by the `parameter` option, in registry order.
/// Names in the option that are not registered come back as errors.
fn select<'r>(
    registry: &'r Registry,
    config: &InversionConfig,
) -> (Vec<&'r Descriptor>, Vec<(String, Error)>) {
    match &config.parameter {
        None => (registry.iter().collect(), Vec::new()),
        Some(wanted) => {
            let selected = registry
                .iter()
                .filter(|d| wanted.iter().any(|w| w == d.parameter()))
                .collect();
            let unknown = wanted
                .iter()
                .filter(|w| registry.get(w).is_none())
                .map(|w| (w.clone(), Error::UnknownParameter { name: w.clone() }))
                .collect();
            (selected, unknown)
        }
    }
}

/// Compute the masked grid of one parameter.
fn compute(
    descriptor: &Descriptor,
    mask: &WaterMask,
    bands: &mut dyn BandProvider,
    no_data: f64,
    policy: NegativeValues,
) -> Result<(Vec<String>, Array2<f64>)> {
    let function = descriptor.function();
    let names = resolve_bands(function, bands.product())?;
    bands.ensure_loaded(&names)?;

    let provider: &dyn BandProvider = &*bands;
    let mut args = HashMap::with_capacity(names.len());
    for name in &names {
        args.insert(name.clone(), provider.band(name)?);
    }
    let inputs = Inputs::new(args, descriptor.coefficients());

    let mut parameter = function.invert(&inputs).map_err(|e| match e {
        Error::InversionFunction { .. } | Error::ShapeMismatch { .. } => e,
        other => Error::InversionFunction {
            function: function.name().to_string(),
            reason: other.to_string(),
        },
    })?;

    if parameter.dim() != mask.dim() {
        return Err(Error::ShapeMismatch {
            expected: mask.dim(),
            actual: parameter.dim(),
        });
    }

    sanitize(&mut parameter, no_data, policy);
    mask.apply(&mut parameter, no_data);
    Ok((names, parameter))
}

fn process(
    descriptor: &Descriptor,
    ctx: &mut InversionContext<'_>,
    colormap: Colormap,
    parameters: &mut QualityParameters,
) -> Result<ParameterOutcome> {
    let name = descriptor.parameter();
    let (bands, parameter) = compute(
        descriptor,
        ctx.mask,
        &mut *ctx.bands,
        ctx.no_data,
        ctx.config.negative_values,
    )?;
    let valid_pixels = parameter.iter().filter(|&&v| v != ctx.no_data).count();

    let parameter = parameters.insert(name, parameter);

    let output = ctx.output.save_array(parameter, name, ctx.no_data)?;

    let display_range = match ctx.report.as_deref_mut() {
        Some(report) => {
            let range = display_range(name, parameter, ctx.no_data, &ctx.config.range_options())?;
            report.append_colorbar(name, colormap, range.min, range.max, descriptor.units())?;
            report.append_burn_in(
                name,
                parameter,
                colormap,
                range.min,
                range.max,
                ctx.no_data,
                ctx.config.uniform_distribution,
            )?;
            Some(range)
        }
        None => None,
    };

    Ok(ParameterOutcome {
        parameter: name.to_string(),
        function: descriptor.function().name().to_string(),
        bands,
        output,
        valid_pixels,
        display_range,
    })
}

/// Run every selected inversion function over the scene.
///
/// Never fails as a whole: each parameter's error is logged and stored in
/// its outcome.
pub fn run_inversion(mut ctx: InversionContext<'_>) -> InversionRun {
    let colormap = ctx.config.colormap.parse::<Colormap>().unwrap_or_else(|e| {
        warn!("{}; using {}", e, Colormap::default());
        Colormap::default()
    });

    let mut run = InversionRun::default();
    let (selected, unknown) = select(ctx.registry, ctx.config);
    for (name, err) in unknown {
        warn!("{}. Skipping it.", err);
        run.outcomes.push((name, Err(err)));
    }

    for descriptor in selected {
        let name = descriptor.parameter();
        info!("Calculating {} parameter.", name);

        let outcome = process(descriptor, &mut ctx, colormap, &mut run.parameters);
        match &outcome {
            Ok(o) => info!(
                "{}: {} valid pixels from bands {:?}",
                name, o.valid_pixels, o.bands
            ),
            Err(e) => warn!(
                "Error processing function {} for parameter {}: {}. Skipping it.",
                descriptor.function().name(),
                name,
                e
            ),
        }
        run.outcomes.push((name.to_string(), outcome));
    }

    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mask::{NON_WATER, PARAM_NO_DATA, WATER};
    use crate::core::registry::Signature;
    use crate::io::bands::InMemoryBandProvider;
    use crate::io::writers::MemorySink;
    use crate::report::MemoryReport;
    use crate::types::Product;
    use ndarray::array;

    fn provider(red: f64) -> InMemoryBandProvider {
        InMemoryBandProvider::new(Product::S2Theia).with_band("Red", Array2::from_elem((3, 4), red))
    }

    fn run(
        registry: &Registry,
        mask: &WaterMask,
        bands: &mut InMemoryBandProvider,
        config: &InversionConfig,
        report: Option<&mut MemoryReport>,
    ) -> (InversionRun, MemorySink) {
        let mut sink = MemorySink::new();
        let run = run_inversion(InversionContext {
            mask,
            bands,
            registry,
            config,
            output: &mut sink,
            report: report.map(|r| r as &mut dyn ReportSink),
            no_data: PARAM_NO_DATA,
        });
        (run, sink)
    }

    #[test]
    fn sanitize_policies() {
        let base = array![[-1.0, f64::NAN, 2.0, PARAM_NO_DATA, f64::INFINITY]];

        let mut keep = base.clone();
        sanitize(&mut keep, PARAM_NO_DATA, NegativeValues::Keep);
        assert_eq!(keep, array![[-1.0, PARAM_NO_DATA, 2.0, PARAM_NO_DATA, PARAM_NO_DATA]]);

        let mut masked = base.clone();
        sanitize(&mut masked, PARAM_NO_DATA, NegativeValues::Mask);
        assert_eq!(masked[(0, 0)], PARAM_NO_DATA);

        let mut zeroed = base;
        sanitize(&mut zeroed, PARAM_NO_DATA, NegativeValues::Zero);
        assert_eq!(zeroed, array![[0.0, PARAM_NO_DATA, 2.0, PARAM_NO_DATA, PARAM_NO_DATA]]);
    }

    #[test]
    fn partial_mask_sets_sentinel_outside_water() {
        let registry = Registry::with_builtins();
        let mut classes = Array2::from_elem((3, 4), WATER);
        classes[(0, 0)] = NON_WATER;
        classes[(2, 3)] = 255;
        let mask = WaterMask::new(classes);
        let mut bands = provider(0.05);

        let (run, sink) = run(&registry, &mask, &mut bands, &InversionConfig::default(), None);
        let spm = run.parameters.get("SPM_Nechad").unwrap();
        assert_eq!(spm[(0, 0)], PARAM_NO_DATA);
        assert_eq!(spm[(2, 3)], PARAM_NO_DATA);
        assert!((spm[(1, 1)] - 38.9206).abs() < 1e-3);

        let outcome = run.outcome("SPM_Nechad").unwrap().as_ref().unwrap();
        assert_eq!(outcome.valid_pixels, 10);
        assert_eq!(outcome.function, "nechad");
        assert_eq!(outcome.display_range, None);
        assert_eq!(sink.get("SPM_Nechad").unwrap().no_data, PARAM_NO_DATA);
    }

    #[test]
    fn shape_mismatch_is_detected() {
        let mut registry = Registry::new();
        registry
            .register_fn("Tiny", Signature::new().band("Red"), None, |_| {
                Ok(Array2::zeros((1, 1)))
            })
            .unwrap();
        let mask = WaterMask::filled((3, 4), WATER);
        let mut bands = provider(0.1);

        let (run, sink) = run(&registry, &mask, &mut bands, &InversionConfig::default(), None);
        let err = run.outcome("Tiny").unwrap().as_ref().unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: (3, 4), actual: (1, 1) }));
        assert!(run.parameters.is_empty());
        assert!(sink.saved.is_empty());
    }

    #[test]
    fn parameter_option_filters_and_reports_unknown_names() {
        let mut registry = Registry::with_builtins();
        registry
            .register_fn("Double", Signature::new().band("Red"), None, |inputs| {
                Ok(inputs.band("Red")?.mapv(|v| v * 2.0))
            })
            .unwrap();
        let config = InversionConfig {
            parameter: Some(vec!["Double".to_string(), "Chl".to_string()]),
            ..InversionConfig::default()
        };
        let mask = WaterMask::filled((3, 4), WATER);
        let mut bands = provider(0.1);

        let (run, _) = run(&registry, &mask, &mut bands, &config, None);
        assert_eq!(run.parameters.names(), vec!["Double"]);
        assert!(matches!(
            run.outcome("Chl").unwrap(),
            Err(Error::UnknownParameter { .. })
        ));
        assert!(run.outcome("SPM_Nechad").is_none());
    }

    #[test]
    fn report_failure_keeps_saved_array() {
        // Everything masked: saving works, the display range has no data.
        let registry = Registry::with_builtins();
        let mask = WaterMask::filled((3, 4), NON_WATER);
        let mut bands = provider(0.05);
        let mut report = MemoryReport::new();

        let (run, sink) = run(
            &registry,
            &mask,
            &mut bands,
            &InversionConfig::default(),
            Some(&mut report),
        );
        assert!(matches!(
            run.outcome("SPM_Nechad").unwrap(),
            Err(Error::NoValidData { .. })
        ));
        assert!(run.parameters.get("SPM_Nechad").is_some());
        assert_eq!(sink.saved.len(), 1);
        assert!(report.pages().is_empty());
    }

    #[test]
    fn user_errors_are_wrapped_with_function_name() {
        let mut registry = Registry::new();
        registry
            .register_fn("Bad", Signature::new().band("Red"), None, |inputs| {
                inputs.coefficient("missing")?;
                unreachable!()
            })
            .unwrap();
        let mask = WaterMask::filled((3, 4), WATER);
        let mut bands = provider(0.05);

        let (run, _) = run(&registry, &mask, &mut bands, &InversionConfig::default(), None);
        let err = run.outcome("Bad").unwrap().as_ref().unwrap_err();
        assert!(matches!(err, Error::InversionFunction { function, .. } if function == "Bad"));
    }
}
