//! Core building blocks: the inversion function registry and formula loader,
//! the signature-based band resolver, the inversion executor, the display-range
//! estimator, the water mask and the configuration. These are consumed by the
//! high-level `api` module.
pub mod executor;
pub mod formula;
pub mod functions;
pub mod limits;
pub mod mask;
pub mod params;
pub mod registry;
pub mod resolver;
