//! Measurement inputs for the DisMod-AT cascade: demographic sources, covariate interpolation
//! onto observation windows, the location hierarchy, and formatting of model predictions.

// Re-exports
pub use column_names as COL;
pub use config::Config;
pub use error::{CascadeError, Result};
pub use integrand::{Density, Integrand};
pub use measurement_inputs::{AssembledData, CovariateReference, InputsParams, MeasurementInputs};
pub use settings::Settings;
pub use sources::{InputSource, LocalSource, LocationDag};

// Modules
pub mod column_names;
pub mod config;
pub mod demographics;
pub mod error;
pub mod formatters;
pub mod frame;
pub mod integrand;
pub mod interpolation;
pub mod measure_config;
pub mod measurement_inputs;
pub mod observations;
pub mod predictions;
pub mod settings;
pub mod sources;
