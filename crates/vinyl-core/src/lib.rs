//! Calculator abstraction layer for composable simulation backengines.
//!
//! A calculator consumes a collection of typed datasets, applies a named
//! parameter set, and produces typed output datasets. This crate provides
//! the validated entity model, the derivation (parameterized clone)
//! operator, versioned snapshot persistence, and the capability trait
//! concrete calculators implement (`init_parameters` / `backengine`).
//! Everything above a single calculator, such as instrument pipelines,
//! lives elsewhere.

pub mod calculator;
pub mod data;
pub mod domain;
pub mod parameters;

pub use calculator::{
    Calculator, CalculatorBuilder, CalculatorEntity, DeriveOverrides, FilenameSpec, InputSpec,
    KeySpec, SNAPSHOT_SUFFIX, TypeSpec,
};
pub use data::{Dataset, DatasetCollection, DatasetPayload, DatasetType};
pub use domain::{BackengineStatus, VinylError, VinylErrorKind, VinylResult};
pub use parameters::{Interval, Parameter, ParameterSet, ParameterValue};
