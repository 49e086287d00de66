//! Core library for powercalc.
//!
//! - `calculators`: the registry of electrical calculators the form offers
//! - `assets`: versioned offline cache of the application's static assets
//! - `config`: configuration file and environment overrides
//! - `utils`: numeric parsing and display helpers

pub mod assets;
pub mod calculators;
pub mod config;
pub mod utils;

pub use assets::{AssetCacheManager, AssetError, AssetWorker, LifecycleState, WorkerEvent};
pub use calculators::{CalcError, Calculator, CalculatorSpec};
pub use config::Config;
