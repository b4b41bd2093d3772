//! Time-stepping schemes.
//!
//! Two schemes implement [`TimestepScheme`]:
//!
//! - [`Ars343`]: fixed-step ARS(3,4,3) IMEX Runge-Kutta with the implicit
//!   stage solve delegated to the model
//! - [`AdaptiveImexStepper`]: adaptive additive Runge-Kutta built on
//!   [`crate::ark::ArkStep`]
//!
//! A scheme is chosen once at start-up ([`create_timestep_scheme`]) and
//! driven by [`run_simulation`] or by the model's own loop.

pub mod adaptive_imex;
pub mod ars343;
pub mod config;
pub mod driver;
pub mod error;
pub mod scheme;

pub use adaptive_imex::AdaptiveImexStepper;
pub use ars343::Ars343;
pub use config::{AdaptiveImexConfig, ConfigError, IntegrationMode, ResolvedArkConfig};
pub use driver::{
    SchemeKind, SimulationSummary, create_timestep_scheme, run_simulation, run_simulation_with,
};
pub use error::TimestepError;
pub use scheme::{BoxedScheme, SchemeInfo, TimestepScheme};
