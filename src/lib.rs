//! # imex-ts
//!
//! Implicit-explicit time integration for atmospheric dynamical cores.
//!
//! The dynamical core supplies split tendencies (a non-stiff part treated
//! explicitly, a stiff part treated implicitly) and a diagonally-implicit
//! stage solver; this crate advances the model state with them:
//!
//! - State storage: component and tracer arrays, data instances, and the
//!   bridge to flat solver vectors
//! - Butcher tables: ARS IMEX pairs and an id-addressed catalogue of
//!   explicit and diagonally-implicit methods with embeddings
//! - Time stepping (fixed ARS(3,4,3) and an adaptive additive Runge-Kutta
//!   stepper) behind a common scheme interface
//! - An adaptive ARK engine with Newton-GMRES and Anderson-accelerated
//!   fixed-point stage solvers
//!
//! ```
//! use imex_ts::{Ars343, LinearSplitModel, ModelState, TimestepScheme, run_simulation};
//!
//! let mut scheme = Ars343::new();
//! let mut storage = scheme.allocate_storage(ModelState::from_arrays(vec![vec![1.0]], vec![]));
//! let mut model = LinearSplitModel::scalar(1.0, 2.0);
//!
//! let summary = run_simulation(&mut scheme, &mut model, &mut storage, 0.0, 1.0, 0.05).unwrap();
//! assert_eq!(summary.n_steps, 20);
//! assert!((storage.state().components[0][0] - (-3.0f64).exp()).abs() < 1e-5);
//! ```

pub mod ark;
pub mod model;
pub mod nvector;
pub mod state;
pub mod tableau;
pub mod time;
pub mod types;

// Re-export main types for convenience
pub use ark::{ArkError, ArkMethod, ArkOptions, ArkRhs, ArkStats, ArkStep, NonlinearMethod, RhsStatus};
pub use model::{LinearSplitModel, StageSolveError, TendencyError, TendencyModel};
pub use nvector::{NVector, SerialVector};
pub use state::{BridgeError, ModelState, StateLayout, StateStorage, StateVectorBridge, StorageError};
pub use tableau::{ButcherTable, ImexPair, TableKind, TableauError};
pub use time::{
    AdaptiveImexConfig, AdaptiveImexStepper, Ars343, BoxedScheme, ConfigError, IntegrationMode,
    SchemeInfo, SchemeKind, SimulationSummary, TimestepError, TimestepScheme,
    create_timestep_scheme, run_simulation, run_simulation_with,
};
pub use types::{InstanceIndex, StageIndex};
