//! Common contract of the time-stepping schemes.
//!
//! [`SchemeInfo`] carries static facts about a scheme and is usable without a
//! model at hand. [`TimestepScheme`] adds the instance-count contract and the
//! `step` entry point called once per outer model iteration.
//!
//! Both traits are dyn-compatible so the driver can select a scheme once at
//! start-up and hold it as a `Box<dyn TimestepScheme>`.

use crate::model::TendencyModel;
use crate::state::{ModelState, StateStorage};

use super::error::TimestepError;

// =============================================================================
// SchemeInfo Trait (dyn-compatible)
// =============================================================================

/// Static information about a time-stepping scheme.
pub trait SchemeInfo: Send {
    /// Human-readable name for debugging and logging.
    fn name(&self) -> &'static str;

    /// Order of accuracy.
    fn order(&self) -> usize;

    /// Number of Runge-Kutta stages (including an explicit first stage).
    fn n_stages(&self) -> usize;

    /// Stage times relative to the step start.
    ///
    /// For ARS(3,4,3): [0, γ dt, (1+γ)/2 dt, dt]
    fn stage_times(&self, dt: f64) -> Vec<f64>;
}

// =============================================================================
// TimestepScheme Trait
// =============================================================================

/// A scheme advancing the model state by one outer time step.
///
/// # Contract
///
/// - The model allocates at least [`component_data_instances`] component and
///   [`tracer_data_instances`] tracer instances before the first `step`.
/// - `step` is called with monotonically increasing `time`; on success the
///   live state (instance 0) holds the state at `time + dt`.
/// - `is_first` marks the first call of a run (one-time setup);
///   `is_last` is informational.
///
/// [`component_data_instances`]: TimestepScheme::component_data_instances
/// [`tracer_data_instances`]: TimestepScheme::tracer_data_instances
pub trait TimestepScheme: SchemeInfo {
    /// Number of full component-state instances the scheme uses.
    fn component_data_instances(&self) -> usize;

    /// Number of full tracer-state instances the scheme uses.
    fn tracer_data_instances(&self) -> usize;

    /// Advance the live state from `time` to `time + dt`.
    fn step(
        &mut self,
        model: &mut dyn TendencyModel,
        storage: &mut StateStorage,
        is_first: bool,
        is_last: bool,
        time: f64,
        dt: f64,
    ) -> Result<(), TimestepError>;

    /// Wrap an initial state in storage sized for this scheme.
    fn allocate_storage(&self, state: ModelState) -> StateStorage {
        StateStorage::from_state(
            state,
            self.component_data_instances(),
            self.tracer_data_instances(),
        )
    }
}

/// Type alias for a runtime-selected scheme.
pub type BoxedScheme = Box<dyn TimestepScheme>;
