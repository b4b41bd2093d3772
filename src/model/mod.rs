//! Collaborator contract between the time steppers and the model.
//!
//! The steppers never see spatial operators. Everything they need from the
//! dynamical core goes through [`TendencyModel`]:
//!
//! - explicit (non-stiff) tendency, e.g. horizontal dynamics
//! - implicit (stiff) tendency, e.g. vertically propagating acoustic terms
//! - full tendency (explicit + implicit)
//! - the diagonally-implicit stage solve `stage = predictor + dtγ F_I(stage)`
//!
//! Halo exchange and any data-parallel work happen inside these calls; by the
//! time a routine returns, its output is assumed globally consistent.

pub mod linear;
pub mod stage_solver;

pub use linear::LinearSplitModel;
pub use stage_solver::{StageSolverConfig, solve_stage_fixed_point};

use thiserror::Error;

use crate::state::{ModelState, StateLayout};

/// Failure of a tendency evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TendencyError {
    /// The evaluation failed but a smaller step may succeed
    /// (e.g. a negative density in a trial stage).
    #[error("Recoverable tendency failure: {0}")]
    Recoverable(String),

    /// The evaluation failed and the run cannot continue.
    #[error("Tendency evaluation failed: {0}")]
    Unrecoverable(String),
}

impl TendencyError {
    /// Whether the adaptive solver may retry with a smaller step.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TendencyError::Recoverable(_))
    }
}

/// Failure of the collaborator's implicit stage solve.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageSolveError {
    /// Iteration cap reached without meeting the tolerance.
    #[error("Implicit stage solve did not converge after {iterations} iterations (residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },

    /// A tendency evaluation inside the solve failed.
    #[error(transparent)]
    Tendency(#[from] TendencyError),
}

/// Tendency routines and stage solver supplied by the dynamical core.
///
/// All routines write into caller-provided output states of the model's
/// layout; the steppers never allocate in the per-step path.
pub trait TendencyModel {
    /// Shape of the model state.
    fn layout(&self) -> &StateLayout;

    /// Evaluate the explicit (non-stiff) tendency at `state`, `time`.
    fn explicit_tendency(
        &mut self,
        state: &ModelState,
        time: f64,
        tendency: &mut ModelState,
    ) -> Result<(), TendencyError>;

    /// Evaluate the implicit (stiff) tendency at `state`, `time`.
    fn implicit_tendency(
        &mut self,
        state: &ModelState,
        time: f64,
        tendency: &mut ModelState,
    ) -> Result<(), TendencyError>;

    /// Evaluate the full tendency (explicit + implicit).
    ///
    /// The default sums the two split tendencies using a temporary state;
    /// models with a fused operator should override it.
    fn full_tendency(
        &mut self,
        state: &ModelState,
        time: f64,
        tendency: &mut ModelState,
    ) -> Result<(), TendencyError> {
        self.explicit_tendency(state, time, tendency)?;
        let mut implicit = tendency.zeros_like();
        self.implicit_tendency(state, time, &mut implicit)?;
        tendency.axpy(1.0, &implicit);
        Ok(())
    }

    /// Solve `stage = predictor + dt_gamma * F_I(stage, time)` for `stage`.
    fn solve_implicit_stage(
        &mut self,
        predictor: &ModelState,
        time: f64,
        dt_gamma: f64,
        stage: &mut ModelState,
    ) -> Result<(), StageSolveError>;
}
