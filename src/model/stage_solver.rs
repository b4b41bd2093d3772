//! Picard iteration for the diagonally-implicit stage equation.
//!
//! Models whose implicit operator is only mildly stiff can delegate
//! [`TendencyModel::solve_implicit_stage`] to [`solve_stage_fixed_point`]
//! instead of writing a dedicated column solver.

use crate::state::ModelState;

use super::{StageSolveError, TendencyModel};

/// Tolerance and iteration cap for [`solve_stage_fixed_point`].
#[derive(Clone, Copy, Debug)]
pub struct StageSolverConfig {
    /// Convergence threshold on the max-norm update, relative to `1 + |stage|`
    pub tolerance: f64,
    /// Maximum number of Picard iterations
    pub max_iterations: usize,
}

impl Default for StageSolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 50,
        }
    }
}

impl StageSolverConfig {
    /// Create a configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

/// Solve `stage = predictor + dt_gamma * F_I(stage)` by fixed-point iteration.
///
/// `workspace` must have the model's layout; it receives the implicit tendency
/// of the last iterate. Returns the number of iterations taken.
///
/// # Errors
/// [`StageSolveError::NotConverged`] when `max_iterations` is reached, or the
/// tendency error if an evaluation fails.
pub fn solve_stage_fixed_point<M: TendencyModel + ?Sized>(
    model: &mut M,
    predictor: &ModelState,
    time: f64,
    dt_gamma: f64,
    stage: &mut ModelState,
    workspace: &mut ModelState,
    config: &StageSolverConfig,
) -> Result<usize, StageSolveError> {
    stage.copy_from(predictor);
    let mut residual = f64::INFINITY;

    for iteration in 1..=config.max_iterations {
        model.implicit_tendency(stage, time, workspace)?;

        let mut max_update: f64 = 0.0;
        let mut max_value: f64 = 0.0;
        for ((s, p), f) in stage
            .arrays_mut()
            .zip(predictor.arrays())
            .zip(workspace.arrays())
        {
            for ((si, pi), fi) in s.iter_mut().zip(p).zip(f) {
                let next = pi + dt_gamma * fi;
                max_update = max_update.max((next - *si).abs());
                max_value = max_value.max(next.abs());
                *si = next;
            }
        }

        residual = max_update / (1.0 + max_value);
        if !residual.is_finite() {
            break;
        }
        if residual <= config.tolerance {
            log::debug!("Fixed-point stage solve converged in {iteration} iterations");
            return Ok(iteration);
        }
    }

    Err(StageSolveError::NotConverged {
        iterations: config.max_iterations,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearSplitModel;
    use crate::state::StateLayout;

    #[test]
    fn test_converges_for_contractive_problem() {
        // |dt_gamma * b| = 0.1 < 1
        let mut model = LinearSplitModel::new(StateLayout::uniform(1, 1, 3), 0.0, 1.0);
        let mut predictor = ModelState::zeros(model.layout());
        predictor.fill(2.0);
        let mut stage = predictor.zeros_like();
        let mut work = predictor.zeros_like();

        let iterations = solve_stage_fixed_point(
            &mut model,
            &predictor,
            0.0,
            0.1,
            &mut stage,
            &mut work,
            &StageSolverConfig::default(),
        )
        .unwrap();

        assert!(iterations > 1);
        let expected = 2.0 / 1.1;
        for array in stage.arrays() {
            for &v in array {
                assert!((v - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_reports_non_convergence() {
        // |dt_gamma * b| = 5 > 1: Picard iteration diverges
        let mut model = LinearSplitModel::new(StateLayout::uniform(1, 0, 2), 0.0, 50.0);
        let mut predictor = ModelState::zeros(model.layout());
        predictor.fill(1.0);
        let mut stage = predictor.zeros_like();
        let mut work = predictor.zeros_like();

        let err = solve_stage_fixed_point(
            &mut model,
            &predictor,
            0.0,
            0.1,
            &mut stage,
            &mut work,
            &StageSolverConfig::new(1e-12, 8),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            StageSolveError::NotConverged { iterations: 8, .. }
        ));
    }
}
