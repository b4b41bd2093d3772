//! Time-stepping errors.

use thiserror::Error;

use crate::ark::ArkError;
use crate::model::{StageSolveError, TendencyError};
use crate::state::{BridgeError, StorageError};
use crate::types::StageIndex;

use super::config::ConfigError;

/// Fatal failure of a time step.
///
/// None of these are retried by the schemes; they propagate to the driver,
/// which ends the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimestepError {
    /// Invalid scheme or solver configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The collaborator's implicit stage solve did not converge.
    #[error("Implicit solve failed in stage {stage} at t = {time}: {source}")]
    Convergence {
        stage: StageIndex,
        time: f64,
        #[source]
        source: StageSolveError,
    },

    /// A tendency evaluation failed.
    #[error("Tendency evaluation failed in stage {stage} at t = {time}: {source}")]
    Tendency {
        stage: StageIndex,
        time: f64,
        #[source]
        source: TendencyError,
    },

    /// The adaptive solver returned a failure code.
    #[error("Adaptive solver failed with code {code}: {reason}")]
    Solver { code: i32, reason: String },

    /// The model did not allocate the data instances the scheme needs.
    #[error(transparent)]
    InsufficientInstances(#[from] StorageError),

    /// State could not be moved to or from the solver vector.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl TimestepError {
    /// Whether the failure is a nonlinear or stage-solve convergence failure.
    pub fn is_convergence_failure(&self) -> bool {
        // -4: ArkError::ConvFailure
        matches!(
            self,
            TimestepError::Convergence { .. } | TimestepError::Solver { code: -4, .. }
        )
    }

    /// Stage-solve failure raised while solving `stage` at `time`.
    pub(crate) fn stage_solve(stage: usize, time: f64, err: StageSolveError) -> Self {
        match err {
            StageSolveError::Tendency(source) => TimestepError::Tendency {
                stage: StageIndex::new(stage),
                time,
                source,
            },
            source => TimestepError::Convergence {
                stage: StageIndex::new(stage),
                time,
                source,
            },
        }
    }

    /// Tendency failure raised in `stage` at `time`.
    pub(crate) fn tendency(stage: usize, time: f64, source: TendencyError) -> Self {
        TimestepError::Tendency {
            stage: StageIndex::new(stage),
            time,
            source,
        }
    }
}

impl From<ArkError> for TimestepError {
    fn from(err: ArkError) -> Self {
        TimestepError::Solver {
            code: err.code(),
            reason: err.reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_error_keeps_code_and_reason() {
        let err: TimestepError = ArkError::TooMuchWork {
            t: 0.5,
            max_steps: 500,
        }
        .into();
        match &err {
            TimestepError::Solver { code, reason } => {
                assert_eq!(*code, -1);
                assert!(reason.contains("500"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!err.is_convergence_failure());
    }

    #[test]
    fn test_convergence_classification() {
        let solver: TimestepError = ArkError::ConvFailure { t: 1.0, h: 0.1 }.into();
        assert!(solver.is_convergence_failure());

        let stage = TimestepError::stage_solve(
            2,
            0.3,
            StageSolveError::NotConverged {
                iterations: 50,
                residual: 1.0,
            },
        );
        assert!(stage.is_convergence_failure());
        assert!(stage.to_string().contains("stage S2"));

        let tendency = TimestepError::stage_solve(
            1,
            0.3,
            StageSolveError::Tendency(TendencyError::Unrecoverable("nan".into())),
        );
        assert!(matches!(tendency, TimestepError::Tendency { .. }));
    }
}
