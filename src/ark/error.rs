//! Adaptive solver failure codes.

use thiserror::Error;

/// Fatal outcome of an [`ArkStep`](super::ArkStep) call.
///
/// Every variant maps to a stable negative integer via [`ArkError::code`];
/// the display text is the human-readable reason.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArkError {
    /// The internal step limit was reached before the output time.
    #[error("at t = {t}, {max_steps} steps taken before reaching tout")]
    TooMuchWork { t: f64, max_steps: usize },

    /// The error test failed repeatedly, or with the minimum step size.
    #[error("at t = {t} and h = {h:e}, the error test failed repeatedly or with |h| = hmin")]
    ErrFailure { t: f64, h: f64 },

    /// The nonlinear solver failed repeatedly, or with the minimum step size.
    #[error(
        "at t = {t} and h = {h:e}, the nonlinear solver failed to converge repeatedly or with |h| = hmin"
    )]
    ConvFailure { t: f64, h: f64 },

    /// A right-hand side routine failed unrecoverably.
    #[error("at t = {t}, the right-hand side routine failed in an unrecoverable manner")]
    RhsFailure { t: f64 },

    /// The first right-hand side call failed recoverably.
    #[error("at t = {t}, the right-hand side routine failed at the first call")]
    FirstRhsFailure { t: f64 },

    /// Recoverable right-hand side failures kept recurring.
    #[error("at t = {t}, the right-hand side routine failed recoverably too many times")]
    RepeatedRhsFailure { t: f64 },

    /// A recoverable right-hand side failure occurred where no recovery is possible.
    #[error("at t = {t}, the right-hand side routine failed recoverably but recovery is not possible")]
    UnrecoverableRhs { t: f64 },

    /// Invalid arguments or configuration.
    #[error("illegal input: {0}")]
    IllInput(String),

    /// The output time is too close to the current time to take a step.
    #[error("tout = {tout} too close to t = {t} to start integration")]
    TooClose { t: f64, tout: f64 },
}

impl ArkError {
    /// Stable numeric code.
    pub fn code(&self) -> i32 {
        match self {
            ArkError::TooMuchWork { .. } => -1,
            ArkError::ErrFailure { .. } => -3,
            ArkError::ConvFailure { .. } => -4,
            ArkError::RhsFailure { .. } => -8,
            ArkError::FirstRhsFailure { .. } => -9,
            ArkError::RepeatedRhsFailure { .. } => -10,
            ArkError::UnrecoverableRhs { .. } => -11,
            ArkError::IllInput(_) => -22,
            ArkError::TooClose { .. } => -27,
        }
    }

    /// Human-readable reason.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
