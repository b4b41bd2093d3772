//! Right-hand side callbacks.

use crate::nvector::SerialVector;

/// Outcome of a right-hand side evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RhsStatus {
    /// Evaluation succeeded
    Success,
    /// Evaluation failed, a smaller step may succeed
    Recoverable,
    /// Evaluation failed, integration must stop
    Unrecoverable,
}

/// Split right-hand side `y' = f_E(t, y) + f_I(t, y)`.
///
/// Which callbacks are used depends on the [`ArkMethod`](super::ArkMethod):
///
/// - `Imex`: [`explicit`](Self::explicit) and [`implicit`](Self::implicit)
/// - `Explicit`, `Implicit`: [`full`](Self::full) only
///
/// [`full`](Self::full) is also used for the initial step-size estimate.
pub trait ArkRhs {
    /// Non-stiff part `f_E`.
    fn explicit(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus;

    /// Stiff part `f_I`.
    fn implicit(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus;

    /// Full right-hand side `f_E + f_I`.
    fn full(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus;
}
