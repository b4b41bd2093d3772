//! Linear split decay model for verifying time-stepping schemes.
//!
//! Every state value obeys
//!
//! ```text
//! dy/dt = -a y  (explicit)  +  -b y  (implicit)
//! ```
//!
//! so the exact solution is `y(t) = y(0) exp(-(a + b) t)` and the implicit
//! stage equation has the closed-form solution
//! `stage = predictor / (1 + dtγ b)`.

use crate::state::{ModelState, StateLayout};

use super::{StageSolveError, TendencyError, TendencyModel};

/// Decay model with an explicit rate `a` and an implicit rate `b`.
#[derive(Clone, Debug)]
pub struct LinearSplitModel {
    layout: StateLayout,
    /// Explicit decay rate `a`
    pub explicit_rate: f64,
    /// Implicit decay rate `b`
    pub implicit_rate: f64,
    /// Number of explicit tendency evaluations
    pub n_explicit: usize,
    /// Number of implicit tendency evaluations
    pub n_implicit: usize,
    /// Number of stage solves
    pub n_solves: usize,
}

impl LinearSplitModel {
    /// Create a model with the given layout and decay rates.
    pub fn new(layout: StateLayout, explicit_rate: f64, implicit_rate: f64) -> Self {
        Self {
            layout,
            explicit_rate,
            implicit_rate,
            n_explicit: 0,
            n_implicit: 0,
            n_solves: 0,
        }
    }

    /// Scalar model: a single component of length one.
    pub fn scalar(explicit_rate: f64, implicit_rate: f64) -> Self {
        Self::new(StateLayout::uniform(1, 0, 1), explicit_rate, implicit_rate)
    }

    /// Exact solution at time `t` starting from `initial` at time 0.
    pub fn exact(&self, initial: &ModelState, t: f64) -> ModelState {
        let mut out = initial.clone();
        out.scale((-(self.explicit_rate + self.implicit_rate) * t).exp());
        out
    }

    fn apply_rate(rate: f64, state: &ModelState, tendency: &mut ModelState) {
        for (out, inp) in tendency.arrays_mut().zip(state.arrays()) {
            for (o, i) in out.iter_mut().zip(inp) {
                *o = -rate * i;
            }
        }
    }
}

impl TendencyModel for LinearSplitModel {
    fn layout(&self) -> &StateLayout {
        &self.layout
    }

    fn explicit_tendency(
        &mut self,
        state: &ModelState,
        _time: f64,
        tendency: &mut ModelState,
    ) -> Result<(), TendencyError> {
        self.n_explicit += 1;
        Self::apply_rate(self.explicit_rate, state, tendency);
        Ok(())
    }

    fn implicit_tendency(
        &mut self,
        state: &ModelState,
        _time: f64,
        tendency: &mut ModelState,
    ) -> Result<(), TendencyError> {
        self.n_implicit += 1;
        Self::apply_rate(self.implicit_rate, state, tendency);
        Ok(())
    }

    fn full_tendency(
        &mut self,
        state: &ModelState,
        _time: f64,
        tendency: &mut ModelState,
    ) -> Result<(), TendencyError> {
        Self::apply_rate(self.explicit_rate + self.implicit_rate, state, tendency);
        Ok(())
    }

    fn solve_implicit_stage(
        &mut self,
        predictor: &ModelState,
        _time: f64,
        dt_gamma: f64,
        stage: &mut ModelState,
    ) -> Result<(), StageSolveError> {
        self.n_solves += 1;
        stage.copy_from(predictor);
        stage.scale(1.0 / (1.0 + dt_gamma * self.implicit_rate));
        Ok(())
    }
}
