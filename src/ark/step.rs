//! Additive Runge-Kutta time stepper with embedded error control.

use super::error::ArkError;
use super::nonlinear::{NlsCounts, NlsFailure, NonlinearMethod, StageEquation, StageSolver};
use super::rhs::{ArkRhs, RhsStatus};
use crate::nvector::{NVector, SerialVector};
use crate::tableau::{ButcherTable, ImexPair, TableKind};

// ============================================================================
// Controller constants
// ============================================================================

/// Safety factor on the optimal step-size ratio.
const SAFETY: f64 = 0.96;
/// Maximum growth factor between consecutive steps.
const MAX_GROWTH: f64 = 20.0;
/// Minimum reduction factor after an error test failure.
const ETA_MIN_ERROR: f64 = 0.1;
/// Reduction cap after repeated error test failures.
const ETA_MAX_REPEATED_ERROR: f64 = 0.3;
/// Reduction factor after a convergence or recoverable RHS failure.
const ETA_CONV_FAIL: f64 = 0.25;
/// Error test failures allowed within one step.
const MAX_ERROR_FAILURES: usize = 7;
/// Convergence failures allowed within one step.
const MAX_CONV_FAILURES: usize = 10;
/// Relative closeness at which the last step is stretched to hit the output time.
const STOP_FUZZ: f64 = 1e-3;
/// Roundoff multiple defining the smallest usable time increment.
const ROUNDOFF_FACTOR: f64 = 100.0;

// ============================================================================
// Method and options
// ============================================================================

/// Runge-Kutta method and the problem splitting it integrates.
#[derive(Clone, Debug, PartialEq)]
pub enum ArkMethod {
    /// `y' = f_E + f_I` with an additive pair
    Imex(ImexPair),
    /// `y' = f` treated explicitly
    Explicit(ButcherTable),
    /// `y' = f` treated implicitly
    Implicit(ButcherTable),
}

impl ArkMethod {
    /// Explicit and implicit tables in use.
    pub fn tables(&self) -> (Option<&ButcherTable>, Option<&ButcherTable>) {
        match self {
            ArkMethod::Imex(pair) => (Some(&pair.explicit), Some(&pair.implicit)),
            ArkMethod::Explicit(table) => (Some(table), None),
            ArkMethod::Implicit(table) => (None, Some(table)),
        }
    }

    /// Number of stages.
    pub fn stages(&self) -> usize {
        match self {
            ArkMethod::Imex(pair) => pair.stages(),
            ArkMethod::Explicit(table) | ArkMethod::Implicit(table) => table.stages(),
        }
    }

    /// Order of the method.
    pub fn order(&self) -> usize {
        let (e, i) = self.tables();
        e.into_iter().chain(i).map(|t| t.order).min().unwrap_or(0)
    }

    /// Short description for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ArkMethod::Imex(pair) => pair.implicit.name,
            ArkMethod::Explicit(table) | ArkMethod::Implicit(table) => table.name,
        }
    }

    /// Whether stage equations require a nonlinear solver.
    pub fn needs_solver(&self) -> bool {
        self.tables().1.is_some()
    }

    /// Solver-length vectors an [`ArkStep`] allocates for this method.
    pub fn workspace_vectors(&self, nonlinear: NonlinearMethod) -> usize {
        let (e, i) = self.tables();
        let parts = usize::from(e.is_some()) + usize::from(i.is_some());
        let solver = if self.needs_solver() {
            nonlinear.vectors()
        } else {
            0
        };
        // y, ynew, ewt, sdata, yerr
        5 + parts * self.stages() + solver
    }

    fn validate(&self, fixed_step: bool) -> Result<(), ArkError> {
        let ill = |e: crate::tableau::TableauError| ArkError::IllInput(e.to_string());
        match self {
            ArkMethod::Imex(pair) => pair.validate().map_err(ill)?,
            ArkMethod::Explicit(table) => {
                if table.validate().map_err(ill)? != TableKind::Explicit {
                    return Err(ArkError::IllInput(format!(
                        "{} is not an explicit method",
                        table.name
                    )));
                }
            }
            ArkMethod::Implicit(table) => {
                if table.validate().map_err(ill)? != TableKind::DiagonallyImplicit {
                    return Err(ArkError::IllInput(format!(
                        "{} is not an implicit method",
                        table.name
                    )));
                }
            }
        }

        let (e, i) = self.tables();
        let embedded = e.into_iter().chain(i).all(ButcherTable::has_embedding);
        if !fixed_step && !embedded {
            return Err(ArkError::IllInput(format!(
                "{} has no embedding; adaptive stepping requires one",
                self.name()
            )));
        }
        Ok(())
    }

    /// Exponent denominator of the step-size controller (embedded order + 1).
    fn controller_order(&self) -> usize {
        let (e, i) = self.tables();
        e.into_iter()
            .chain(i)
            .map(|t| t.embedded_order)
            .min()
            .unwrap_or(0)
            + 1
    }
}

/// Tolerances, solver selection and limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArkOptions {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Nonlinear solver for implicit stages
    pub nonlinear: NonlinearMethod,
    /// Maximum nonlinear iterations per stage
    pub max_nonlinear_iters: usize,
    /// Take exactly one step per [`ArkStep::evolve`] call without error control
    pub fixed_step: bool,
    /// Maximum internal steps per [`ArkStep::evolve`] call
    pub max_steps: usize,
}

impl Default for ArkOptions {
    fn default() -> Self {
        let nonlinear = NonlinearMethod::Newton {
            max_krylov: 5,
            max_restarts: 0,
        };
        Self {
            rtol: 1e-4,
            atol: 1e-6,
            nonlinear,
            max_nonlinear_iters: nonlinear.default_max_iters(),
            fixed_step: false,
            max_steps: 500,
        }
    }
}

impl ArkOptions {
    /// Set scalar tolerances.
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Set the nonlinear solver and reset the iteration limit to its default.
    pub fn with_nonlinear(mut self, nonlinear: NonlinearMethod) -> Self {
        self.nonlinear = nonlinear;
        self.max_nonlinear_iters = nonlinear.default_max_iters();
        self
    }

    /// Set the nonlinear iteration limit.
    pub fn with_max_nonlinear_iters(mut self, iters: usize) -> Self {
        self.max_nonlinear_iters = iters;
        self
    }

    /// Enable or disable fixed stepping.
    pub fn with_fixed_step(mut self, fixed: bool) -> Self {
        self.fixed_step = fixed;
        self
    }

    /// Set the step limit per evolve call.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn validate(&self) -> Result<(), ArkError> {
        let valid = |x: f64| x.is_finite() && x >= 0.0;
        if !valid(self.rtol) || !valid(self.atol) || self.rtol + self.atol == 0.0 {
            return Err(ArkError::IllInput(format!(
                "tolerances must be non-negative and not both zero (rtol = {}, atol = {})",
                self.rtol, self.atol
            )));
        }
        if self.max_steps == 0 {
            return Err(ArkError::IllInput("max_steps must be positive".into()));
        }
        if self.max_nonlinear_iters == 0 {
            return Err(ArkError::IllInput(
                "max_nonlinear_iters must be positive".into(),
            ));
        }
        if let NonlinearMethod::Newton { max_krylov: 0, .. } = self.nonlinear {
            return Err(ArkError::IllInput("Krylov dimension must be positive".into()));
        }
        Ok(())
    }
}

/// Integrator counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ArkStats {
    /// Accepted steps
    pub steps: usize,
    /// Attempted steps (accepted + rejected)
    pub attempts: usize,
    /// Explicit-part RHS evaluations
    pub explicit_evals: usize,
    /// Implicit-part RHS evaluations (including inside solves)
    pub implicit_evals: usize,
    /// Full RHS evaluations
    pub full_evals: usize,
    /// Error test failures
    pub error_test_failures: usize,
    /// Nonlinear convergence and recoverable RHS failures
    pub convergence_failures: usize,
    /// Nonlinear iterations
    pub nonlinear_iters: usize,
    /// Krylov iterations
    pub linear_iters: usize,
    /// Size of the last accepted step
    pub last_step: f64,
}

// ============================================================================
// Stepper
// ============================================================================

/// Adaptive or fixed-step additive Runge-Kutta integrator.
///
/// Owns the solution vector; callers move data in with
/// [`reinit`](Self::reinit) or [`resync`](Self::resync) and read it back with
/// [`solution`](Self::solution).
#[derive(Debug)]
pub struct ArkStep {
    method: ArkMethod,
    options: ArkOptions,
    controller_order: usize,
    t: f64,
    h: f64,
    y: SerialVector,
    ynew: SerialVector,
    ewt: SerialVector,
    sdata: SerialVector,
    yerr: SerialVector,
    fe: Vec<SerialVector>,
    fi: Vec<SerialVector>,
    solver: Option<StageSolver>,
    stats: ArkStats,
}

impl ArkStep {
    /// Create a stepper at `(t0, y0)`.
    pub fn new(
        method: ArkMethod,
        y0: &SerialVector,
        t0: f64,
        options: ArkOptions,
    ) -> Result<Self, ArkError> {
        options.validate()?;
        method.validate(options.fixed_step)?;
        if !t0.is_finite() {
            return Err(ArkError::IllInput(format!("initial time {} is not finite", t0)));
        }

        let n = y0.len();
        let s = method.stages();
        let (e, i) = method.tables();
        let stage_vectors = |present: bool| {
            if present {
                (0..s).map(|_| SerialVector::zeros(n)).collect()
            } else {
                Vec::new()
            }
        };
        let fe = stage_vectors(e.is_some());
        let fi = stage_vectors(i.is_some());
        let solver = method
            .needs_solver()
            .then(|| StageSolver::new(options.nonlinear, n, options.max_nonlinear_iters));

        log::debug!(
            "ArkStep: {} ({} stages, order {}), {} unknowns, {}",
            method.name(),
            s,
            method.order(),
            n,
            if options.fixed_step { "fixed step" } else { "adaptive" }
        );

        Ok(Self {
            controller_order: method.controller_order(),
            method,
            options,
            t: t0,
            h: 0.0,
            y: y0.clone(),
            ynew: SerialVector::zeros(n),
            ewt: SerialVector::zeros(n),
            sdata: SerialVector::zeros(n),
            yerr: SerialVector::zeros(n),
            fe,
            fi,
            solver,
            stats: ArkStats::default(),
        })
    }

    /// Current time.
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Current solution.
    pub fn solution(&self) -> &SerialVector {
        &self.y
    }

    /// Step size the next step will attempt (0 before the first step).
    pub fn current_step(&self) -> f64 {
        self.h
    }

    /// Integrator counters.
    pub fn stats(&self) -> &ArkStats {
        &self.stats
    }

    /// Method in use.
    pub fn method(&self) -> &ArkMethod {
        &self.method
    }

    /// Options in use.
    pub fn options(&self) -> &ArkOptions {
        &self.options
    }

    /// Restart from `(t, y)`, discarding the step-size history.
    pub fn reinit(&mut self, t: f64, y: &SerialVector) {
        self.resync(t, y);
        self.h = 0.0;
    }

    /// Replace the current solution, keeping the step-size history.
    pub fn resync(&mut self, t: f64, y: &SerialVector) {
        self.t = t;
        self.y.copy_from(y);
    }

    /// Advance the solution to exactly `t_out`.
    pub fn evolve<R: ArkRhs + ?Sized>(&mut self, t_out: f64, rhs: &mut R) -> Result<(), ArkError> {
        if !t_out.is_finite() {
            return Err(ArkError::IllInput(format!("tout = {} is not finite", t_out)));
        }
        let span = t_out - self.t;
        if span == 0.0 {
            return Ok(());
        }
        if span < 0.0 {
            return Err(ArkError::IllInput(format!(
                "tout = {} is behind the current time {}",
                t_out, self.t
            )));
        }
        let roundoff = ROUNDOFF_FACTOR * f64::EPSILON * self.t.abs().max(t_out.abs());
        if span <= roundoff {
            return Err(ArkError::TooClose { t: self.t, tout: t_out });
        }

        if self.options.fixed_step {
            self.h = span;
        } else if self.h <= 0.0 {
            self.compute_weights();
            self.h = self.initial_step(span, rhs)?;
            log::debug!("ArkStep: initial step {:e}", self.h);
        }

        let mut steps = 0;
        while t_out - self.t > roundoff {
            if steps >= self.options.max_steps {
                return Err(ArkError::TooMuchWork {
                    t: self.t,
                    max_steps: self.options.max_steps,
                });
            }
            self.take_step(t_out, roundoff, rhs)?;
            steps += 1;
        }
        self.t = t_out;
        Ok(())
    }

    /// Error weights `1 / (rtol |y| + atol)`.
    fn compute_weights(&mut self) {
        let (rtol, atol) = (self.options.rtol, self.options.atol);
        for (w, y) in self.ewt.as_mut_slice().iter_mut().zip(self.y.as_slice()) {
            *w = 1.0 / (rtol * y.abs() + atol);
        }
    }

    /// Initial step estimate from two full RHS evaluations.
    fn initial_step<R: ArkRhs + ?Sized>(&mut self, span: f64, rhs: &mut R) -> Result<f64, ArkError> {
        let t = self.t;
        self.stats.full_evals += 1;
        full_status(rhs.full(t, &self.y, &mut self.yerr), t)?;

        let d0 = self.y.wrms_norm(&self.ewt);
        let d1 = self.yerr.wrms_norm(&self.ewt);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        }
        .min(span);

        // Explicit Euler probe
        self.sdata.linear_sum(1.0, &self.y, h0, &self.yerr);
        self.stats.full_evals += 1;
        full_status(rhs.full(t + h0, &self.sdata, &mut self.ynew), t)?;
        self.sdata.linear_sum(1.0, &self.ynew, -1.0, &self.yerr);
        let d2 = self.sdata.wrms_norm(&self.ewt) / h0;

        let dmax = d1.max(d2);
        let h1 = if dmax <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / dmax).powf(1.0 / (self.method.order() as f64 + 1.0))
        };
        Ok((100.0 * h0).min(h1).min(span))
    }

    /// Take one accepted step, retrying with smaller sizes as needed.
    fn take_step<R: ArkRhs + ?Sized>(
        &mut self,
        t_out: f64,
        roundoff: f64,
        rhs: &mut R,
    ) -> Result<(), ArkError> {
        self.compute_weights();
        let fixed = self.options.fixed_step;
        let k = self.controller_order as f64;
        let h_min = roundoff.max(ROUNDOFF_FACTOR * f64::EPSILON);

        let mut h = self.h;
        let mut error_failures = 0;
        let mut conv_failures = 0;

        loop {
            let remaining = t_out - self.t;
            let hits_stop = h >= remaining || remaining - h <= STOP_FUZZ * h;
            let h_try = if hits_stop { remaining } else { h };

            self.stats.attempts += 1;
            let failure = match self.attempt(h_try, rhs) {
                Ok(dsm) if fixed || dsm <= 1.0 => {
                    self.t = if hits_stop { t_out } else { self.t + h_try };
                    std::mem::swap(&mut self.y, &mut self.ynew);
                    self.stats.steps += 1;
                    self.stats.last_step = h_try;

                    if !fixed {
                        let mut eta = if dsm > 0.0 {
                            (SAFETY * dsm.powf(-1.0 / k)).min(MAX_GROWTH)
                        } else {
                            MAX_GROWTH
                        };
                        if error_failures + conv_failures > 0 || hits_stop {
                            eta = eta.min(1.0);
                        }
                        let base = if hits_stop { h } else { h_try };
                        self.h = base * eta;
                    }
                    return Ok(());
                }
                Ok(dsm) => {
                    self.stats.error_test_failures += 1;
                    error_failures += 1;
                    if error_failures >= MAX_ERROR_FAILURES {
                        return Err(ArkError::ErrFailure { t: self.t, h: h_try });
                    }
                    let eta = SAFETY * dsm.powf(-1.0 / k);
                    let mut eta = if eta.is_finite() {
                        eta.max(ETA_MIN_ERROR)
                    } else {
                        ETA_MIN_ERROR
                    };
                    if error_failures >= 2 {
                        eta = eta.min(ETA_MAX_REPEATED_ERROR);
                    }
                    log::debug!(
                        "ArkStep: error test failed at t = {}, h = {:e}, dsm = {:.3}",
                        self.t,
                        h_try,
                        dsm
                    );
                    h = h_try * eta;
                    None
                }
                Err(NlsFailure::Rhs(RhsStatus::Unrecoverable)) => {
                    return Err(ArkError::RhsFailure { t: self.t });
                }
                Err(failure) => {
                    if fixed {
                        return Err(match failure {
                            NlsFailure::NotConverged => ArkError::ConvFailure { t: self.t, h: h_try },
                            NlsFailure::Rhs(_) => ArkError::UnrecoverableRhs { t: self.t },
                        });
                    }
                    self.stats.convergence_failures += 1;
                    conv_failures += 1;
                    if conv_failures >= MAX_CONV_FAILURES {
                        return Err(conv_error(failure, self.t, h_try));
                    }
                    log::debug!(
                        "ArkStep: stage failure ({:?}) at t = {}, h = {:e}",
                        failure,
                        self.t,
                        h_try
                    );
                    h = h_try * ETA_CONV_FAIL;
                    Some(failure)
                }
            };

            if h <= h_min {
                log::warn!("ArkStep: step size underflow at t = {}", self.t);
                return Err(match failure {
                    Some(f) => conv_error(f, self.t, h),
                    None => ArkError::ErrFailure { t: self.t, h },
                });
            }
        }
    }

    /// Compute one candidate step of size `h` into `ynew`.
    ///
    /// Returns the weighted RMS norm of the local error estimate
    /// (0 in fixed-step mode).
    fn attempt<R: ArkRhs + ?Sized>(&mut self, h: f64, rhs: &mut R) -> Result<f64, NlsFailure> {
        let t = self.t;
        let imex = matches!(self.method, ArkMethod::Imex(_));
        let (explicit, implicit) = self.method.tables();
        let c = explicit.or(implicit).map(|tab| tab.c.as_slice()).unwrap_or(&[]);

        for (i, &ci) in c.iter().enumerate() {
            let ti = t + ci * h;

            // Known part of the stage: y + h Σ_{j<i} (a^E_ij F^E_j + a^I_ij F^I_j)
            self.sdata.copy_from(&self.y);
            for j in 0..i {
                if let Some(tab) = explicit
                    && tab.a[i][j] != 0.0
                {
                    self.sdata.axpy(h * tab.a[i][j], &self.fe[j]);
                }
                if let Some(tab) = implicit
                    && tab.a[i][j] != 0.0
                {
                    self.sdata.axpy(h * tab.a[i][j], &self.fi[j]);
                }
            }

            // Stage value, built in `ynew`
            self.ynew.copy_from(&self.sdata);
            if let Some(tab) = implicit
                && tab.a[i][i] != 0.0
                && let Some(solver) = self.solver.as_mut()
            {
                let eq = StageEquation {
                    data: &self.sdata,
                    gamma: h * tab.a[i][i],
                    ewt: &self.ewt,
                };
                let stats = &mut self.stats;
                let mut counts = NlsCounts::default();
                let result = solver.solve(
                    |z, out| {
                        stats.implicit_evals += 1;
                        implicit_rhs(imex, &mut *rhs, ti, z, out)
                    },
                    &eq,
                    &mut self.ynew,
                    &mut counts,
                );
                self.stats.nonlinear_iters += counts.nonlinear_iters;
                self.stats.linear_iters += counts.linear_iters;
                result?;
            }

            if explicit.is_some() {
                self.stats.explicit_evals += 1;
                status(explicit_rhs(imex, rhs, ti, &self.ynew, &mut self.fe[i]))?;
            }
            if implicit.is_some() {
                self.stats.implicit_evals += 1;
                status(implicit_rhs(imex, rhs, ti, &self.ynew, &mut self.fi[i]))?;
            }
        }

        // Solution and embedded error estimate
        self.ynew.copy_from(&self.y);
        self.yerr.fill(0.0);
        for (tab, f) in explicit
            .map(|tab| (tab, &self.fe))
            .into_iter()
            .chain(implicit.map(|tab| (tab, &self.fi)))
        {
            for (j, fj) in f.iter().enumerate() {
                if tab.b[j] != 0.0 {
                    self.ynew.axpy(h * tab.b[j], fj);
                }
                if let Some(bh) = &tab.b_embedded {
                    let d = tab.b[j] - bh[j];
                    if d != 0.0 {
                        self.yerr.axpy(h * d, fj);
                    }
                }
            }
        }

        if self.options.fixed_step {
            return Ok(0.0);
        }
        let dsm = self.yerr.wrms_norm(&self.ewt);
        Ok(if dsm.is_nan() { f64::INFINITY } else { dsm })
    }
}

fn explicit_rhs<R: ArkRhs + ?Sized>(
    imex: bool,
    rhs: &mut R,
    t: f64,
    y: &SerialVector,
    out: &mut SerialVector,
) -> RhsStatus {
    if imex {
        rhs.explicit(t, y, out)
    } else {
        rhs.full(t, y, out)
    }
}

fn implicit_rhs<R: ArkRhs + ?Sized>(
    imex: bool,
    rhs: &mut R,
    t: f64,
    y: &SerialVector,
    out: &mut SerialVector,
) -> RhsStatus {
    if imex {
        rhs.implicit(t, y, out)
    } else {
        rhs.full(t, y, out)
    }
}

fn status(s: RhsStatus) -> Result<(), NlsFailure> {
    match s {
        RhsStatus::Success => Ok(()),
        failure => Err(NlsFailure::Rhs(failure)),
    }
}

fn full_status(s: RhsStatus, t: f64) -> Result<(), ArkError> {
    match s {
        RhsStatus::Success => Ok(()),
        RhsStatus::Recoverable => Err(ArkError::FirstRhsFailure { t }),
        RhsStatus::Unrecoverable => Err(ArkError::RhsFailure { t }),
    }
}

fn conv_error(failure: NlsFailure, t: f64, h: f64) -> ArkError {
    match failure {
        NlsFailure::NotConverged => ArkError::ConvFailure { t, h },
        NlsFailure::Rhs(_) => ArkError::RepeatedRhsFailure { t },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tableau::catalogue;

    /// y' = -a y (explicit part) - b y (implicit part)
    struct Decay {
        a: f64,
        b: f64,
    }

    impl ArkRhs for Decay {
        fn explicit(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            ydot.linear_sum(-self.a, y, 0.0, y);
            RhsStatus::Success
        }

        fn implicit(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            ydot.linear_sum(-self.b, y, 0.0, y);
            RhsStatus::Success
        }

        fn full(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            ydot.linear_sum(-(self.a + self.b), y, 0.0, y);
            RhsStatus::Success
        }
    }

    /// y' = -k (y - cos t) - sin t, exact y = cos t; the relaxation is stiff.
    struct Relaxation {
        k: f64,
        implicit_calls: usize,
        fail_at_call: Option<(usize, RhsStatus)>,
    }

    impl Relaxation {
        fn new(k: f64) -> Self {
            Self {
                k,
                implicit_calls: 0,
                fail_at_call: None,
            }
        }
    }

    impl ArkRhs for Relaxation {
        fn explicit(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            for i in 0..y.len() {
                ydot[i] = -t.sin();
            }
            RhsStatus::Success
        }

        fn implicit(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            self.implicit_calls += 1;
            if let Some((call, status)) = self.fail_at_call
                && call == self.implicit_calls
            {
                return status;
            }
            for i in 0..y.len() {
                ydot[i] = -self.k * (y[i] - t.cos());
            }
            RhsStatus::Success
        }

        fn full(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            for i in 0..y.len() {
                ydot[i] = -self.k * (y[i] - t.cos()) - t.sin();
            }
            RhsStatus::Success
        }
    }

    fn table(id: i32) -> ButcherTable {
        catalogue::table_by_id(id).expect("catalogue id")
    }

    #[test]
    fn test_explicit_bogacki_shampine_accuracy() {
        let y0 = SerialVector::from_vec(vec![1.0, 2.0]);
        let options = ArkOptions::default().with_tolerances(1e-7, 1e-9);
        let method = ArkMethod::Explicit(table(catalogue::BOGACKI_SHAMPINE_4_2_3));
        let mut ark = ArkStep::new(method, &y0, 0.0, options).expect("valid setup");
        let mut rhs = Decay { a: 1.0, b: 0.0 };

        ark.evolve(1.0, &mut rhs).expect("integration succeeds");

        let exact = (-1.0f64).exp();
        assert_eq!(ark.time(), 1.0);
        assert!((ark.solution()[0] - exact).abs() < 1e-5);
        assert!((ark.solution()[1] - 2.0 * exact).abs() < 2e-5);
        assert!(ark.stats().steps > 1);
        assert_eq!(ark.stats().implicit_evals, 0);
    }

    #[test]
    fn test_implicit_stiff_relaxation() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let options = ArkOptions::default()
            .with_tolerances(1e-6, 1e-9)
            .with_max_steps(5000);
        let method = ArkMethod::Implicit(table(catalogue::ARK324L2SA_DIRK_4_2_3));
        let mut ark = ArkStep::new(method, &y0, 0.0, options).expect("valid setup");
        let mut rhs = Relaxation::new(1000.0);

        ark.evolve(1.0, &mut rhs).expect("integration succeeds");

        let err = (ark.solution()[0] - 1.0f64.cos()).abs();
        assert!(err < 1e-4, "error {:e}", err);
        assert!(ark.stats().nonlinear_iters > 0);
        assert!(ark.stats().linear_iters > 0);
    }

    #[test]
    fn test_imex_pair_on_split_relaxation() {
        let y0 = SerialVector::from_vec(vec![1.0, 1.0]);
        let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_DIRK_4_2_3).expect("pair");
        let options = ArkOptions::default()
            .with_tolerances(1e-6, 1e-9)
            .with_max_steps(5000);
        let mut ark = ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, options).expect("valid setup");
        let mut rhs = Relaxation::new(1000.0);

        ark.evolve(0.5, &mut rhs).expect("first leg");
        ark.evolve(1.0, &mut rhs).expect("second leg");

        let err = (ark.solution()[1] - 1.0f64.cos()).abs();
        assert!(err < 1e-4, "error {:e}", err);
        assert!(ark.stats().explicit_evals > 0);
        assert_eq!(ark.stats().full_evals, 2);
    }

    #[test]
    fn test_fixed_step_ars343_single_step() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let pair = catalogue::user_pair(catalogue::USER_ARS343).expect("ARS343");
        let options = ArkOptions::default().with_fixed_step(true);
        let mut ark = ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, options).expect("valid setup");
        let mut rhs = Decay { a: 0.0, b: 1.0 };

        ark.evolve(0.1, &mut rhs).expect("one step");

        assert_eq!(ark.stats().steps, 1);
        assert!(
            (ark.solution()[0] - 0.904_835_204_472_465_1).abs() < 1e-10,
            "y = {}",
            ark.solution()[0]
        );
    }

    #[test]
    fn test_adaptive_requires_embedding() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let pair = catalogue::user_pair(catalogue::USER_ARS232).expect("ARS232");
        let err = ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, ArkOptions::default())
            .expect_err("no embedding");
        assert_eq!(err.code(), -22);
    }

    #[test]
    fn test_fixed_point_with_anderson() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let options = ArkOptions::default()
            .with_nonlinear(NonlinearMethod::FixedPoint { acceleration: 2 });
        let method = ArkMethod::Implicit(table(catalogue::KVAERNO_4_2_3));
        let mut ark = ArkStep::new(method, &y0, 0.0, options).expect("valid setup");
        let mut rhs = Decay { a: 0.0, b: 1.0 };

        ark.evolve(1.0, &mut rhs).expect("integration succeeds");
        let err = (ark.solution()[0] - (-1.0f64).exp()).abs();
        assert!(err < 1e-3, "error {:e}", err);
    }

    #[test]
    fn test_time_argument_errors() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let method = ArkMethod::Explicit(table(catalogue::HEUN_EULER_2_1_2));
        let mut ark = ArkStep::new(method, &y0, 1.0, ArkOptions::default()).expect("valid setup");
        let mut rhs = Decay { a: 1.0, b: 0.0 };

        assert_eq!(ark.evolve(1.0, &mut rhs), Ok(()));
        assert_eq!(ark.evolve(0.5, &mut rhs).map_err(|e| e.code()), Err(-22));
        assert_eq!(
            ark.evolve(1.0 + 1e-15, &mut rhs).map_err(|e| e.code()),
            Err(-27)
        );
    }

    #[test]
    fn test_step_limit() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let options = ArkOptions::default()
            .with_tolerances(1e-10, 1e-12)
            .with_max_steps(3);
        let method = ArkMethod::Explicit(table(catalogue::HEUN_EULER_2_1_2));
        let mut ark = ArkStep::new(method, &y0, 0.0, options).expect("valid setup");
        let err = ark
            .evolve(10.0, &mut Decay { a: 1.0, b: 0.0 })
            .expect_err("too many steps");
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn test_unrecoverable_rhs_stops() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_ERK_4_2_3).expect("pair");
        let mut ark =
            ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, ArkOptions::default()).expect("valid");
        let mut rhs = Relaxation::new(10.0);
        rhs.fail_at_call = Some((1, RhsStatus::Unrecoverable));

        let err = ark.evolve(1.0, &mut rhs).expect_err("fatal RHS");
        assert_eq!(err.code(), -8);
    }

    #[test]
    fn test_recoverable_rhs_retries() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_ERK_4_2_3).expect("pair");
        let mut ark =
            ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, ArkOptions::default()).expect("valid");
        let mut rhs = Relaxation::new(10.0);
        rhs.fail_at_call = Some((1, RhsStatus::Recoverable));

        ark.evolve(1.0, &mut rhs).expect("recovers with a smaller step");
        assert!(ark.stats().convergence_failures >= 1);
        assert!((ark.solution()[0] - 1.0f64.cos()).abs() < 1e-3);
    }

    /// Decay whose implicit part flips sign on every call, so no stage solve settles.
    struct Chattering {
        calls: usize,
    }

    impl ArkRhs for Chattering {
        fn explicit(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            ydot.linear_sum(-1.0, y, 0.0, y);
            RhsStatus::Success
        }

        fn implicit(&mut self, _t: f64, _y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            self.calls += 1;
            let sign = if self.calls % 2 == 0 { 1.0 } else { -1.0 };
            ydot.fill(sign * 1e12);
            RhsStatus::Success
        }

        fn full(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            ydot.linear_sum(-1.0, y, 0.0, y);
            RhsStatus::Success
        }
    }

    #[test]
    fn test_repeated_convergence_failures_are_fatal() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_DIRK_4_2_3).expect("pair");
        let options = ArkOptions::default()
            .with_nonlinear(NonlinearMethod::FixedPoint { acceleration: 0 })
            .with_max_nonlinear_iters(2);
        let mut ark = ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, options).expect("valid");

        let err = ark
            .evolve(1.0, &mut Chattering { calls: 0 })
            .expect_err("stage solve never converges");
        assert!(matches!(err, ArkError::ConvFailure { .. }), "{:?}", err);
        assert_eq!(err.code(), -4);

        let stats = ark.stats();
        assert_eq!(stats.convergence_failures, MAX_CONV_FAILURES);
        assert_eq!(stats.steps, 0);
        assert_eq!(stats.attempts, MAX_CONV_FAILURES);
        assert_eq!(ark.time(), 0.0);
        assert_eq!(ark.solution()[0], 1.0);
    }

    #[test]
    fn test_fixed_step_convergence_failure_is_immediate() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_DIRK_4_2_3).expect("pair");
        let options = ArkOptions::default()
            .with_nonlinear(NonlinearMethod::FixedPoint { acceleration: 0 })
            .with_max_nonlinear_iters(2)
            .with_fixed_step(true);
        let mut ark = ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, options).expect("valid");

        let err = ark
            .evolve(0.1, &mut Chattering { calls: 0 })
            .expect_err("stage solve never converges");
        assert_eq!(err, ArkError::ConvFailure { t: 0.0, h: 0.1 });
        assert_eq!(ark.stats().attempts, 1);
        assert_eq!(ark.stats().convergence_failures, 0);
    }

    /// Decay whose full right-hand side is never available.
    struct NoFull;

    impl ArkRhs for NoFull {
        fn explicit(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            ydot.linear_sum(-1.0, y, 0.0, y);
            RhsStatus::Success
        }

        fn implicit(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
            ydot.linear_sum(-1.0, y, 0.0, y);
            RhsStatus::Success
        }

        fn full(&mut self, _t: f64, _y: &SerialVector, _ydot: &mut SerialVector) -> RhsStatus {
            RhsStatus::Recoverable
        }
    }

    #[test]
    fn test_recoverable_first_call_failure() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_DIRK_4_2_3).expect("pair");
        let method = ArkMethod::Imex(pair.clone());
        let mut ark = ArkStep::new(method, &y0, 0.0, ArkOptions::default()).expect("valid");
        let err = ark.evolve(1.0, &mut NoFull).expect_err("no initial step estimate");
        assert_eq!(err, ArkError::FirstRhsFailure { t: 0.0 });
        assert_eq!(err.code(), -9);
        assert_eq!(ark.stats().full_evals, 1);

        // Fixed stepping skips the estimate and never calls the full RHS
        let options = ArkOptions::default().with_fixed_step(true);
        let mut ark = ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, options).expect("valid");
        ark.evolve(0.1, &mut NoFull).expect("fixed step succeeds");
        assert_eq!(ark.stats().full_evals, 0);
    }

    #[test]
    fn test_resync_keeps_step_history() {
        let y0 = SerialVector::from_vec(vec![1.0]);
        let method = ArkMethod::Explicit(table(catalogue::BOGACKI_SHAMPINE_4_2_3));
        let mut ark = ArkStep::new(method, &y0, 0.0, ArkOptions::default()).expect("valid");
        let mut rhs = Decay { a: 1.0, b: 0.0 };
        ark.evolve(0.5, &mut rhs).expect("first leg");
        let h = ark.current_step();
        assert!(h > 0.0);

        ark.resync(0.5, &SerialVector::from_vec(vec![2.0]));
        assert_eq!(ark.current_step(), h);
        ark.reinit(0.5, &SerialVector::from_vec(vec![2.0]));
        assert_eq!(ark.current_step(), 0.0);
    }

    #[test]
    fn test_workspace_vectors() {
        let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_DIRK_4_2_3).expect("pair");
        let newton = NonlinearMethod::Newton {
            max_krylov: 5,
            max_restarts: 0,
        };
        // 5 base + 2 × 4 stage vectors + 5 Newton + (5 + 1 + 3) GMRES
        assert_eq!(ArkMethod::Imex(pair).workspace_vectors(newton), 27);
        let erk = ArkMethod::Explicit(table(catalogue::HEUN_EULER_2_1_2));
        assert_eq!(erk.workspace_vectors(newton), 7);
    }
}
