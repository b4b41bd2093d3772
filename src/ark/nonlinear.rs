//! Nonlinear solvers for implicit stages.
//!
//! Each implicit stage solves `z = a + γ f_I(t, z)` for the stage value `z`,
//! where `a` collects the already-known stage contributions.
//!
//! - Newton iteration on `G(z) = z - a - γ f_I(t, z)` with GMRES and
//!   finite-difference Jacobian-vector products
//! - Fixed-point iteration on `Φ(z) = a + γ f_I(t, z)`, optionally
//!   Anderson-accelerated
//!
//! Both use the same convergence test on weighted RMS update norms.

use super::anderson::Anderson;
use super::gmres::Gmres;
use super::rhs::RhsStatus;
use crate::nvector::{NVector, SerialVector};

/// Update-norm tolerance factor for convergence.
const NLS_COEF: f64 = 0.1;
/// Linear solver tolerance relative to the nonlinear tolerance.
const LINEAR_COEF: f64 = 0.05;
/// Convergence-rate damping.
const CR_DOWN: f64 = 0.3;
/// Divergence threshold on successive update norms.
const R_DIV: f64 = 2.3;

/// Nonlinear solver choice and its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NonlinearMethod {
    /// Newton-GMRES
    Newton {
        /// Maximum Krylov dimension
        max_krylov: usize,
        /// Maximum GMRES restarts
        max_restarts: usize,
    },
    /// Fixed-point iteration
    FixedPoint {
        /// Anderson acceleration depth (0 disables acceleration)
        acceleration: usize,
    },
}

impl NonlinearMethod {
    /// Default maximum number of nonlinear iterations per stage.
    pub fn default_max_iters(&self) -> usize {
        match self {
            NonlinearMethod::Newton { .. } => 3,
            NonlinearMethod::FixedPoint { .. } => 10,
        }
    }

    /// Solver-length vectors needed by the workspace.
    pub fn vectors(&self) -> usize {
        match *self {
            NonlinearMethod::Newton { max_krylov, .. } => 5 + Gmres::vectors(max_krylov),
            NonlinearMethod::FixedPoint { acceleration } => 3 + Anderson::vectors(acceleration),
        }
    }
}

/// Why a stage solve failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NlsFailure {
    /// Iteration diverged or hit the iteration limit
    NotConverged,
    /// Right-hand side evaluation failed
    Rhs(RhsStatus),
}

/// Per-solve counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct NlsCounts {
    pub nonlinear_iters: usize,
    pub linear_iters: usize,
}

/// Known data of one stage equation.
pub(crate) struct StageEquation<'a> {
    /// Explicit contributions `a`
    pub data: &'a SerialVector,
    /// Implicit coefficient `γ = h a_ii`
    pub gamma: f64,
    /// Error weights
    pub ewt: &'a SerialVector,
}

/// Stage solver with its workspace.
#[derive(Debug)]
pub(crate) enum StageSolver {
    Newton(NewtonSolver),
    FixedPoint(FixedPointSolver),
}

impl StageSolver {
    /// Allocate for vectors of length `n`.
    pub fn new(method: NonlinearMethod, n: usize, max_iters: usize) -> Self {
        match method {
            NonlinearMethod::Newton {
                max_krylov,
                max_restarts,
            } => StageSolver::Newton(NewtonSolver {
                max_iters,
                gmres: Gmres::new(n, max_krylov, max_restarts),
                fz: SerialVector::zeros(n),
                rhs: SerialVector::zeros(n),
                delta: SerialVector::zeros(n),
                zpert: SerialVector::zeros(n),
                fpert: SerialVector::zeros(n),
            }),
            NonlinearMethod::FixedPoint { acceleration } => {
                StageSolver::FixedPoint(FixedPointSolver {
                    max_iters,
                    anderson: Anderson::new(n, acceleration),
                    gz: SerialVector::zeros(n),
                    residual: SerialVector::zeros(n),
                    znew: SerialVector::zeros(n),
                })
            }
        }
    }

    /// Solve the stage equation; `z` holds the initial guess on entry.
    pub fn solve<F>(
        &mut self,
        f: F,
        eq: &StageEquation<'_>,
        z: &mut SerialVector,
        counts: &mut NlsCounts,
    ) -> Result<(), NlsFailure>
    where
        F: FnMut(&SerialVector, &mut SerialVector) -> RhsStatus,
    {
        match self {
            StageSolver::Newton(newton) => newton.solve(f, eq, z, counts),
            StageSolver::FixedPoint(fp) => fp.solve(f, eq, z, counts),
        }
    }
}

/// Tracks the estimated convergence rate across iterations.
struct ConvergenceTest {
    rate: f64,
    prev: f64,
}

enum Verdict {
    Converged,
    Continue,
    Diverged,
}

impl ConvergenceTest {
    fn new() -> Self {
        Self {
            rate: 1.0,
            prev: 0.0,
        }
    }

    fn check(&mut self, iteration: usize, del: f64) -> Verdict {
        if !del.is_finite() {
            return Verdict::Diverged;
        }
        if iteration > 0 {
            self.rate = (CR_DOWN * self.rate).max(del / self.prev);
        }
        if del * self.rate.min(1.0) / NLS_COEF <= 1.0 {
            return Verdict::Converged;
        }
        if iteration > 0 && del > R_DIV * self.prev {
            return Verdict::Diverged;
        }
        self.prev = del;
        Verdict::Continue
    }
}

fn eval<F>(f: &mut F, z: &SerialVector, out: &mut SerialVector) -> Result<(), NlsFailure>
where
    F: FnMut(&SerialVector, &mut SerialVector) -> RhsStatus,
{
    match f(z, out) {
        RhsStatus::Success => Ok(()),
        failure => Err(NlsFailure::Rhs(failure)),
    }
}

// ============================================================================
// Newton-GMRES
// ============================================================================

/// Inexact Newton iteration with matrix-free GMRES.
#[derive(Debug)]
pub(crate) struct NewtonSolver {
    max_iters: usize,
    gmres: Gmres,
    fz: SerialVector,
    rhs: SerialVector,
    delta: SerialVector,
    zpert: SerialVector,
    fpert: SerialVector,
}

impl NewtonSolver {
    fn solve<F>(
        &mut self,
        mut f: F,
        eq: &StageEquation<'_>,
        z: &mut SerialVector,
        counts: &mut NlsCounts,
    ) -> Result<(), NlsFailure>
    where
        F: FnMut(&SerialVector, &mut SerialVector) -> RhsStatus,
    {
        let n = z.len();
        let lin_tol = LINEAR_COEF * NLS_COEF * (n as f64).sqrt();
        let gamma = eq.gamma;
        let mut test = ConvergenceTest::new();

        for m in 0..self.max_iters {
            eval(&mut f, z, &mut self.fz)?;

            // -G(z) = a + γ f(z) - z
            self.rhs.linear_sum(1.0, eq.data, gamma, &self.fz);
            self.rhs.axpy(-1.0, z);

            let Self {
                gmres,
                fz,
                rhs,
                delta,
                zpert,
                fpert,
                ..
            } = self;
            let base: &SerialVector = z;
            let outcome = gmres
                .solve(
                    |v, out| {
                        let vnorm = v.wrms_norm(eq.ewt);
                        if vnorm == 0.0 {
                            out.fill(0.0);
                            return RhsStatus::Success;
                        }
                        let sigma = 1.0 / vnorm;
                        zpert.linear_sum(1.0, base, sigma, v);
                        let status = f(&*zpert, &mut *fpert);
                        if status != RhsStatus::Success {
                            return status;
                        }
                        // (I - γJ) v ≈ v - γ (f(z + σv) - f(z)) / σ
                        out.linear_sum(1.0, &*fpert, -1.0, &*fz);
                        out.scale(-gamma / sigma);
                        out.axpy(1.0, v);
                        RhsStatus::Success
                    },
                    rhs,
                    eq.ewt,
                    lin_tol,
                    delta,
                )
                .map_err(NlsFailure::Rhs)?;
            counts.linear_iters += outcome.iterations;
            if !outcome.converged && outcome.residual >= outcome.initial_residual {
                return Err(NlsFailure::NotConverged);
            }

            z.axpy(1.0, &self.delta);
            counts.nonlinear_iters += 1;

            match test.check(m, self.delta.wrms_norm(eq.ewt)) {
                Verdict::Converged => return Ok(()),
                Verdict::Diverged => return Err(NlsFailure::NotConverged),
                Verdict::Continue => {}
            }
        }
        Err(NlsFailure::NotConverged)
    }
}

// ============================================================================
// Fixed point
// ============================================================================

/// Fixed-point iteration with optional Anderson acceleration.
#[derive(Debug)]
pub(crate) struct FixedPointSolver {
    max_iters: usize,
    anderson: Anderson,
    gz: SerialVector,
    residual: SerialVector,
    znew: SerialVector,
}

impl FixedPointSolver {
    fn solve<F>(
        &mut self,
        mut f: F,
        eq: &StageEquation<'_>,
        z: &mut SerialVector,
        counts: &mut NlsCounts,
    ) -> Result<(), NlsFailure>
    where
        F: FnMut(&SerialVector, &mut SerialVector) -> RhsStatus,
    {
        let mut test = ConvergenceTest::new();
        self.anderson.reset();

        for m in 0..self.max_iters {
            // Φ(z) = a + γ f(z)
            eval(&mut f, z, &mut self.gz)?;
            self.gz.scale(eq.gamma);
            self.gz.axpy(1.0, eq.data);

            self.residual.linear_sum(1.0, &self.gz, -1.0, z);
            self.anderson
                .accelerate(&self.gz, &self.residual, &mut self.znew);

            // Reuse the residual buffer for the update
            self.residual.linear_sum(1.0, &self.znew, -1.0, z);
            z.copy_from(&self.znew);
            counts.nonlinear_iters += 1;

            match test.check(m, self.residual.wrms_norm(eq.ewt)) {
                Verdict::Converged => return Ok(()),
                Verdict::Diverged => return Err(NlsFailure::NotConverged),
                Verdict::Continue => {}
            }
        }
        Err(NlsFailure::NotConverged)
    }
}
