//! Restarted GMRES on a diagonally scaled system.
//!
//! Solves `A x = b` where `A` is only available as an operator, working on
//! the scaled system `(S A S⁻¹)(S x) = S b` with `S = diag(scale)`. With the
//! solver's error weights as `S`, the scaled 2-norm is the weighted RMS norm
//! times `sqrt(n)`.

use super::rhs::RhsStatus;
use crate::nvector::{NVector, SerialVector};

/// Result of a GMRES solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GmresOutcome {
    /// Total Krylov iterations across restarts
    pub iterations: usize,
    /// Scaled 2-norm of the final residual
    pub residual: f64,
    /// Scaled 2-norm of the initial residual
    pub initial_residual: f64,
    /// Whether the tolerance was met
    pub converged: bool,
}

/// GMRES workspace.
#[derive(Debug)]
pub(crate) struct Gmres {
    max_krylov: usize,
    max_restarts: usize,
    basis: Vec<SerialVector>,
    hessenberg: Vec<Vec<f64>>,
    givens: Vec<(f64, f64)>,
    g: Vec<f64>,
    y: Vec<f64>,
    xs: SerialVector,
    unscaled: SerialVector,
    av: SerialVector,
}

impl Gmres {
    /// Allocate a workspace for vectors of length `n`.
    pub fn new(n: usize, max_krylov: usize, max_restarts: usize) -> Self {
        let max_krylov = max_krylov.max(1);
        Self {
            max_krylov,
            max_restarts,
            basis: (0..=max_krylov).map(|_| SerialVector::zeros(n)).collect(),
            hessenberg: vec![vec![0.0; max_krylov]; max_krylov + 1],
            givens: vec![(1.0, 0.0); max_krylov],
            g: vec![0.0; max_krylov + 1],
            y: vec![0.0; max_krylov],
            xs: SerialVector::zeros(n),
            unscaled: SerialVector::zeros(n),
            av: SerialVector::zeros(n),
        }
    }

    /// Number of solver-length vectors a workspace of this size holds.
    pub fn vectors(max_krylov: usize) -> usize {
        max_krylov.max(1) + 1 + 3
    }

    /// Solve `A x = b` to scaled 2-norm tolerance `tol`, starting from zero.
    ///
    /// If the tolerance is not met the best iterate found is still written
    /// to `x`; the caller decides whether a reduced residual is acceptable.
    pub fn solve<F>(
        &mut self,
        mut op: F,
        b: &SerialVector,
        scale: &SerialVector,
        tol: f64,
        x: &mut SerialVector,
    ) -> Result<GmresOutcome, RhsStatus>
    where
        F: FnMut(&SerialVector, &mut SerialVector) -> RhsStatus,
    {
        let s = scale.as_slice();
        self.xs.fill(0.0);
        for ((r, bi), si) in self.basis[0].as_mut_slice().iter_mut().zip(b.as_slice()).zip(s) {
            *r = si * bi;
        }
        let mut beta = norm2(&self.basis[0]);
        let initial_residual = beta;

        let mut outcome = GmresOutcome {
            iterations: 0,
            residual: beta,
            initial_residual,
            converged: beta <= tol,
        };
        if outcome.converged {
            x.fill(0.0);
            return Ok(outcome);
        }

        for cycle in 0..=self.max_restarts {
            self.basis[0].scale(1.0 / beta);
            self.g.fill(0.0);
            self.g[0] = beta;

            let mut k_used = 0;
            for k in 0..self.max_krylov {
                for ((u, v), si) in self
                    .unscaled
                    .as_mut_slice()
                    .iter_mut()
                    .zip(self.basis[k].as_slice())
                    .zip(s)
                {
                    *u = v / si;
                }
                check(op(&self.unscaled, &mut self.av))?;

                let (head, tail) = self.basis.split_at_mut(k + 1);
                let w = &mut tail[0];
                for ((wi, ai), si) in w.as_mut_slice().iter_mut().zip(self.av.as_slice()).zip(s) {
                    *wi = si * ai;
                }

                // Modified Gram-Schmidt
                for (j, vj) in head.iter().enumerate() {
                    let h = w.dot(vj);
                    self.hessenberg[j][k] = h;
                    w.axpy(-h, vj);
                }
                let h_next = norm2(w);
                self.hessenberg[k + 1][k] = h_next;

                for j in 0..k {
                    let (c, sn) = self.givens[j];
                    let upper = self.hessenberg[j][k];
                    let lower = self.hessenberg[j + 1][k];
                    self.hessenberg[j][k] = c * upper + sn * lower;
                    self.hessenberg[j + 1][k] = -sn * upper + c * lower;
                }
                let (c, sn) = givens_rotation(self.hessenberg[k][k], h_next);
                self.givens[k] = (c, sn);
                self.hessenberg[k][k] = c * self.hessenberg[k][k] + sn * h_next;
                self.hessenberg[k + 1][k] = 0.0;
                self.g[k + 1] = -sn * self.g[k];
                self.g[k] *= c;

                outcome.iterations += 1;
                outcome.residual = self.g[k + 1].abs();
                k_used = k + 1;

                if outcome.residual <= tol {
                    outcome.converged = true;
                    break;
                }
                if h_next <= f64::EPSILON * beta {
                    break;
                }
                w.scale(1.0 / h_next);
            }

            self.update_solution(k_used);

            if outcome.converged || cycle == self.max_restarts {
                break;
            }

            // Restart from the true residual
            for ((u, v), si) in self
                .unscaled
                .as_mut_slice()
                .iter_mut()
                .zip(self.xs.as_slice())
                .zip(s)
            {
                *u = v / si;
            }
            check(op(&self.unscaled, &mut self.av))?;
            for (((r, bi), ai), si) in self.basis[0]
                .as_mut_slice()
                .iter_mut()
                .zip(b.as_slice())
                .zip(self.av.as_slice())
                .zip(s)
            {
                *r = si * (bi - ai);
            }
            beta = norm2(&self.basis[0]);
            outcome.residual = beta;
            if beta <= tol {
                outcome.converged = true;
                break;
            }
        }

        for ((xi, v), si) in x.as_mut_slice().iter_mut().zip(self.xs.as_slice()).zip(s) {
            *xi = v / si;
        }
        Ok(outcome)
    }

    /// Back-substitute the rotated Hessenberg system and add the correction.
    fn update_solution(&mut self, k: usize) {
        for i in (0..k).rev() {
            let mut sum = self.g[i];
            for j in (i + 1)..k {
                sum -= self.hessenberg[i][j] * self.y[j];
            }
            self.y[i] = sum / self.hessenberg[i][i];
        }
        for (j, &yj) in self.y.iter().take(k).enumerate() {
            self.xs.axpy(yj, &self.basis[j]);
        }
    }
}

fn check(status: RhsStatus) -> Result<(), RhsStatus> {
    match status {
        RhsStatus::Success => Ok(()),
        failure => Err(failure),
    }
}

fn norm2(v: &SerialVector) -> f64 {
    v.dot(v).sqrt()
}

/// Rotation (c, s) zeroing `b` in the pair (a, b).
fn givens_rotation(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        (1.0, 0.0)
    } else if b.abs() > a.abs() {
        let t = a / b;
        let s = 1.0 / (1.0 + t * t).sqrt();
        (s * t, s)
    } else {
        let t = b / a;
        let c = 1.0 / (1.0 + t * t).sqrt();
        (c, c * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matvec(a: &[[f64; 3]; 3], v: &SerialVector, out: &mut SerialVector) {
        for i in 0..3 {
            out[i] = (0..3).map(|j| a[i][j] * v[j]).sum();
        }
    }

    #[test]
    fn test_solves_small_nonsymmetric_system() {
        let a = [[4.0, 1.0, 0.0], [2.0, 5.0, 1.0], [0.0, -1.0, 3.0]];
        let x_true = SerialVector::from_vec(vec![1.0, -2.0, 0.5]);
        let mut b = SerialVector::zeros(3);
        matvec(&a, &x_true, &mut b);

        let scale = SerialVector::from_vec(vec![1.0, 10.0, 0.1]);
        let mut gmres = Gmres::new(3, 3, 0);
        let mut x = SerialVector::zeros(3);
        let outcome = gmres
            .solve(
                |v, out| {
                    matvec(&a, v, out);
                    RhsStatus::Success
                },
                &b,
                &scale,
                1e-12,
                &mut x,
            )
            .expect("operator succeeds");

        assert!(outcome.converged);
        assert!(outcome.iterations <= 3);
        for i in 0..3 {
            assert!((x[i] - x_true[i]).abs() < 1e-10, "x[{}] = {}", i, x[i]);
        }
    }

    #[test]
    fn test_restarts_reach_solution() {
        let a = [[3.0, 1.0, 1.0], [0.5, 4.0, 1.0], [1.0, 0.0, 5.0]];
        let b = SerialVector::from_vec(vec![1.0, 2.0, 3.0]);
        let scale = SerialVector::from_vec(vec![1.0; 3]);
        let mut gmres = Gmres::new(3, 1, 40);
        let mut x = SerialVector::zeros(3);
        let outcome = gmres
            .solve(
                |v, out| {
                    matvec(&a, v, out);
                    RhsStatus::Success
                },
                &b,
                &scale,
                1e-10,
                &mut x,
            )
            .expect("operator succeeds");

        assert!(outcome.converged, "residual {}", outcome.residual);
        let mut ax = SerialVector::zeros(3);
        matvec(&a, &x, &mut ax);
        for i in 0..3 {
            assert!((ax[i] - b[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_zero_rhs_short_circuits() {
        let mut gmres = Gmres::new(2, 2, 0);
        let mut x = SerialVector::from_vec(vec![5.0, 5.0]);
        let outcome = gmres
            .solve(
                |_, _| RhsStatus::Unrecoverable,
                &SerialVector::zeros(2),
                &SerialVector::from_vec(vec![1.0, 1.0]),
                1e-8,
                &mut x,
            )
            .expect("operator never called");
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(x.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_operator_failure_propagates() {
        let mut gmres = Gmres::new(2, 2, 0);
        let mut x = SerialVector::zeros(2);
        let result = gmres.solve(
            |_, _| RhsStatus::Recoverable,
            &SerialVector::from_vec(vec![1.0, 0.0]),
            &SerialVector::from_vec(vec![1.0, 1.0]),
            1e-8,
            &mut x,
        );
        assert_eq!(result, Err(RhsStatus::Recoverable));
    }
}
