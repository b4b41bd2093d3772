//! Anderson acceleration for fixed-point iterations.
//!
//! Keeps the last `depth` differences of residuals `ΔF` and of map values
//! `ΔG`. Each accelerated iterate is `g_k - ΔG α` where `α` minimizes
//! `‖f_k - ΔF α‖₂`, solved through the normal equations.

use faer::{Mat, linalg::solvers::Solve};

use crate::nvector::{NVector, SerialVector};

/// Relative diagonal shift applied to the normal equations.
const REGULARIZATION: f64 = 1e-12;

/// Anderson acceleration history.
#[derive(Debug)]
pub(crate) struct Anderson {
    depth: usize,
    df: Vec<SerialVector>,
    dg: Vec<SerialVector>,
    f_prev: SerialVector,
    g_prev: SerialVector,
    stored: usize,
    next: usize,
    has_prev: bool,
}

impl Anderson {
    /// History of `depth` differences for vectors of length `n`.
    pub fn new(n: usize, depth: usize) -> Self {
        Self {
            depth,
            df: (0..depth).map(|_| SerialVector::zeros(n)).collect(),
            dg: (0..depth).map(|_| SerialVector::zeros(n)).collect(),
            f_prev: SerialVector::zeros(n),
            g_prev: SerialVector::zeros(n),
            stored: 0,
            next: 0,
            has_prev: false,
        }
    }

    /// Number of solver-length vectors held for a given depth.
    pub fn vectors(depth: usize) -> usize {
        2 * depth + 2
    }

    /// Forget the history (start of a new nonlinear solve).
    pub fn reset(&mut self) {
        self.stored = 0;
        self.next = 0;
        self.has_prev = false;
    }

    /// Write the accelerated iterate for map value `g` and residual `f = g - z`.
    pub fn accelerate(&mut self, g: &SerialVector, f: &SerialVector, out: &mut SerialVector) {
        out.copy_from(g);
        if self.depth == 0 {
            return;
        }

        if self.has_prev {
            self.df[self.next].linear_sum(1.0, f, -1.0, &self.f_prev);
            self.dg[self.next].linear_sum(1.0, g, -1.0, &self.g_prev);
            self.next = (self.next + 1) % self.depth;
            self.stored = (self.stored + 1).min(self.depth);
        }
        self.f_prev.copy_from(f);
        self.g_prev.copy_from(g);
        self.has_prev = true;

        if let Some(alpha) = self.coefficients(f) {
            for (a, dg) in alpha.iter().zip(&self.dg) {
                out.axpy(-a, dg);
            }
        }
    }

    /// Least-squares coefficients over the stored differences.
    fn coefficients(&self, f: &SerialVector) -> Option<Vec<f64>> {
        let m = self.stored;
        if m == 0 {
            return None;
        }

        let mut gram = Mat::<f64>::zeros(m, m);
        let mut rhs = Mat::<f64>::zeros(m, 1);
        for i in 0..m {
            for j in 0..=i {
                let v = self.df[i].dot(&self.df[j]);
                gram[(i, j)] = v;
                gram[(j, i)] = v;
            }
            rhs[(i, 0)] = self.df[i].dot(f);
        }

        let diag_max = (0..m).map(|i| gram[(i, i)]).fold(0.0, f64::max);
        if diag_max == 0.0 || !diag_max.is_finite() {
            return None;
        }
        for i in 0..m {
            gram[(i, i)] += REGULARIZATION * diag_max;
        }

        let lu = gram.as_ref().full_piv_lu();
        let alpha = lu.solve(&rhs);
        let alpha: Vec<f64> = (0..m).map(|i| alpha[(i, 0)]).collect();
        alpha.iter().all(|a| a.is_finite()).then_some(alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Affine contraction g(z) = M z + c with fixed point z*.
    fn affine_map(z: &SerialVector) -> SerialVector {
        SerialVector::from_vec(vec![
            0.9 * z[0] + 0.05 * z[1] + 1.0,
            -0.1 * z[0] + 0.8 * z[1] + 0.5,
        ])
    }

    fn iterate(depth: usize, iterations: usize) -> SerialVector {
        let mut anderson = Anderson::new(2, depth);
        let mut z = SerialVector::zeros(2);
        let mut f = SerialVector::zeros(2);
        let mut next = SerialVector::zeros(2);
        for _ in 0..iterations {
            let g = affine_map(&z);
            f.linear_sum(1.0, &g, -1.0, &z);
            anderson.accelerate(&g, &f, &mut next);
            z.copy_from(&next);
        }
        z
    }

    fn fixed_point_error(z: &SerialVector) -> f64 {
        let g = affine_map(z);
        ((g[0] - z[0]).powi(2) + (g[1] - z[1]).powi(2)).sqrt()
    }

    #[test]
    fn test_depth_zero_is_plain_iteration() {
        let mut anderson = Anderson::new(2, 0);
        let g = SerialVector::from_vec(vec![1.0, 2.0]);
        let f = SerialVector::from_vec(vec![0.5, 0.5]);
        let mut out = SerialVector::zeros(2);
        anderson.accelerate(&g, &f, &mut out);
        assert_eq!(out, g);
    }

    #[test]
    fn test_acceleration_beats_picard() {
        let picard = fixed_point_error(&iterate(0, 6));
        let accelerated = fixed_point_error(&iterate(2, 6));
        assert!(
            accelerated < 1e-3 * picard,
            "picard {:e}, anderson {:e}",
            picard,
            accelerated
        );
    }

    #[test]
    fn test_reset_clears_history() {
        let mut anderson = Anderson::new(2, 2);
        let mut out = SerialVector::zeros(2);
        let g = SerialVector::from_vec(vec![1.0, 1.0]);
        let f = SerialVector::from_vec(vec![1.0, 0.0]);
        anderson.accelerate(&g, &f, &mut out);
        anderson.accelerate(&g, &SerialVector::from_vec(vec![0.0, 1.0]), &mut out);
        anderson.reset();
        anderson.accelerate(&g, &f, &mut out);
        assert_eq!(out, g);
    }
}
