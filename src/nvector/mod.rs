//! Opaque numerical vectors for the adaptive solver.
//!
//! The adaptive integrator in [`crate::ark`] never sees the model's
//! array-of-arrays layout. It works on flat vectors through the thin
//! [`NVector`] capability (length plus element views); the numerical kernels
//! it needs are provided methods on top of those views.
//!
//! With the `parallel` feature, long vectors are processed with rayon.

mod serial;

pub use serial::SerialVector;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Vectors shorter than this are always processed serially.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 1 << 14;

/// Flat numerical vector used by the adaptive solver.
///
/// Implementors only provide the element views; every operation the solver
/// needs is derived from them.
pub trait NVector {
    /// Number of elements.
    fn len(&self) -> usize;

    /// Immutable element view.
    fn as_slice(&self) -> &[f64];

    /// Mutable element view.
    fn as_mut_slice(&mut self) -> &mut [f64];

    /// Whether the vector has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set every element to `c`.
    fn fill(&mut self, c: f64) {
        self.as_mut_slice().fill(c);
    }

    /// Copy elements from another vector of the same length.
    fn copy_from<V: NVector>(&mut self, other: &V) {
        self.as_mut_slice().copy_from_slice(other.as_slice());
    }

    /// self <- c * self
    fn scale(&mut self, c: f64) {
        for v in self.as_mut_slice() {
            *v *= c;
        }
    }

    /// self <- self + c * x
    fn axpy<V: NVector>(&mut self, c: f64, x: &V) {
        let x = x.as_slice();
        let y = self.as_mut_slice();
        assert_eq!(x.len(), y.len(), "NVector length mismatch");

        #[cfg(feature = "parallel")]
        if y.len() >= PARALLEL_THRESHOLD {
            y.par_iter_mut()
                .zip(x.par_iter())
                .for_each(|(yi, xi)| *yi += c * *xi);
            return;
        }

        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += c * *xi;
        }
    }

    /// self <- a * x + b * y
    fn linear_sum<X, Y>(&mut self, a: f64, x: &X, b: f64, y: &Y)
    where
        X: NVector,
        Y: NVector,
    {
        let (x, y) = (x.as_slice(), y.as_slice());
        let z = self.as_mut_slice();
        assert_eq!(x.len(), z.len(), "NVector length mismatch");
        assert_eq!(y.len(), z.len(), "NVector length mismatch");

        #[cfg(feature = "parallel")]
        if z.len() >= PARALLEL_THRESHOLD {
            z.par_iter_mut()
                .zip(x.par_iter().zip(y.par_iter()))
                .for_each(|(zi, (xi, yi))| *zi = a * *xi + b * *yi);
            return;
        }

        for ((zi, xi), yi) in z.iter_mut().zip(x).zip(y) {
            *zi = a * *xi + b * *yi;
        }
    }

    /// Euclidean inner product.
    fn dot<V: NVector>(&self, other: &V) -> f64 {
        let (x, y) = (self.as_slice(), other.as_slice());
        assert_eq!(x.len(), y.len(), "NVector length mismatch");

        #[cfg(feature = "parallel")]
        if x.len() >= PARALLEL_THRESHOLD {
            return x.par_iter().zip(y.par_iter()).map(|(a, b)| a * b).sum();
        }

        x.iter().zip(y).map(|(a, b)| a * b).sum()
    }

    /// Weighted root-mean-square norm: sqrt(Σ (x_i w_i)² / n).
    fn wrms_norm<W: NVector>(&self, weights: &W) -> f64 {
        let (x, w) = (self.as_slice(), weights.as_slice());
        assert_eq!(x.len(), w.len(), "NVector length mismatch");
        if x.is_empty() {
            return 0.0;
        }

        #[cfg(feature = "parallel")]
        if x.len() >= PARALLEL_THRESHOLD {
            let sum: f64 = x
                .par_iter()
                .zip(w.par_iter())
                .map(|(a, b)| (a * b) * (a * b))
                .sum();
            return (sum / x.len() as f64).sqrt();
        }

        let sum: f64 = x.iter().zip(w).map(|(a, b)| (a * b) * (a * b)).sum();
        (sum / x.len() as f64).sqrt()
    }

    /// Maximum absolute element.
    fn max_norm(&self) -> f64 {
        self.as_slice().iter().map(|x| x.abs()).fold(0.0, f64::max)
    }
}
