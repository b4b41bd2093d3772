//! Owned contiguous vector.

use super::NVector;

/// Contiguous `Vec<f64>`-backed [`NVector`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SerialVector {
    data: Vec<f64>,
}

impl SerialVector {
    /// Zero vector of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    /// Wrap existing data.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Zero vector with the same length.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.data.len())
    }

    /// Unwrap the underlying data.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

impl NVector for SerialVector {
    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl std::ops::Index<usize> for SerialVector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl std::ops::IndexMut<usize> for SerialVector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}
