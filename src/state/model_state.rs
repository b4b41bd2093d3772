//! Component/tracer array-of-arrays state.
//!
//! Prognostic dynamical fields (momentum, density, potential temperature, ...)
//! are stored as "components"; transported scalars as "tracers". Each is a
//! dense array over the discretized domain. The number and length of arrays
//! is fixed by a [`StateLayout`] at construction.

/// Shape of a model state: the lengths of every component and tracer array.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateLayout {
    /// Length of each component array
    pub component_lens: Vec<usize>,
    /// Length of each tracer array
    pub tracer_lens: Vec<usize>,
}

impl StateLayout {
    /// Create a layout from explicit array lengths.
    pub fn new(component_lens: Vec<usize>, tracer_lens: Vec<usize>) -> Self {
        Self {
            component_lens,
            tracer_lens,
        }
    }

    /// Layout with `n_components` and `n_tracers` arrays of equal length.
    ///
    /// This is the common case for a column or a horizontal element patch
    /// where every field lives on the same nodes.
    pub fn uniform(n_components: usize, n_tracers: usize, len: usize) -> Self {
        Self {
            component_lens: vec![len; n_components],
            tracer_lens: vec![len; n_tracers],
        }
    }

    /// Number of component arrays.
    pub fn n_components(&self) -> usize {
        self.component_lens.len()
    }

    /// Number of tracer arrays.
    pub fn n_tracers(&self) -> usize {
        self.tracer_lens.len()
    }

    /// Total number of degrees of freedom in the components.
    pub fn component_len(&self) -> usize {
        self.component_lens.iter().sum()
    }

    /// Total number of degrees of freedom in the tracers.
    pub fn tracer_len(&self) -> usize {
        self.tracer_lens.iter().sum()
    }

    /// Total number of degrees of freedom (components + tracers).
    pub fn total_len(&self) -> usize {
        self.component_len() + self.tracer_len()
    }
}

/// One full instance of the model state.
///
/// Vector-space operations (`scale`, `axpy`) act on components and tracers
/// alike. Mixing states of different shape is a programming error and panics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelState {
    /// Prognostic component arrays
    pub components: Vec<Vec<f64>>,
    /// Transported tracer arrays
    pub tracers: Vec<Vec<f64>>,
}

impl ModelState {
    /// Create a zero-initialized state with the given layout.
    pub fn zeros(layout: &StateLayout) -> Self {
        Self {
            components: layout.component_lens.iter().map(|&n| vec![0.0; n]).collect(),
            tracers: layout.tracer_lens.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// Create a state holding only components (no tracer storage).
    pub fn components_only(layout: &StateLayout) -> Self {
        Self {
            components: layout.component_lens.iter().map(|&n| vec![0.0; n]).collect(),
            tracers: Vec::new(),
        }
    }

    /// Create a state from existing arrays.
    pub fn from_arrays(components: Vec<Vec<f64>>, tracers: Vec<Vec<f64>>) -> Self {
        Self {
            components,
            tracers,
        }
    }

    /// Create a zero-initialized state with the same shape.
    pub fn zeros_like(&self) -> Self {
        Self {
            components: self.components.iter().map(|c| vec![0.0; c.len()]).collect(),
            tracers: self.tracers.iter().map(|t| vec![0.0; t.len()]).collect(),
        }
    }

    /// Layout describing this state's shape.
    pub fn layout(&self) -> StateLayout {
        StateLayout {
            component_lens: self.components.iter().map(Vec::len).collect(),
            tracer_lens: self.tracers.iter().map(Vec::len).collect(),
        }
    }

    /// Whether this state has the given layout.
    pub fn matches(&self, layout: &StateLayout) -> bool {
        self.components.len() == layout.component_lens.len()
            && self.tracers.len() == layout.tracer_lens.len()
            && self
                .components
                .iter()
                .zip(&layout.component_lens)
                .all(|(c, &n)| c.len() == n)
            && self
                .tracers
                .iter()
                .zip(&layout.tracer_lens)
                .all(|(t, &n)| t.len() == n)
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.arrays().map(Vec::len).sum()
    }

    /// Whether the state stores no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all arrays, components first.
    pub fn arrays(&self) -> impl Iterator<Item = &Vec<f64>> {
        self.components.iter().chain(self.tracers.iter())
    }

    /// Iterate mutably over all arrays, components first.
    pub fn arrays_mut(&mut self) -> impl Iterator<Item = &mut Vec<f64>> {
        self.components.iter_mut().chain(self.tracers.iter_mut())
    }

    /// Set every value to `value`.
    pub fn fill(&mut self, value: f64) {
        for array in self.arrays_mut() {
            array.fill(value);
        }
    }

    /// Scale the state by a constant: self <- c * self
    pub fn scale(&mut self, c: f64) {
        for array in self.arrays_mut() {
            for v in array.iter_mut() {
                *v *= c;
            }
        }
    }

    /// Add a scaled state: self <- self + c * other
    pub fn axpy(&mut self, c: f64, other: &Self) {
        assert_shape(self, other);
        for (a, b) in self.arrays_mut().zip(other.arrays()) {
            assert_eq!(a.len(), b.len(), "Array length mismatch");
            for (x, y) in a.iter_mut().zip(b.iter()) {
                *x += c * *y;
            }
        }
    }

    /// Copy values from another state of the same shape.
    pub fn copy_from(&mut self, other: &Self) {
        assert_shape(self, other);
        for (a, b) in self.arrays_mut().zip(other.arrays()) {
            a.copy_from_slice(b);
        }
    }

    /// Maximum absolute value over all arrays.
    pub fn max_abs(&self) -> f64 {
        self.arrays()
            .flat_map(|a| a.iter())
            .map(|x| x.abs())
            .fold(0.0, f64::max)
    }

    /// Whether every value is finite.
    pub fn is_finite(&self) -> bool {
        self.arrays().flat_map(|a| a.iter()).all(|x| x.is_finite())
    }
}

fn assert_shape(a: &ModelState, b: &ModelState) {
    assert_eq!(
        a.components.len(),
        b.components.len(),
        "Component count mismatch"
    );
    assert_eq!(a.tracers.len(), b.tracers.len(), "Tracer count mismatch");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lengths() {
        let layout = StateLayout::new(vec![4, 4, 5], vec![3]);
        assert_eq!(layout.n_components(), 3);
        assert_eq!(layout.n_tracers(), 1);
        assert_eq!(layout.component_len(), 13);
        assert_eq!(layout.total_len(), 16);
    }

    #[test]
    fn test_axpy_and_scale() {
        let layout = StateLayout::uniform(2, 1, 3);
        let mut u = ModelState::zeros(&layout);
        u.fill(1.0);
        let v = u.clone();

        u.scale(2.0);
        u.axpy(0.5, &v);

        for array in u.arrays() {
            for &x in array {
                assert!((x - 2.5).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_zeros_like_and_matches() {
        let layout = StateLayout::new(vec![2, 3], vec![1]);
        let mut u = ModelState::zeros(&layout);
        u.fill(7.0);
        let z = u.zeros_like();
        assert!(z.matches(&layout));
        assert_eq!(z.max_abs(), 0.0);
        assert_eq!(u.layout(), layout);
        assert_eq!(u.len(), 6);
    }

    #[test]
    #[should_panic(expected = "Tracer count mismatch")]
    fn test_axpy_shape_mismatch_panics() {
        let mut a = ModelState::zeros(&StateLayout::uniform(1, 1, 2));
        let b = ModelState::zeros(&StateLayout::uniform(1, 0, 2));
        a.axpy(1.0, &b);
    }

    #[test]
    fn test_is_finite() {
        let mut u = ModelState::zeros(&StateLayout::uniform(1, 0, 2));
        assert!(u.is_finite());
        u.components[0][1] = f64::NAN;
        assert!(!u.is_finite());
    }
}
