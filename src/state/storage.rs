//! Model-owned data instances.
//!
//! A multi-stage scheme keeps several full-state buffers alive at once
//! (stage states, stage tendencies, affine combinations). The model allocates
//! them up front from the instance counts the scheme reports, before the
//! first step; the scheme then addresses them by [`InstanceIndex`].

use thiserror::Error;

use crate::types::InstanceIndex;

use super::model_state::{ModelState, StateLayout};

/// Errors raised when storage does not satisfy a scheme's requirements.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    /// Fewer data instances were allocated than the scheme requires.
    #[error("Insufficient {kind} data instances: scheme requires {required}, storage has {available}")]
    InsufficientInstances {
        kind: &'static str,
        required: usize,
        available: usize,
    },

    /// The live state does not match the storage layout.
    #[error("State layout mismatch: expected {expected} values, got {actual}")]
    LayoutMismatch { expected: usize, actual: usize },
}

/// Collection of full-state data instances.
///
/// Instance 0 is the live model state. Instances below the tracer-instance
/// count carry tracer arrays; the remaining ones carry components only.
#[derive(Clone, Debug)]
pub struct StateStorage {
    layout: StateLayout,
    instances: Vec<ModelState>,
    n_tracer_instances: usize,
}

impl StateStorage {
    /// Allocate zeroed storage.
    ///
    /// At least one component instance is always allocated.
    pub fn new(
        layout: StateLayout,
        n_component_instances: usize,
        n_tracer_instances: usize,
    ) -> Self {
        let n_instances = n_component_instances.max(n_tracer_instances).max(1);
        let instances = (0..n_instances)
            .map(|i| {
                if i < n_tracer_instances || i == 0 {
                    ModelState::zeros(&layout)
                } else {
                    ModelState::components_only(&layout)
                }
            })
            .collect();

        Self {
            layout,
            instances,
            n_tracer_instances: n_tracer_instances.max(1),
        }
    }

    /// Allocate storage and place `state` in instance 0.
    pub fn from_state(
        state: ModelState,
        n_component_instances: usize,
        n_tracer_instances: usize,
    ) -> Self {
        let mut storage = Self::new(state.layout(), n_component_instances, n_tracer_instances);
        storage.instances[0] = state;
        storage
    }

    /// Shape of every instance.
    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Number of instances holding component arrays.
    pub fn n_component_instances(&self) -> usize {
        self.instances.len()
    }

    /// Number of instances holding tracer arrays.
    pub fn n_tracer_instances(&self) -> usize {
        self.n_tracer_instances
    }

    /// Check that the storage can serve a scheme requiring the given counts.
    pub fn ensure_instances(
        &self,
        n_component_instances: usize,
        n_tracer_instances: usize,
    ) -> Result<(), StorageError> {
        if self.n_component_instances() < n_component_instances {
            return Err(StorageError::InsufficientInstances {
                kind: "component",
                required: n_component_instances,
                available: self.n_component_instances(),
            });
        }
        if self.layout.n_tracers() > 0 && self.n_tracer_instances < n_tracer_instances {
            return Err(StorageError::InsufficientInstances {
                kind: "tracer",
                required: n_tracer_instances,
                available: self.n_tracer_instances,
            });
        }
        if !self.instances[0].matches(&self.layout) {
            return Err(StorageError::LayoutMismatch {
                expected: self.layout.total_len(),
                actual: self.instances[0].len(),
            });
        }
        Ok(())
    }

    /// The live model state (instance 0).
    pub fn state(&self) -> &ModelState {
        &self.instances[0]
    }

    /// Mutable access to the live model state (instance 0).
    pub fn state_mut(&mut self) -> &mut ModelState {
        &mut self.instances[0]
    }

    /// Borrow an instance.
    pub fn instance(&self, index: InstanceIndex) -> &ModelState {
        &self.instances[index]
    }

    /// Mutably borrow an instance.
    pub fn instance_mut(&mut self, index: InstanceIndex) -> &mut ModelState {
        &mut self.instances[index]
    }

    /// Borrow `src` immutably and `dst` mutably at the same time.
    ///
    /// # Panics
    /// Panics if `src == dst`.
    pub fn pair_mut(
        &mut self,
        src: InstanceIndex,
        dst: InstanceIndex,
    ) -> (&ModelState, &mut ModelState) {
        let (s, d) = (src.get(), dst.get());
        assert_ne!(s, d, "pair_mut requires distinct instances");
        if s < d {
            let (lo, hi) = self.instances.split_at_mut(d);
            (&lo[s], &mut hi[0])
        } else {
            let (lo, hi) = self.instances.split_at_mut(s);
            (&hi[0], &mut lo[d])
        }
    }

    /// Affine combination: `dst = base + Σ c_k * instance[src_k]`.
    ///
    /// `dst` may equal `base` (in-place update); no term may read from `dst`.
    /// Zero coefficients are skipped so unused tendency slots are never read.
    pub fn combine(
        &mut self,
        dst: InstanceIndex,
        base: InstanceIndex,
        terms: &[(f64, InstanceIndex)],
    ) {
        let mut target = std::mem::take(&mut self.instances[dst]);
        if dst != base {
            target.copy_from(&self.instances[base]);
        }
        for &(c, src) in terms {
            assert_ne!(src, dst, "combine term aliases its destination");
            if c != 0.0 {
                target.axpy(c, &self.instances[src]);
            }
        }
        self.instances[dst] = target;
    }

    /// Consume the storage, returning the live state.
    pub fn into_state(mut self) -> ModelState {
        self.instances.swap_remove(0)
    }
}
