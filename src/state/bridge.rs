//! Bridge between the native state layout and flat solver vectors.
//!
//! The flat ordering is every component array in order, followed by every
//! tracer array in order. The bridge is built once from a [`StateLayout`] and
//! reused for every RHS callback, so no offsets are recomputed in the hot path.

use thiserror::Error;

use crate::nvector::NVector;

use super::model_state::{ModelState, StateLayout};

/// Errors from packing or unpacking a state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    /// Vector length does not match the layout.
    #[error("Vector length mismatch: layout has {expected} values, vector has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// State shape does not match the layout.
    #[error("State does not match the bridge layout ({expected} values expected)")]
    ShapeMismatch { expected: usize },
}

/// Flattens a [`ModelState`] into an [`NVector`] and back.
#[derive(Clone, Debug)]
pub struct StateVectorBridge {
    layout: StateLayout,
    total_len: usize,
}

impl StateVectorBridge {
    /// Create a bridge for the given layout.
    pub fn new(layout: StateLayout) -> Self {
        let total_len = layout.total_len();
        Self { layout, total_len }
    }

    /// Layout served by this bridge.
    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Length of the flat vector.
    pub fn len(&self) -> usize {
        self.total_len
    }

    /// Whether the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    fn check<V: NVector>(&self, state: &ModelState, vector: &V) -> Result<(), BridgeError> {
        if vector.len() != self.total_len {
            return Err(BridgeError::LengthMismatch {
                expected: self.total_len,
                actual: vector.len(),
            });
        }
        if !state.matches(&self.layout) {
            return Err(BridgeError::ShapeMismatch {
                expected: self.total_len,
            });
        }
        Ok(())
    }

    /// Copy `state` into `vector`.
    pub fn pack<V: NVector>(&self, state: &ModelState, vector: &mut V) -> Result<(), BridgeError> {
        self.check(state, vector)?;
        let flat = vector.as_mut_slice();
        let mut offset = 0;
        for array in state.arrays() {
            flat[offset..offset + array.len()].copy_from_slice(array);
            offset += array.len();
        }
        Ok(())
    }

    /// Copy `vector` into `state`.
    pub fn unpack<V: NVector>(&self, vector: &V, state: &mut ModelState) -> Result<(), BridgeError> {
        self.check(state, vector)?;
        let flat = vector.as_slice();
        let mut offset = 0;
        for array in state.arrays_mut() {
            let n = array.len();
            array.copy_from_slice(&flat[offset..offset + n]);
            offset += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvector::SerialVector;

    fn sample_state() -> ModelState {
        ModelState::from_arrays(vec![vec![1.0, 2.0], vec![3.0]], vec![vec![4.0, 5.0, 6.0]])
    }

    #[test]
    fn test_pack_ordering() {
        let state = sample_state();
        let bridge = StateVectorBridge::new(state.layout());
        let mut v = SerialVector::zeros(bridge.len());

        bridge.pack(&state, &mut v).unwrap();
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_unpack_restores_layout() {
        let state = sample_state();
        let bridge = StateVectorBridge::new(state.layout());
        let v = SerialVector::from_vec(vec![6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);

        let mut out = state.zeros_like();
        bridge.unpack(&v, &mut out).unwrap();
        assert_eq!(out.components, vec![vec![6.0, 5.0], vec![4.0]]);
        assert_eq!(out.tracers, vec![vec![3.0, 2.0, 1.0]]);
    }

    #[test]
    fn test_length_mismatch() {
        let state = sample_state();
        let bridge = StateVectorBridge::new(state.layout());
        let mut v = SerialVector::zeros(4);

        let err = bridge.pack(&state, &mut v).unwrap_err();
        assert_eq!(
            err,
            BridgeError::LengthMismatch {
                expected: 6,
                actual: 4
            }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let bridge = StateVectorBridge::new(StateLayout::uniform(1, 1, 3));
        let state = ModelState::zeros(&StateLayout::uniform(2, 0, 3));
        let mut v = SerialVector::zeros(6);
        assert!(matches!(
            bridge.pack(&state, &mut v),
            Err(BridgeError::ShapeMismatch { .. })
        ));
    }
}
