//! Strongly-typed index types for safer stepper APIs.
//!
//! Data-instance slots and stage numbers are both plain `usize` in the
//! arithmetic, so they are wrapped in distinct newtypes to keep the
//! stage bookkeeping of the multi-stage schemes readable.

mod indices;

pub use indices::{InstanceIndex, StageIndex};
