//! Native model state and its storage.
//!
//! # Submodules
//!
//! - [`model_state`]: One full state instance (component + tracer arrays)
//! - [`storage`]: Model-owned collection of data instances used as stage buffers
//! - [`bridge`]: Flattening of the native layout into solver vectors and back
//!
//! The model owns a [`StateStorage`] sized from the instance counts a scheme
//! reports; instance 0 is the live state and the remaining instances are
//! scratch space the scheme overwrites every step.

pub mod bridge;
pub mod model_state;
pub mod storage;

pub use bridge::{BridgeError, StateVectorBridge};
pub use model_state::{ModelState, StateLayout};
pub use storage::{StateStorage, StorageError};
