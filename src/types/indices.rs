//! Strongly-typed index newtypes.
//!
//! These types prevent mixing up data-instance slots with Runge-Kutta
//! stage numbers, which are both small integers in the stepper hot path.

use std::fmt;

/// Macro to generate index newtypes with common functionality.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident, $display_prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Create a new index.
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Get the raw index value.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }

            /// First index (0).
            pub const ZERO: Self = Self(0);

            /// Offset the index by `n`.
            #[inline]
            pub const fn offset(self, n: usize) -> Self {
                Self(self.0 + n)
            }

            /// Create an iterator over [0, n) indices.
            pub fn iter(n: usize) -> impl ExactSizeIterator<Item = $name> {
                (0..n).map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                Self(index)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(idx: $name) -> usize {
                idx.0
            }
        }

        impl<T> std::ops::Index<$name> for [T] {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::IndexMut<$name> for [T] {
            #[inline]
            fn index_mut(&mut self, idx: $name) -> &mut T {
                &mut self[idx.0]
            }
        }

        impl<T> std::ops::Index<$name> for Vec<T> {
            type Output = T;
            #[inline]
            fn index(&self, idx: $name) -> &T {
                &self[idx.0]
            }
        }

        impl<T> std::ops::IndexMut<$name> for Vec<T> {
            #[inline]
            fn index_mut(&mut self, idx: $name) -> &mut T {
                &mut self[idx.0]
            }
        }
    };
}

define_index!(
    /// Slot of a full-state data instance in [`StateStorage`](crate::state::StateStorage).
    ///
    /// Instance 0 always holds the live model state.
    ///
    /// # Example
    ///
    /// ```
    /// use imex_ts::types::InstanceIndex;
    ///
    /// let slot = InstanceIndex::new(3);
    /// assert_eq!(slot.get(), 3);
    /// assert_eq!(slot.to_string(), "I3");
    /// ```
    InstanceIndex,
    "I"
);

define_index!(
    /// Runge-Kutta stage number, 0 being the step's initial state.
    ///
    /// # Example
    ///
    /// ```
    /// use imex_ts::types::StageIndex;
    ///
    /// let stages: Vec<_> = StageIndex::iter(4).collect();
    /// assert_eq!(stages.len(), 4);
    /// assert_eq!(stages[3].get(), 3);
    /// ```
    StageIndex,
    "S"
);

impl InstanceIndex {
    /// The live model state.
    pub const STATE: Self = Self::ZERO;
}
