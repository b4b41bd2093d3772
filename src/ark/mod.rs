//! Adaptive additive Runge-Kutta integrator.
//!
//! Integrates `y' = f_E(t, y) + f_I(t, y)` on flat [`SerialVector`]s with
//! explicit, implicit or IMEX Runge-Kutta methods from
//! [`crate::tableau`]. Step sizes are chosen from an embedded error estimate
//! unless fixed stepping is requested, in which case each call to
//! [`ArkStep::evolve`] takes exactly one step to the output time.
//!
//! # Submodules
//!
//! - [`error`]: [`ArkError`] with stable numeric codes
//! - [`rhs`]: The [`ArkRhs`] callback trait
//! - `step`: The [`ArkStep`] integrator and its options
//! - `nonlinear`: Newton-GMRES and (accelerated) fixed-point stage solvers
//!
//! # Example
//!
//! ```
//! use imex_ts::ark::{ArkMethod, ArkOptions, ArkRhs, ArkStep, RhsStatus};
//! use imex_ts::nvector::{NVector, SerialVector};
//! use imex_ts::tableau::catalogue;
//!
//! struct Decay;
//!
//! impl ArkRhs for Decay {
//!     fn explicit(&mut self, _t: f64, _y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
//!         ydot.fill(0.0);
//!         RhsStatus::Success
//!     }
//!     fn implicit(&mut self, _t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
//!         ydot.linear_sum(-1.0, y, 0.0, y);
//!         RhsStatus::Success
//!     }
//!     fn full(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
//!         self.implicit(t, y, ydot)
//!     }
//! }
//!
//! let pair = catalogue::ark_pair_by_id(catalogue::ARK324L2SA_DIRK_4_2_3).unwrap();
//! let y0 = SerialVector::from_vec(vec![1.0]);
//! let mut ark = ArkStep::new(ArkMethod::Imex(pair), &y0, 0.0, ArkOptions::default()).unwrap();
//! ark.evolve(1.0, &mut Decay).unwrap();
//! assert!((ark.solution()[0] - (-1.0f64).exp()).abs() < 1e-3);
//! ```

mod anderson;
pub mod error;
mod gmres;
mod nonlinear;
pub mod rhs;
mod step;

pub use error::ArkError;
pub use nonlinear::NonlinearMethod;
pub use rhs::{ArkRhs, RhsStatus};
pub use step::{ArkMethod, ArkOptions, ArkStats, ArkStep};
