//! Fixed-step ARS(3,4,3) IMEX Runge-Kutta scheme.
//!
//! Four stages, third order, L-stable implicit part with constant diagonal γ.
//! The first stage is the incoming state; stages 1-3 each require one
//! diagonally-implicit solve by the model:
//!
//! ```text
//! P_i = U⁰ + dt Σ_{j<i} â_ij F̂_j + dt Σ_{1≤j<i} a_ij F_j
//! U_i = P_i + dt γ F(U_i)                         (model stage solve)
//! F̂_i = F_E(U_i),  F_i = F_I(U_i)
//! U¹  = U⁰ + dt Σ_j b_j (F̂_j + F_j)
//! ```
//!
//! Stage tendencies live in model-owned data instances:
//!
//! | Instance | Content                         |
//! |----------|---------------------------------|
//! | 0        | live state U⁰ (overwritten by U¹) |
//! | 1        | predictor P_i                   |
//! | 2        | stage state U_i                 |
//! | 3..=6    | explicit tendencies F̂_0..F̂_3    |
//! | 7..=9    | implicit tendencies F_1..F_3    |

use crate::model::TendencyModel;
use crate::state::StateStorage;
use crate::tableau::TableauError;
use crate::tableau::ars::{
    ARS343_C, ARS343_EXPLICIT, ARS343_IMPLICIT, ARS343_STAGES, ARS343_WEIGHTS,
};
use crate::tableau::validate_imex;
use crate::types::InstanceIndex;

use super::error::TimestepError;
use super::scheme::{SchemeInfo, TimestepScheme};

const PREDICTOR: InstanceIndex = InstanceIndex::new(1);
const STAGE: InstanceIndex = InstanceIndex::new(2);
const EXPLICIT_BASE: usize = 3;
const IMPLICIT_BASE: usize = EXPLICIT_BASE + ARS343_STAGES - 1;

/// Slot of the explicit tendency of stage `i` (0..=3).
const fn explicit_slot(i: usize) -> InstanceIndex {
    InstanceIndex::new(EXPLICIT_BASE + i)
}

/// Slot of the implicit tendency of stage `i` (1..=3).
const fn implicit_slot(i: usize) -> InstanceIndex {
    InstanceIndex::new(IMPLICIT_BASE + i)
}

/// ARS(3,4,3) additive Runge-Kutta stepper.
#[derive(Clone, Debug, Default)]
pub struct Ars343 {
    steps_taken: usize,
}

impl Ars343 {
    /// Data instances used (state, predictor, stage, 4 + 3 tendencies).
    pub const N_INSTANCES: usize = IMPLICIT_BASE + ARS343_STAGES;

    /// Create the stepper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the coefficient tables.
    pub fn validate_tableau() -> Result<(), TableauError> {
        validate_imex("ARS(3,4,3)", &ARS343_EXPLICIT, &ARS343_IMPLICIT, &ARS343_C)
    }

    /// Number of completed steps.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }
}

impl SchemeInfo for Ars343 {
    fn name(&self) -> &'static str {
        "ars343"
    }

    fn order(&self) -> usize {
        3
    }

    fn n_stages(&self) -> usize {
        ARS343_STAGES
    }

    fn stage_times(&self, dt: f64) -> Vec<f64> {
        ARS343_C.iter().map(|c| c * dt).collect()
    }
}

impl TimestepScheme for Ars343 {
    fn component_data_instances(&self) -> usize {
        Self::N_INSTANCES
    }

    fn tracer_data_instances(&self) -> usize {
        Self::N_INSTANCES
    }

    fn step(
        &mut self,
        model: &mut dyn TendencyModel,
        storage: &mut StateStorage,
        is_first: bool,
        _is_last: bool,
        time: f64,
        dt: f64,
    ) -> Result<(), TimestepError> {
        storage.ensure_instances(Self::N_INSTANCES, Self::N_INSTANCES)?;
        if is_first {
            log::info!(
                "ars343: {} data instances, γ = {}",
                Self::N_INSTANCES,
                ARS343_IMPLICIT[1][1]
            );
        }

        // Stage 0: the incoming state
        {
            let (u0, f0) = storage.pair_mut(InstanceIndex::STATE, explicit_slot(0));
            model
                .explicit_tendency(u0, time, f0)
                .map_err(|e| TimestepError::tendency(0, time, e))?;
        }

        for i in 1..ARS343_STAGES {
            let t_stage = time + ARS343_C[i] * dt;

            // Predictor from all earlier tendencies
            let mut terms = [(0.0, InstanceIndex::STATE); 2 * ARS343_STAGES];
            let mut n_terms = 0;
            for j in 0..i {
                terms[n_terms] = (dt * ARS343_EXPLICIT[i][j], explicit_slot(j));
                n_terms += 1;
                if j > 0 {
                    terms[n_terms] = (dt * ARS343_IMPLICIT[i][j], implicit_slot(j));
                    n_terms += 1;
                }
            }
            storage.combine(PREDICTOR, InstanceIndex::STATE, &terms[..n_terms]);

            // U_i = P_i + dt γ F_I(U_i)
            let dt_gamma = dt * ARS343_IMPLICIT[i][i];
            {
                let (predictor, stage) = storage.pair_mut(PREDICTOR, STAGE);
                model
                    .solve_implicit_stage(predictor, t_stage, dt_gamma, stage)
                    .map_err(|e| TimestepError::stage_solve(i, t_stage, e))?;
            }

            {
                let (stage, f_implicit) = storage.pair_mut(STAGE, implicit_slot(i));
                model
                    .implicit_tendency(stage, t_stage, f_implicit)
                    .map_err(|e| TimestepError::tendency(i, t_stage, e))?;
            }
            {
                let (stage, f_explicit) = storage.pair_mut(STAGE, explicit_slot(i));
                model
                    .explicit_tendency(stage, t_stage, f_explicit)
                    .map_err(|e| TimestepError::tendency(i, t_stage, e))?;
            }

            log::debug!("ars343: stage {} done at t = {}", i, t_stage);
        }

        // U¹ = U⁰ + dt Σ b_j (F̂_j + F_j)
        let mut terms = [(0.0, InstanceIndex::STATE); 2 * ARS343_STAGES];
        let mut n_terms = 0;
        for (j, &b) in ARS343_WEIGHTS.iter().enumerate() {
            terms[n_terms] = (dt * b, explicit_slot(j));
            n_terms += 1;
            if j > 0 {
                terms[n_terms] = (dt * b, implicit_slot(j));
                n_terms += 1;
            }
        }
        storage.combine(InstanceIndex::STATE, InstanceIndex::STATE, &terms[..n_terms]);

        self.steps_taken += 1;
        Ok(())
    }
}
