//! Reference driver loop and runtime scheme selection.

use crate::model::TendencyModel;
use crate::state::{ModelState, StateStorage};

use super::adaptive_imex::AdaptiveImexStepper;
use super::ars343::Ars343;
use super::config::{AdaptiveImexConfig, ConfigError};
use super::error::TimestepError;
use super::scheme::{BoxedScheme, TimestepScheme};

/// Relative tolerance (in units of `dt`) for landing on the end time.
const END_TIME_FUZZ: f64 = 1e-10;

/// Scheme selection made once at start-up.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemeKind {
    /// Fixed-step ARS(3,4,3)
    Ars343,
    /// Adaptive additive Runge-Kutta with the given options
    AdaptiveImex(AdaptiveImexConfig),
}

/// Build the selected scheme.
pub fn create_timestep_scheme(kind: SchemeKind) -> Result<BoxedScheme, ConfigError> {
    let scheme: BoxedScheme = match kind {
        SchemeKind::Ars343 => Box::new(Ars343::new()),
        SchemeKind::AdaptiveImex(config) => Box::new(AdaptiveImexStepper::new(config)?),
    };
    Ok(scheme)
}

/// Outcome of a completed run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationSummary {
    /// Time reached (equal to the requested end time)
    pub t_final: f64,
    /// Number of outer steps taken
    pub n_steps: usize,
}

/// Advance `storage` from `t_start` to `t_end` with outer steps of `dt`.
///
/// The last step is shortened to land exactly on `t_end`.
pub fn run_simulation(
    scheme: &mut dyn TimestepScheme,
    model: &mut dyn TendencyModel,
    storage: &mut StateStorage,
    t_start: f64,
    t_end: f64,
    dt: f64,
) -> Result<SimulationSummary, TimestepError> {
    run_simulation_with(scheme, model, storage, t_start, t_end, dt, |_, _, _| {})
}

/// [`run_simulation`] with a callback `(step, time, state)` after every step.
pub fn run_simulation_with<C>(
    scheme: &mut dyn TimestepScheme,
    model: &mut dyn TendencyModel,
    storage: &mut StateStorage,
    t_start: f64,
    t_end: f64,
    dt: f64,
    mut callback: C,
) -> Result<SimulationSummary, TimestepError>
where
    C: FnMut(usize, f64, &ModelState),
{
    if !(dt.is_finite() && dt > 0.0) {
        return Err(ConfigError::InvalidParameter {
            name: "dt",
            reason: format!("{} is not a positive finite step", dt),
        }
        .into());
    }
    if !(t_start.is_finite() && t_end.is_finite() && t_end >= t_start) {
        return Err(ConfigError::InvalidParameter {
            name: "t_end",
            reason: format!("cannot integrate from {} to {}", t_start, t_end),
        }
        .into());
    }

    log::info!(
        "Starting {} run: t = {} -> {}, dt = {}",
        scheme.name(),
        t_start,
        t_end,
        dt
    );

    let fuzz = END_TIME_FUZZ * dt;
    let mut t = t_start;
    let mut n_steps = 0;

    while t < t_end - fuzz {
        let remaining = t_end - t;
        let is_last = dt >= remaining - fuzz;
        let step_dt = if is_last { remaining } else { dt };

        scheme.step(model, storage, n_steps == 0, is_last, t, step_dt)?;

        t = if is_last { t_end } else { t + step_dt };
        n_steps += 1;
        callback(n_steps, t, storage.state());
    }

    log::info!("Finished {} run: {} steps, t = {}", scheme.name(), n_steps, t);

    Ok(SimulationSummary {
        t_final: t,
        n_steps,
    })
}
