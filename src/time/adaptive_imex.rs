//! Adaptive IMEX stepper.
//!
//! Thin wrapper around [`ArkStep`]: the model state is packed into a flat
//! solver vector, the solver advances it to `time + dt` with as many internal
//! steps as its error control requires, and the result is unpacked back into
//! the live state. Tendency evaluations reach the model through a callback bridge
//! which borrows the model only for the duration of one `step` call.

use crate::ark::{ArkError, ArkRhs, ArkStats, ArkStep, RhsStatus};
use crate::model::{TendencyError, TendencyModel};
use crate::nvector::SerialVector;
use crate::state::{ModelState, StateStorage, StateVectorBridge};

use super::config::{AdaptiveImexConfig, ConfigError, ResolvedArkConfig};
use super::error::TimestepError;
use super::scheme::{SchemeInfo, TimestepScheme};

// =============================================================================
// Callback bridge
// =============================================================================

#[derive(Clone, Copy, Debug)]
enum Part {
    Explicit,
    Implicit,
    Full,
}

/// Routes solver callbacks to the model's tendency routines.
struct ModelRhs<'a> {
    model: &'a mut dyn TendencyModel,
    bridge: &'a StateVectorBridge,
    state: &'a mut ModelState,
    tendency: &'a mut ModelState,
    /// Most recent failed evaluation, for error reporting
    last_error: Option<TendencyError>,
}

impl ModelRhs<'_> {
    fn evaluate(&mut self, part: Part, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
        if self.bridge.unpack(y, self.state).is_err() {
            return RhsStatus::Unrecoverable;
        }
        let result = match part {
            Part::Explicit => self.model.explicit_tendency(self.state, t, self.tendency),
            Part::Implicit => self.model.implicit_tendency(self.state, t, self.tendency),
            Part::Full => self.model.full_tendency(self.state, t, self.tendency),
        };
        match result {
            Ok(()) => match self.bridge.pack(self.tendency, ydot) {
                Ok(()) => RhsStatus::Success,
                Err(_) => RhsStatus::Unrecoverable,
            },
            Err(err) => {
                log::debug!("adaptive_imex: {:?} tendency failed at t = {}: {}", part, t, err);
                let status = if err.is_recoverable() {
                    RhsStatus::Recoverable
                } else {
                    RhsStatus::Unrecoverable
                };
                self.last_error = Some(err);
                status
            }
        }
    }
}

impl ArkRhs for ModelRhs<'_> {
    fn explicit(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
        self.evaluate(Part::Explicit, t, y, ydot)
    }

    fn implicit(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
        self.evaluate(Part::Implicit, t, y, ydot)
    }

    fn full(&mut self, t: f64, y: &SerialVector, ydot: &mut SerialVector) -> RhsStatus {
        self.evaluate(Part::Full, t, y, ydot)
    }
}

// =============================================================================
// Solver session
// =============================================================================

/// Solver memory for one state layout.
#[derive(Debug)]
struct Session {
    solver: ArkStep,
    bridge: StateVectorBridge,
    packed: SerialVector,
    state: ModelState,
    tendency: ModelState,
}

impl Session {
    fn start(resolved: &ResolvedArkConfig, state: &ModelState, time: f64) -> Result<Self, TimestepError> {
        let bridge = StateVectorBridge::new(state.layout());
        let mut packed = SerialVector::zeros(bridge.len());
        bridge.pack(state, &mut packed)?;
        let solver = ArkStep::new(resolved.method.clone(), &packed, time, resolved.options)?;
        Ok(Self {
            solver,
            bridge,
            packed,
            state: state.zeros_like(),
            tendency: state.zeros_like(),
        })
    }

    /// Restart from the (possibly externally modified) live state.
    fn resync(&mut self, state: &ModelState, time: f64) -> Result<(), TimestepError> {
        self.bridge.pack(state, &mut self.packed)?;
        self.solver.resync(time, &self.packed);
        Ok(())
    }

    fn advance(
        &mut self,
        model: &mut dyn TendencyModel,
        live: &mut ModelState,
        t_out: f64,
    ) -> Result<(), TimestepError> {
        let mut rhs = ModelRhs {
            model,
            bridge: &self.bridge,
            state: &mut self.state,
            tendency: &mut self.tendency,
            last_error: None,
        };
        if let Err(err) = self.solver.evolve(t_out, &mut rhs) {
            return Err(solver_failure(err, rhs.last_error.take()));
        }
        self.bridge.unpack(self.solver.solution(), live)?;
        Ok(())
    }
}

fn solver_failure(err: ArkError, cause: Option<TendencyError>) -> TimestepError {
    let code = err.code();
    let reason = match (&err, cause) {
        (
            ArkError::RhsFailure { .. }
            | ArkError::FirstRhsFailure { .. }
            | ArkError::RepeatedRhsFailure { .. }
            | ArkError::UnrecoverableRhs { .. },
            Some(cause),
        ) => format!("{} ({})", err.reason(), cause),
        _ => err.reason(),
    };
    log::warn!("adaptive_imex: solver failed with code {}: {}", code, reason);
    TimestepError::Solver { code, reason }
}

// =============================================================================
// AdaptiveImexStepper
// =============================================================================

/// Adaptive additive Runge-Kutta stepper.
///
/// The configuration is validated in [`new`](Self::new); the solver memory is
/// created on the first step (or whenever the state layout changes) and then
/// carries its step-size history from one outer step to the next.
#[derive(Debug)]
pub struct AdaptiveImexStepper {
    config: AdaptiveImexConfig,
    resolved: ResolvedArkConfig,
    session: Option<Session>,
}

impl AdaptiveImexStepper {
    /// Validate `config` and create the stepper.
    pub fn new(config: AdaptiveImexConfig) -> Result<Self, ConfigError> {
        let resolved = config.resolve()?;
        log::info!(
            "adaptive_imex: {} mode, method {} (order {}, {} stages), rtol = {:e}, atol = {:e}, {}",
            resolved.mode,
            resolved.method.name(),
            resolved.method.order(),
            resolved.method.stages(),
            resolved.options.rtol,
            resolved.options.atol,
            if resolved.options.fixed_step {
                "fixed step"
            } else {
                "adaptive step"
            }
        );
        Ok(Self {
            config,
            resolved,
            session: None,
        })
    }

    /// Configuration as given.
    pub fn config(&self) -> &AdaptiveImexConfig {
        &self.config
    }

    /// Validated method and solver options.
    pub fn resolved(&self) -> &ResolvedArkConfig {
        &self.resolved
    }

    /// Solver counters accumulated since the last (re)initialization.
    pub fn stats(&self) -> Option<&ArkStats> {
        self.session.as_ref().map(|s| s.solver.stats())
    }

    /// Discard the solver memory; the next step reinitializes it.
    pub fn reset(&mut self) {
        self.session = None;
    }
}

impl SchemeInfo for AdaptiveImexStepper {
    fn name(&self) -> &'static str {
        "adaptive_imex"
    }

    fn order(&self) -> usize {
        self.resolved.method.order()
    }

    fn n_stages(&self) -> usize {
        self.resolved.method.stages()
    }

    fn stage_times(&self, dt: f64) -> Vec<f64> {
        let (explicit, implicit) = self.resolved.method.tables();
        explicit
            .or(implicit)
            .map(|table| table.c.iter().map(|c| c * dt).collect())
            .unwrap_or_default()
    }
}

/// The solver owns every stage and workspace vector (sized by the `nvectors`
/// budget), so the model allocates only the live instance.
impl TimestepScheme for AdaptiveImexStepper {
    fn component_data_instances(&self) -> usize {
        1
    }

    fn tracer_data_instances(&self) -> usize {
        1
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
        let mut session = match self.session.take() {
            Some(mut session) if !is_first && session.bridge.layout() == storage.layout() => {
                session.resync(storage.state(), time)?;
                session
            }
            _ => {
                log::debug!(
                    "adaptive_imex: initializing solver memory for {} unknowns at t = {}",
                    storage.layout().total_len(),
                    time
                );
                Session::start(&self.resolved, storage.state(), time)?
            }
        };

        let result = session.advance(model, storage.state_mut(), time + dt);
        if result.is_ok() {
            let stats = session.solver.stats();
            log::debug!(
                "adaptive_imex: t = {}, {} steps, {} error-test failures, {} convergence failures",
                time + dt,
                stats.steps,
                stats.error_test_failures,
                stats.convergence_failures
            );
        }
        self.session = Some(session);
        result
    }
}
