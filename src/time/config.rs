//! Configuration of the adaptive IMEX stepper.
//!
//! [`AdaptiveImexConfig`] mirrors the recognized command-line/namelist
//! options. It is resolved once, at stepper construction, into a concrete
//! method and solver options; every invalid combination is reported there
//! rather than at the first step.

use std::fmt;

use thiserror::Error;

use crate::ark::{ArkMethod, ArkOptions, NonlinearMethod};
use crate::tableau::{TableKind, catalogue};

/// Default Krylov dimension when `linear_iters` is 0.
const DEFAULT_LINEAR_ITERS: usize = 5;

/// Invalid adaptive-stepper configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Fully explicit and fully implicit both requested.
    #[error("Conflicting integration modes: fully explicit and fully implicit both requested")]
    ConflictingModes,

    /// Tolerance is zero, negative or not finite.
    #[error("Invalid {name} = {value}: must be positive and finite")]
    InvalidTolerance { name: &'static str, value: f64 },

    /// Unknown or negative catalogue table id.
    #[error("Invalid Butcher table id {id}: {reason}")]
    InvalidTable { id: i32, reason: &'static str },

    /// Unknown or negative user table id.
    #[error("Invalid user Butcher table id {id}: expected 1 (ARS232), 2 (ARS343) or 3 (ARS443)")]
    InvalidUserTable { id: i32 },

    /// Table cannot be used in the requested mode.
    #[error("Butcher table {id} ({kind:?}) cannot be used in {mode} mode")]
    TableModeMismatch {
        id: i32,
        kind: TableKind,
        mode: IntegrationMode,
    },

    /// No default method of the requested order.
    #[error("No default {mode} method of order {order}")]
    UnsupportedOrder { mode: IntegrationMode, order: usize },

    /// Anderson depth given without fixed-point iteration.
    #[error("Anderson acceleration depth {0} requires the fixed-point nonlinear solver")]
    AccelerationWithoutFixedPoint(usize),

    /// Solver workspace exceeds the vector budget.
    #[error("Solver workspace needs {required} vectors but only {available} are configured")]
    InsufficientVectors { required: usize, available: usize },

    /// Other out-of-range parameter.
    #[error("Invalid {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

/// Which right-hand side parts the adaptive solver integrates and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrationMode {
    /// Explicit tendency explicitly, implicit tendency implicitly
    Imex,
    /// Full tendency explicitly
    FullyExplicit,
    /// Full tendency implicitly
    FullyImplicit,
}

impl fmt::Display for IntegrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntegrationMode::Imex => "IMEX",
            IntegrationMode::FullyExplicit => "fully explicit",
            IntegrationMode::FullyImplicit => "fully implicit",
        })
    }
}

/// Adaptive IMEX stepper options.
///
/// Integer ids and iteration counts use 0 for "library default".
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptiveImexConfig {
    /// Solver vector budget
    pub nvectors: usize,
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Integrate the full tendency explicitly
    pub fully_explicit: bool,
    /// Integrate the full tendency implicitly
    pub fully_implicit: bool,
    /// Use fixed-point iteration instead of Newton
    pub anderson_fixed_point: bool,
    /// Anderson acceleration depth (fixed point only)
    pub anderson_vectors: usize,
    /// Maximum nonlinear iterations per stage (0 = default)
    pub nonlinear_iters: usize,
    /// Maximum Krylov dimension (0 = default)
    pub linear_iters: usize,
    /// GMRES restarts
    pub gmres_restarts: usize,
    /// Catalogue table id (0 = default for `order`)
    pub butcher_table: i32,
    /// User IMEX table id, forces fixed stepping (0 = none)
    pub set_butcher_table: i32,
    /// Order of the default method
    pub order: usize,
    /// Maximum internal steps per outer step
    pub max_steps: usize,
}

impl Default for AdaptiveImexConfig {
    fn default() -> Self {
        Self {
            nvectors: 50,
            rtol: 1e-4,
            atol: 1e-6,
            fully_explicit: false,
            fully_implicit: false,
            anderson_fixed_point: false,
            anderson_vectors: 0,
            nonlinear_iters: 0,
            linear_iters: 0,
            gmres_restarts: 0,
            butcher_table: 0,
            set_butcher_table: 0,
            order: 3,
            max_steps: 500,
        }
    }
}

impl AdaptiveImexConfig {
    /// Set scalar tolerances.
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Integrate the full tendency explicitly.
    pub fn fully_explicit(mut self) -> Self {
        self.fully_explicit = true;
        self
    }

    /// Integrate the full tendency implicitly.
    pub fn fully_implicit(mut self) -> Self {
        self.fully_implicit = true;
        self
    }

    /// Use fixed-point iteration with `depth` Anderson vectors.
    pub fn with_anderson(mut self, depth: usize) -> Self {
        self.anderson_fixed_point = true;
        self.anderson_vectors = depth;
        self
    }

    /// Select a catalogue table.
    pub fn with_butcher_table(mut self, id: i32) -> Self {
        self.butcher_table = id;
        self
    }

    /// Select a user IMEX table (fixed stepping).
    pub fn with_user_table(mut self, id: i32) -> Self {
        self.set_butcher_table = id;
        self
    }

    /// Set the order of the default method.
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Set iteration caps (0 keeps the library default).
    pub fn with_iterations(mut self, nonlinear: usize, linear: usize) -> Self {
        self.nonlinear_iters = nonlinear;
        self.linear_iters = linear;
        self
    }

    /// Set the solver vector budget.
    pub fn with_nvectors(mut self, nvectors: usize) -> Self {
        self.nvectors = nvectors;
        self
    }

    /// Set the internal step limit per outer step.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Integration mode implied by the flags.
    pub fn mode(&self) -> Result<IntegrationMode, ConfigError> {
        match (self.fully_explicit, self.fully_implicit) {
            (true, true) => Err(ConfigError::ConflictingModes),
            (true, false) => Ok(IntegrationMode::FullyExplicit),
            (false, true) => Ok(IntegrationMode::FullyImplicit),
            (false, false) => Ok(IntegrationMode::Imex),
        }
    }

    /// Whether the configuration forces fixed stepping.
    pub fn is_fixed_step(&self) -> bool {
        self.set_butcher_table != 0
    }

    /// Validate and resolve into a concrete method and solver options.
    pub fn resolve(&self) -> Result<ResolvedArkConfig, ConfigError> {
        for (name, value) in [("rtol", self.rtol), ("atol", self.atol)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        let mode = self.mode()?;
        if self.anderson_vectors > 0 && !self.anderson_fixed_point {
            return Err(ConfigError::AccelerationWithoutFixedPoint(
                self.anderson_vectors,
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_steps",
                reason: "must be positive".into(),
            });
        }

        let nonlinear = if self.anderson_fixed_point {
            NonlinearMethod::FixedPoint {
                acceleration: self.anderson_vectors,
            }
        } else {
            NonlinearMethod::Newton {
                max_krylov: if self.linear_iters == 0 {
                    DEFAULT_LINEAR_ITERS
                } else {
                    self.linear_iters
                },
                max_restarts: self.gmres_restarts,
            }
        };

        let method = self.select_method(mode)?;

        let options = ArkOptions::default()
            .with_tolerances(self.rtol, self.atol)
            .with_nonlinear(nonlinear)
            .with_fixed_step(self.is_fixed_step())
            .with_max_steps(self.max_steps);
        let options = if self.nonlinear_iters == 0 {
            options
        } else {
            options.with_max_nonlinear_iters(self.nonlinear_iters)
        };

        let required = method.workspace_vectors(nonlinear);
        if required > self.nvectors {
            return Err(ConfigError::InsufficientVectors {
                required,
                available: self.nvectors,
            });
        }

        Ok(ResolvedArkConfig {
            mode,
            method,
            options,
        })
    }

    fn select_method(&self, mode: IntegrationMode) -> Result<ArkMethod, ConfigError> {
        if self.set_butcher_table != 0 {
            let pair = catalogue::user_pair(self.set_butcher_table).ok_or(
                ConfigError::InvalidUserTable {
                    id: self.set_butcher_table,
                },
            )?;
            return Ok(match mode {
                IntegrationMode::Imex => ArkMethod::Imex(pair),
                IntegrationMode::FullyExplicit => ArkMethod::Explicit(pair.explicit),
                IntegrationMode::FullyImplicit => ArkMethod::Implicit(pair.implicit),
            });
        }

        let id = self.butcher_table;
        // Class by id range; mismatches are rejected before the table is built
        let kind = catalogue::kind_of_id(id).ok_or(ConfigError::InvalidTable {
            id,
            reason: "ids are non-negative",
        })?;
        if id == 0 {
            return self.default_method(mode);
        }

        let mismatch = ConfigError::TableModeMismatch { id, kind, mode };
        match (mode, kind) {
            (IntegrationMode::FullyExplicit, TableKind::Explicit)
            | (IntegrationMode::FullyImplicit, TableKind::DiagonallyImplicit)
            | (IntegrationMode::Imex, _) => {}
            _ => return Err(mismatch),
        }

        let table = catalogue::table_by_id(id).ok_or(ConfigError::InvalidTable {
            id,
            reason: "not in the catalogue",
        })?;
        match mode {
            IntegrationMode::FullyExplicit => Ok(ArkMethod::Explicit(table)),
            IntegrationMode::FullyImplicit => Ok(ArkMethod::Implicit(table)),
            IntegrationMode::Imex => catalogue::ark_pair_by_id(id)
                .map(ArkMethod::Imex)
                .ok_or(mismatch),
        }
    }

    fn default_method(&self, mode: IntegrationMode) -> Result<ArkMethod, ConfigError> {
        let unsupported = ConfigError::UnsupportedOrder {
            mode,
            order: self.order,
        };
        let table = |id: Option<i32>| {
            id.and_then(catalogue::table_by_id)
                .ok_or_else(|| unsupported.clone())
        };
        match mode {
            IntegrationMode::FullyExplicit => {
                table(catalogue::default_erk(self.order)).map(ArkMethod::Explicit)
            }
            IntegrationMode::FullyImplicit => {
                table(catalogue::default_dirk(self.order)).map(ArkMethod::Implicit)
            }
            IntegrationMode::Imex => catalogue::default_ark(self.order)
                .and_then(|(_, implicit)| catalogue::ark_pair_by_id(implicit))
                .map(ArkMethod::Imex)
                .ok_or(unsupported),
        }
    }
}

/// Validated adaptive configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedArkConfig {
    /// Integration mode
    pub mode: IntegrationMode,
    /// Method handed to the solver
    pub method: ArkMethod,
    /// Solver options
    pub options: ArkOptions,
}
