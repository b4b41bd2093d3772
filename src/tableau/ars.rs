//! Ascher-Ruuth-Spiteri IMEX Runge-Kutta pairs.
//!
//! Each pair combines an explicit table whose first stage is the only one
//! evaluated at the step start with an SDIRK table whose first stage is
//! explicit (zero first row and column). Neither carries an embedding, so
//! they are only usable with fixed step sizes.
//!
//! Reference: Ascher, Ruuth & Spiteri (1997), "Implicit-explicit Runge-Kutta
//! methods for time-dependent partial differential equations",
//! Appl. Numer. Math. 25, 151-167.

use super::{ButcherTable, ImexPair};

// ============================================================================
// ARS(3,4,3)
// ============================================================================

/// Diagonal coefficient of ARS(3,4,3), root of 6γ³ - 18γ² + 9γ - 1 in (1/4, 1/2).
pub const ARS343_GAMMA: f64 = 0.435_866_521_508_459_0;

/// Time offset of the second implicit stage, (1 + γ) / 2.
pub const ARS343_DELTA: f64 = 0.5 * (1.0 + ARS343_GAMMA);

/// First nonzero output weight, -3γ²/2 + 4γ - 1/4.
pub const ARS343_B1: f64 =
    -1.5 * ARS343_GAMMA * ARS343_GAMMA + 4.0 * ARS343_GAMMA - 0.25;

/// Second nonzero output weight, 3γ²/2 - 5γ + 5/4.
pub const ARS343_B2: f64 =
    1.5 * ARS343_GAMMA * ARS343_GAMMA - 5.0 * ARS343_GAMMA + 1.25;

/// Number of stages (including the explicit first stage).
pub const ARS343_STAGES: usize = 4;

/// Stage time offsets.
pub const ARS343_C: [f64; ARS343_STAGES] = [0.0, ARS343_GAMMA, ARS343_DELTA, 1.0];

/// Implicit (SDIRK) coefficient matrix.
pub const ARS343_IMPLICIT: [[f64; ARS343_STAGES]; ARS343_STAGES] = [
    [0.0, 0.0, 0.0, 0.0],
    [0.0, ARS343_GAMMA, 0.0, 0.0],
    [0.0, 0.5 * (1.0 - ARS343_GAMMA), ARS343_GAMMA, 0.0],
    [0.0, ARS343_B1, ARS343_B2, ARS343_GAMMA],
];

/// Explicit coefficient matrix.
///
/// Rows 3 and 4 follow from the order conditions with the implicit table:
/// a₄₂ = a₄₃ = (1 - a₄₁) / 2 and a₄₁ fixed by the third-order coupling terms.
pub const ARS343_EXPLICIT: [[f64; ARS343_STAGES]; ARS343_STAGES] = [
    [0.0, 0.0, 0.0, 0.0],
    [ARS343_GAMMA, 0.0, 0.0, 0.0],
    [0.321_278_886_028_627_75, 0.396_654_374_725_601_7, 0.0, 0.0],
    [
        -0.105_858_296_071_879_69,
        0.552_929_148_035_939_8,
        0.552_929_148_035_939_8,
        0.0,
    ],
];

/// Output weights, shared by both halves.
pub const ARS343_WEIGHTS: [f64; ARS343_STAGES] =
    [0.0, ARS343_B1, ARS343_B2, ARS343_GAMMA];

/// ARS(3,4,3): third order, L-stable implicit part.
pub fn ars343() -> ImexPair {
    let explicit = ButcherTable {
        name: "ARS(3,4,3) explicit",
        a: ARS343_EXPLICIT.iter().map(|r| r.to_vec()).collect(),
        b: ARS343_WEIGHTS.to_vec(),
        b_embedded: None,
        c: ARS343_C.to_vec(),
        order: 3,
        embedded_order: 0,
    };
    let implicit = ButcherTable {
        name: "ARS(3,4,3) implicit",
        a: ARS343_IMPLICIT.iter().map(|r| r.to_vec()).collect(),
        ..explicit.clone()
    };
    ImexPair::new(explicit, implicit)
}

// ============================================================================
// ARS(2,3,2)
// ============================================================================

/// ARS(2,3,2): second order, L-stable implicit part.
pub fn ars232() -> ImexPair {
    let gamma = 1.0 - 0.5 * std::f64::consts::SQRT_2;
    let delta = -2.0 * std::f64::consts::SQRT_2 / 3.0;
    let c = [0.0, gamma, 1.0];
    let b = [0.0, 1.0 - gamma, gamma];

    let explicit = ButcherTable::new(
        "ARS(2,3,2) explicit",
        &[&[0.0, 0.0, 0.0], &[gamma, 0.0, 0.0], &[delta, 1.0 - delta, 0.0]],
        &b,
        &c,
        2,
    );
    let implicit = ButcherTable::new(
        "ARS(2,3,2) implicit",
        &[&[0.0, 0.0, 0.0], &[0.0, gamma, 0.0], &[0.0, 1.0 - gamma, gamma]],
        &b,
        &c,
        2,
    );
    ImexPair::new(explicit, implicit)
}

// ============================================================================
// ARS(4,4,3)
// ============================================================================

/// ARS(4,4,3): third order, four implicit stages with γ = 1/2.
pub fn ars443() -> ImexPair {
    let c = [0.0, 0.5, 2.0 / 3.0, 0.5, 1.0];

    let explicit = ButcherTable::new(
        "ARS(4,4,3) explicit",
        &[
            &[0.0, 0.0, 0.0, 0.0, 0.0],
            &[0.5, 0.0, 0.0, 0.0, 0.0],
            &[11.0 / 18.0, 1.0 / 18.0, 0.0, 0.0, 0.0],
            &[5.0 / 6.0, -5.0 / 6.0, 0.5, 0.0, 0.0],
            &[0.25, 1.75, 0.75, -1.75, 0.0],
        ],
        &[0.25, 1.75, 0.75, -1.75, 0.0],
        &c,
        3,
    );
    let implicit = ButcherTable::new(
        "ARS(4,4,3) implicit",
        &[
            &[0.0, 0.0, 0.0, 0.0, 0.0],
            &[0.0, 0.5, 0.0, 0.0, 0.0],
            &[0.0, 1.0 / 6.0, 0.5, 0.0, 0.0],
            &[0.0, -0.5, 0.5, 0.5, 0.0],
            &[0.0, 1.5, -1.5, 0.5, 0.5],
        ],
        &[0.0, 1.5, -1.5, 0.5, 0.5],
        &c,
        3,
    );
    ImexPair::new(explicit, implicit)
}
