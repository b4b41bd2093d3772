//! Embedded Runge-Kutta methods addressed by integer id.
//!
//! Explicit methods occupy ids below [`MIN_DIRK_ID`], diagonally-implicit
//! methods ids from [`MIN_DIRK_ID`] upward. The ARK 3(2)4L[2]SA pair is
//! registered under both its explicit id and its implicit id so that either
//! half can be looked up on its own.
//!
//! User-supplied IMEX pairs (without embeddings) are addressed by a separate
//! small id space, see [`user_pair`].

use super::{ButcherTable, ImexPair, TableKind, ars};

/// Heun-Euler 2(1), 2 stages.
pub const HEUN_EULER_2_1_2: i32 = 0;
/// Bogacki-Shampine 3(2), 4 stages (FSAL).
pub const BOGACKI_SHAMPINE_4_2_3: i32 = 1;
/// Explicit half of ARK 3(2)4L[2]SA.
pub const ARK324L2SA_ERK_4_2_3: i32 = 2;
/// Zonneveld 4(3), 5 stages.
pub const ZONNEVELD_5_3_4: i32 = 3;

/// First id of the diagonally-implicit range.
pub const MIN_DIRK_ID: i32 = 11;
/// SDIRK 2(1), 2 stages.
pub const SDIRK_2_1_2: i32 = 11;
/// Kværnø 4(2)3 ESDIRK, 4 stages.
pub const KVAERNO_4_2_3: i32 = 14;
/// Implicit half of ARK 3(2)4L[2]SA.
pub const ARK324L2SA_DIRK_4_2_3: i32 = 15;

/// User IMEX pair id for ARS(2,3,2).
pub const USER_ARS232: i32 = 1;
/// User IMEX pair id for ARS(3,4,3).
pub const USER_ARS343: i32 = 2;
/// User IMEX pair id for ARS(4,4,3).
pub const USER_ARS443: i32 = 3;

/// Look up a catalogue table.
pub fn table_by_id(id: i32) -> Option<ButcherTable> {
    match id {
        HEUN_EULER_2_1_2 => Some(heun_euler()),
        BOGACKI_SHAMPINE_4_2_3 => Some(bogacki_shampine()),
        ARK324L2SA_ERK_4_2_3 => Some(ark324().explicit),
        ZONNEVELD_5_3_4 => Some(zonneveld()),
        SDIRK_2_1_2 => Some(sdirk21()),
        KVAERNO_4_2_3 => Some(kvaerno423()),
        ARK324L2SA_DIRK_4_2_3 => Some(ark324().implicit),
        _ => None,
    }
}

/// Structural class implied by an id's range, without building the table.
pub fn kind_of_id(id: i32) -> Option<TableKind> {
    match id {
        i if i < 0 => None,
        i if i < MIN_DIRK_ID => Some(TableKind::Explicit),
        _ => Some(TableKind::DiagonallyImplicit),
    }
}

/// Default explicit method of the requested order.
pub fn default_erk(order: usize) -> Option<i32> {
    match order {
        2 => Some(HEUN_EULER_2_1_2),
        3 => Some(BOGACKI_SHAMPINE_4_2_3),
        4 => Some(ZONNEVELD_5_3_4),
        _ => None,
    }
}

/// Default diagonally-implicit method of the requested order.
pub fn default_dirk(order: usize) -> Option<i32> {
    match order {
        2 => Some(SDIRK_2_1_2),
        3 => Some(ARK324L2SA_DIRK_4_2_3),
        _ => None,
    }
}

/// Default additive pair of the requested order, as (explicit, implicit) ids.
pub fn default_ark(order: usize) -> Option<(i32, i32)> {
    match order {
        3 => Some((ARK324L2SA_ERK_4_2_3, ARK324L2SA_DIRK_4_2_3)),
        _ => None,
    }
}

/// Additive pair whose halves carry the given id (either half matches).
pub fn ark_pair_by_id(id: i32) -> Option<ImexPair> {
    match id {
        ARK324L2SA_ERK_4_2_3 | ARK324L2SA_DIRK_4_2_3 => Some(ark324()),
        _ => None,
    }
}

/// User-supplied fixed-step IMEX pair.
pub fn user_pair(id: i32) -> Option<ImexPair> {
    match id {
        USER_ARS232 => Some(ars::ars232()),
        USER_ARS343 => Some(ars::ars343()),
        USER_ARS443 => Some(ars::ars443()),
        _ => None,
    }
}

// ============================================================================
// Explicit methods
// ============================================================================

fn heun_euler() -> ButcherTable {
    ButcherTable::new(
        "Heun-Euler 2(1)",
        &[&[0.0, 0.0], &[1.0, 0.0]],
        &[0.5, 0.5],
        &[0.0, 1.0],
        2,
    )
    .with_embedding(&[1.0, 0.0], 1)
}

fn bogacki_shampine() -> ButcherTable {
    ButcherTable::new(
        "Bogacki-Shampine 3(2)",
        &[
            &[0.0, 0.0, 0.0, 0.0],
            &[0.5, 0.0, 0.0, 0.0],
            &[0.0, 0.75, 0.0, 0.0],
            &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0, 0.0],
        ],
        &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0, 0.0],
        &[0.0, 0.5, 0.75, 1.0],
        3,
    )
    .with_embedding(&[7.0 / 24.0, 0.25, 1.0 / 3.0, 0.125], 2)
}

fn zonneveld() -> ButcherTable {
    ButcherTable::new(
        "Zonneveld 4(3)",
        &[
            &[0.0, 0.0, 0.0, 0.0, 0.0],
            &[0.5, 0.0, 0.0, 0.0, 0.0],
            &[0.0, 0.5, 0.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 0.0, 0.0],
            &[5.0 / 32.0, 7.0 / 32.0, 13.0 / 32.0, -1.0 / 32.0, 0.0],
        ],
        &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0, 0.0],
        &[0.0, 0.5, 0.5, 1.0, 0.75],
        4,
    )
    .with_embedding(
        &[-0.5, 7.0 / 3.0, 7.0 / 3.0, 13.0 / 6.0, -16.0 / 3.0],
        3,
    )
}

// ============================================================================
// Diagonally-implicit methods
// ============================================================================

fn sdirk21() -> ButcherTable {
    ButcherTable::new(
        "SDIRK 2(1)",
        &[&[1.0, 0.0], &[-1.0, 1.0]],
        &[0.5, 0.5],
        &[1.0, 0.0],
        2,
    )
    .with_embedding(&[1.0, 0.0], 1)
}

fn kvaerno423() -> ButcherTable {
    const G: f64 = 0.435_866_521_5;
    let row3 = [0.490_563_388_419_108, 0.073_570_090_080_892, G, 0.0];
    let row4 = [
        0.308_809_969_973_036,
        1.490_563_388_254_106,
        -1.235_239_879_727_145,
        G,
    ];
    ButcherTable::new(
        "Kvaerno 4(2)3",
        &[&[0.0, 0.0, 0.0, 0.0], &[G, G, 0.0, 0.0], &row3, &row4],
        &row4,
        &[0.0, 2.0 * G, 1.0, 1.0],
        3,
    )
    .with_embedding(&row3, 2)
}

// ============================================================================
// Additive pair
// ============================================================================

/// Kennedy & Carpenter ARK 3(2)4L[2]SA.
fn ark324() -> ImexPair {
    let gamma = 1767732205903.0 / 4055673282236.0;
    let c = [0.0, 1767732205903.0 / 2027836641118.0, 0.6, 1.0];
    let b = [
        1471266399579.0 / 7840856788654.0,
        -4482444167858.0 / 7529755066697.0,
        11266239266428.0 / 11593286722821.0,
        gamma,
    ];
    let b_embedded = [
        2756255671327.0 / 12835298489170.0,
        -10771552573575.0 / 22201958757719.0,
        9247589265047.0 / 10645013368117.0,
        2193209047091.0 / 5459859503100.0,
    ];

    let explicit = ButcherTable::new(
        "ARK 3(2)4L[2]SA explicit",
        &[
            &[0.0, 0.0, 0.0, 0.0],
            &[c[1], 0.0, 0.0, 0.0],
            &[
                5535828885825.0 / 10492691773637.0,
                788022342437.0 / 10882634858940.0,
                0.0,
                0.0,
            ],
            &[
                6485989280629.0 / 16251701735622.0,
                -4246266847089.0 / 9704473918619.0,
                10755448449292.0 / 10357097424841.0,
                0.0,
            ],
        ],
        &b,
        &c,
        3,
    )
    .with_embedding(&b_embedded, 2);

    let implicit = ButcherTable::new(
        "ARK 3(2)4L[2]SA implicit",
        &[
            &[0.0, 0.0, 0.0, 0.0],
            &[gamma, gamma, 0.0, 0.0],
            &[
                2746238789719.0 / 10658868560708.0,
                -640167445237.0 / 6845629431997.0,
                gamma,
                0.0,
            ],
            &[b[0], b[1], b[2], gamma],
        ],
        &b,
        &c,
        3,
    )
    .with_embedding(&b_embedded, 2);

    ImexPair::new(explicit, implicit)
}
