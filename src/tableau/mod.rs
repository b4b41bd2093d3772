//! Butcher tableaux for additive (IMEX) Runge-Kutta methods.
//!
//! A method is defined by a coefficient matrix `A`, output weights `b`,
//! stage time offsets `c` and optionally embedded weights `b̂` for error
//! estimation. An additive method pairs an explicit table (strictly lower
//! triangular `A`) with a diagonally-implicit one (lower triangular `A`
//! including the diagonal) sharing the same stage times.
//!
//! # Submodules
//!
//! - [`ars`]: Ascher-Ruuth-Spiteri IMEX pairs (ARS(2,3,2), ARS(3,4,3), ARS(4,4,3))
//! - [`catalogue`]: Embedded ERK, DIRK and ARK methods addressed by integer id

pub mod ars;
pub mod catalogue;

use thiserror::Error;

/// Structural defects of a tableau.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableauError {
    /// Matrix is not square, or vectors do not match the stage count.
    #[error("{table}: inconsistent dimensions ({reason})")]
    Dimensions { table: &'static str, reason: String },

    /// Row sum of `A` differs from the stage time offset.
    #[error("{table}: row {row} sums to {sum}, stage offset is {offset}")]
    RowSum {
        table: &'static str,
        row: usize,
        sum: f64,
        offset: f64,
    },

    /// Entry above the allowed triangle is nonzero.
    #[error("{table}: coefficient a[{row}][{col}] = {value} violates the triangular structure")]
    Structure {
        table: &'static str,
        row: usize,
        col: usize,
        value: f64,
    },

    /// Output weights do not sum to one.
    #[error("{table}: output weights sum to {sum}")]
    Weights { table: &'static str, sum: f64 },

    /// Explicit and implicit halves disagree on stage count or stage times.
    #[error("IMEX pair {explicit}/{implicit}: stage layouts differ")]
    PairMismatch {
        explicit: &'static str,
        implicit: &'static str,
    },
}

/// Tolerance used for the consistency checks.
const CONSISTENCY_TOL: f64 = 1e-12;

/// Structural class of a Runge-Kutta matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    /// Strictly lower triangular `A`
    Explicit,
    /// Lower triangular `A` with at least one nonzero diagonal entry
    DiagonallyImplicit,
}

/// Runge-Kutta coefficients, optionally with an embedded method.
#[derive(Clone, Debug, PartialEq)]
pub struct ButcherTable {
    /// Human-readable name
    pub name: &'static str,
    /// Coefficient matrix, `stages × stages`
    pub a: Vec<Vec<f64>>,
    /// Output weights
    pub b: Vec<f64>,
    /// Embedded weights for the error estimate
    pub b_embedded: Option<Vec<f64>>,
    /// Stage time offsets (fractions of the step)
    pub c: Vec<f64>,
    /// Order of the method
    pub order: usize,
    /// Order of the embedded method (0 if none)
    pub embedded_order: usize,
}

impl ButcherTable {
    /// Create a table from nested slices.
    pub fn new(
        name: &'static str,
        a: &[&[f64]],
        b: &[f64],
        c: &[f64],
        order: usize,
    ) -> Self {
        Self {
            name,
            a: a.iter().map(|row| row.to_vec()).collect(),
            b: b.to_vec(),
            b_embedded: None,
            c: c.to_vec(),
            order,
            embedded_order: 0,
        }
    }

    /// Attach embedded weights.
    pub fn with_embedding(mut self, b_embedded: &[f64], embedded_order: usize) -> Self {
        self.b_embedded = Some(b_embedded.to_vec());
        self.embedded_order = embedded_order;
        self
    }

    /// Number of stages.
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    /// Whether an embedded method is available.
    pub fn has_embedding(&self) -> bool {
        self.b_embedded.is_some()
    }

    /// Structural class of `A`.
    pub fn kind(&self) -> TableKind {
        let implicit = self
            .a
            .iter()
            .enumerate()
            .any(|(i, row)| row.get(i).is_some_and(|&d| d != 0.0));
        if implicit {
            TableKind::DiagonallyImplicit
        } else {
            TableKind::Explicit
        }
    }

    /// Check dimensions, triangular structure, row sums and weight sums.
    pub fn validate(&self) -> Result<TableKind, TableauError> {
        let s = self.stages();
        if self.a.len() != s || self.c.len() != s || self.a.iter().any(|row| row.len() != s) {
            return Err(TableauError::Dimensions {
                table: self.name,
                reason: format!("{} stages, A has {} rows", s, self.a.len()),
            });
        }
        if let Some(bh) = &self.b_embedded
            && bh.len() != s
        {
            return Err(TableauError::Dimensions {
                table: self.name,
                reason: format!("embedding has {} weights for {} stages", bh.len(), s),
            });
        }

        for (i, row) in self.a.iter().enumerate() {
            for (j, &value) in row.iter().enumerate().skip(i + 1) {
                if value != 0.0 {
                    return Err(TableauError::Structure {
                        table: self.name,
                        row: i,
                        col: j,
                        value,
                    });
                }
            }
            let sum: f64 = row.iter().sum();
            if (sum - self.c[i]).abs() > CONSISTENCY_TOL {
                return Err(TableauError::RowSum {
                    table: self.name,
                    row: i,
                    sum,
                    offset: self.c[i],
                });
            }
        }

        for weights in std::iter::once(&self.b).chain(self.b_embedded.as_ref()) {
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > CONSISTENCY_TOL {
                return Err(TableauError::Weights {
                    table: self.name,
                    sum,
                });
            }
        }

        Ok(self.kind())
    }
}

/// Explicit/implicit halves of an additive Runge-Kutta method.
#[derive(Clone, Debug, PartialEq)]
pub struct ImexPair {
    /// Non-stiff half (strictly lower triangular)
    pub explicit: ButcherTable,
    /// Stiff half (diagonally implicit)
    pub implicit: ButcherTable,
}

impl ImexPair {
    /// Pair two tables.
    pub fn new(explicit: ButcherTable, implicit: ButcherTable) -> Self {
        Self { explicit, implicit }
    }

    /// Number of stages.
    pub fn stages(&self) -> usize {
        self.explicit.stages()
    }

    /// Whether both halves carry an embedding.
    pub fn has_embedding(&self) -> bool {
        self.explicit.has_embedding() && self.implicit.has_embedding()
    }

    /// Validate both halves and their compatibility.
    pub fn validate(&self) -> Result<(), TableauError> {
        validate_imex(
            self.explicit.name,
            &self.explicit.a,
            &self.implicit.a,
            &self.explicit.c,
        )?;
        self.explicit.validate()?;
        self.implicit.validate()?;
        if self.implicit.c != self.explicit.c {
            return Err(TableauError::PairMismatch {
                explicit: self.explicit.name,
                implicit: self.implicit.name,
            });
        }
        Ok(())
    }
}

/// Check the IMEX structure of a pair of coefficient matrices.
///
/// - explicit `A` strictly lower triangular
/// - implicit `A` lower triangular including the diagonal
/// - every row of both sums to the stage offset `c[i]`
///
/// Works on any row type so the fixed-size stepper tables can be
/// checked with the same routine as the heap-allocated catalogue.
pub fn validate_imex<R: AsRef<[f64]>>(
    name: &'static str,
    explicit: &[R],
    implicit: &[R],
    c: &[f64],
) -> Result<(), TableauError> {
    let s = c.len();
    if explicit.len() != s || implicit.len() != s {
        return Err(TableauError::Dimensions {
            table: name,
            reason: format!(
                "explicit has {} rows, implicit has {}, {} offsets",
                explicit.len(),
                implicit.len(),
                s
            ),
        });
    }

    for i in 0..s {
        let (re, ri) = (explicit[i].as_ref(), implicit[i].as_ref());
        if re.len() != s || ri.len() != s {
            return Err(TableauError::Dimensions {
                table: name,
                reason: format!("row {i} has the wrong length"),
            });
        }
        for j in i..s {
            if re[j] != 0.0 {
                return Err(TableauError::Structure {
                    table: name,
                    row: i,
                    col: j,
                    value: re[j],
                });
            }
            if j > i && ri[j] != 0.0 {
                return Err(TableauError::Structure {
                    table: name,
                    row: i,
                    col: j,
                    value: ri[j],
                });
            }
        }
        for row in [re, ri] {
            let sum: f64 = row.iter().sum();
            if (sum - c[i]).abs() > CONSISTENCY_TOL {
                return Err(TableauError::RowSum {
                    table: name,
                    row: i,
                    sum,
                    offset: c[i],
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn euler() -> ButcherTable {
        ButcherTable::new("euler", &[&[0.0]], &[1.0], &[0.0], 1)
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(euler().kind(), TableKind::Explicit);
        let backward = ButcherTable::new("backward-euler", &[&[1.0]], &[1.0], &[1.0], 1);
        assert_eq!(backward.kind(), TableKind::DiagonallyImplicit);
        assert_eq!(backward.validate(), Ok(TableKind::DiagonallyImplicit));
    }

    #[test]
    fn test_row_sum_violation() {
        let bad = ButcherTable::new(
            "bad",
            &[&[0.0, 0.0], &[0.7, 0.0]],
            &[0.5, 0.5],
            &[0.0, 1.0],
            2,
        );
        assert!(matches!(bad.validate(), Err(TableauError::RowSum { row: 1, .. })));
    }

    #[test]
    fn test_upper_entry_rejected() {
        let explicit = [[0.0, 0.5], [1.0, 0.0]];
        let implicit = [[0.0, 0.0], [0.0, 1.0]];
        let err = validate_imex("upper", &explicit, &implicit, &[0.5, 1.0]).unwrap_err();
        assert!(matches!(err, TableauError::Structure { row: 0, col: 1, .. }));
    }

    #[test]
    fn test_explicit_diagonal_rejected() {
        let explicit = [[0.0, 0.0], [0.0, 1.0]];
        let implicit = [[0.0, 0.0], [0.0, 1.0]];
        assert!(validate_imex("diag", &explicit, &implicit, &[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_embedding_dimension_checked() {
        let table = euler().with_embedding(&[0.5, 0.5], 0);
        assert!(matches!(
            table.validate(),
            Err(TableauError::Dimensions { .. })
        ));
    }
}
