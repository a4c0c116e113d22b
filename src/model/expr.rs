//! Variable handles and integer linear expressions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Handle to a decision variable of a [`super::ConstraintModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the variable in the model's variable list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Variable values returned by a solver.
pub type Values = HashMap<VarId, f64>;

/// `Σ coeff·var + constant` with integer coefficients.
///
/// Every quantity in a job-shop model (durations, slot indices, the
/// horizon) is integral, so coefficients are kept as `i64` and converted
/// only at the adapter boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: Vec<(VarId, i64)>,
    constant: i64,
}

impl LinearExpr {
    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// A single `coeff·var` term.
    pub fn term(var: VarId, coeff: i64) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0,
        }
    }

    /// Adds a `coeff·var` term.
    pub fn with_term(mut self, var: VarId, coeff: i64) -> Self {
        self.terms.push((var, coeff));
        self
    }

    /// Adds to the constant part.
    pub fn with_constant(mut self, value: i64) -> Self {
        self.constant += value;
        self
    }

    /// The `(var, coeff)` terms. A variable may appear more than once;
    /// its coefficients add up.
    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    /// The constant part.
    pub fn offset(&self) -> i64 {
        self.constant
    }

    /// Evaluates the expression. Returns the first variable without a value
    /// as the error.
    pub fn evaluate(&self, values: &Values) -> Result<f64, VarId> {
        let mut total = self.constant as f64;
        for &(var, coeff) in &self.terms {
            let value = values.get(&var).ok_or(var)?;
            total += coeff as f64 * value;
        }
        Ok(total)
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self::term(var, 1)
    }
}

impl From<i64> for LinearExpr {
    fn from(value: i64) -> Self {
        Self::constant(value)
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl Add<i64> for LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: i64) -> LinearExpr {
        self.with_constant(rhs)
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        self + (-rhs)
    }
}

impl Sub<i64> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: i64) -> LinearExpr {
        self.with_constant(-rhs)
    }
}

impl Mul<i64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: i64) -> LinearExpr {
        for (_, coeff) in &mut self.terms {
            *coeff *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (var, coeff)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{coeff}·{var}")?;
        }
        if self.terms.is_empty() {
            write!(f, "{}", self.constant)
        } else if self.constant != 0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}
