//! Symbolic expressions representing dimension sizes.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Mul;
use std::sync::Arc;

/// A named dimension size.
///
/// Two symbols are equal if they have the same name.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
}

/// Symbolic expression representing a dimension size.
///
/// Expressions can be known integer values, named symbols or products of
/// other expressions.
#[derive(Clone)]
pub enum SymExpr {
    /// Dimension with a known size.
    Value(i64),
    /// Dimension whose size is only known by name.
    Var(Arc<Symbol>),
    /// Product of two expressions.
    Mul(Arc<SymExpr>, Arc<SymExpr>),
}

impl SymExpr {
    /// Create a named symbol.
    pub fn var(name: &str) -> Self {
        SymExpr::Var(
            Symbol {
                name: name.to_string(),
            }
            .into(),
        )
    }

    /// Return the value of this expression, if it is a known integer.
    pub fn as_value(&self) -> Option<i64> {
        match self {
            Self::Value(x) => Some(*x),
            Self::Var(_) | Self::Mul(..) => None,
        }
    }

    /// Return true if this expression has a known integer value.
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Return the symbol name, if this is a bare symbol.
    fn name(&self) -> Option<&str> {
        match self {
            Self::Var(sym) => Some(&sym.name),
            Self::Value(_) | Self::Mul(..) => None,
        }
    }

    /// Simplify an expression.
    ///
    /// Nested products are flattened, constant factors are folded together
    /// and factors of 1 are removed. Remaining symbolic factors are sorted by
    /// name, so that products of the same factors in different orders
    /// simplify to the same expression.
    ///
    /// If folding constants would overflow, the constants are left as
    /// separate factors.
    pub fn simplify(&self) -> SymExpr {
        fn collect_factors(factors: &mut Vec<SymExpr>, term: &SymExpr) {
            if let SymExpr::Mul(lhs, rhs) = term {
                collect_factors(factors, lhs);
                collect_factors(factors, rhs);
            } else {
                factors.push(term.clone());
            }
        }

        let Self::Mul(..) = self else {
            return self.clone();
        };

        let mut factors = Vec::new();
        collect_factors(&mut factors, self);

        if factors.iter().any(|f| f.as_value() == Some(0)) {
            return SymExpr::Value(0);
        }

        let mut product = 1i64;
        let mut unfolded = Vec::new();
        let mut symbols = Vec::new();
        for factor in factors {
            match factor {
                SymExpr::Value(x) => match product.checked_mul(x) {
                    Some(p) => product = p,
                    None => unfolded.push(SymExpr::Value(x)),
                },
                sym => symbols.push(sym),
            }
        }
        symbols.sort_by(cmp_by_name);

        let constant = (product != 1).then_some(SymExpr::Value(product));
        constant
            .into_iter()
            .chain(unfolded)
            .chain(symbols)
            .reduce(|prod, x| prod * x)
            .unwrap_or(SymExpr::Value(1))
    }
}

fn cmp_by_name(a: &SymExpr, b: &SymExpr) -> Ordering {
    a.name().cmp(&b.name())
}

impl PartialEq<SymExpr> for SymExpr {
    fn eq(&self, other: &SymExpr) -> bool {
        match (self, other) {
            (Self::Value(x), Self::Value(y)) => x == y,
            (Self::Var(x), Self::Var(y)) => x.name == y.name,
            (Self::Mul(a, b), Self::Mul(c, d)) => (a == c && b == d) || (a == d && b == c),
            _ => false,
        }
    }
}

impl Mul<SymExpr> for SymExpr {
    type Output = SymExpr;

    fn mul(self, rhs: SymExpr) -> Self {
        Self::Mul(self.into(), rhs.into())
    }
}

impl From<Symbol> for SymExpr {
    fn from(val: Symbol) -> Self {
        Self::Var(val.into())
    }
}

impl<'a> From<&'a str> for SymExpr {
    fn from(name: &'a str) -> Self {
        SymExpr::var(name)
    }
}

impl From<i32> for SymExpr {
    fn from(val: i32) -> Self {
        SymExpr::Value(val.into())
    }
}

impl From<i64> for SymExpr {
    fn from(val: i64) -> Self {
        SymExpr::Value(val)
    }
}

impl fmt::Debug for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(val) => write!(f, "{}", val),
            Self::Var(sym) => write!(f, "\"{}\"", sym.name),
            Self::Mul(lhs, rhs) => write!(f, "{:?} * {:?}", lhs, rhs),
        }
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(val) => write!(f, "{}", val),
            Self::Var(sym) => write!(f, "{}", sym.name),
            Self::Mul(lhs, rhs) => write!(f, "{} * {}", lhs, rhs),
        }
    }
}
