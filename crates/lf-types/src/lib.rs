#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

/// A single table cell. `Null` marks an absent value; cells are never
/// `Option`-wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("cannot compare {left:?} cell with {right:?} cell")]
    Incomparable { left: CellKind, right: CellKind },
}

impl Cell {
    #[must_use]
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Null => CellKind::Null,
            Self::Bool(_) => CellKind::Bool,
            Self::Int(_) => CellKind::Int,
            Self::Float(_) => CellKind::Float,
            Self::Str(_) => CellKind::Str,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Order two cells. Nulls compare equal to each other and greater than
    /// every non-null value, so a plain ascending sort places them last.
    /// `Int` and `Float` compare numerically across variants; any other
    /// cross-variant pair has no defined order.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, CellError> {
        match (self, other) {
            (Self::Null, Self::Null) => Ok(Ordering::Equal),
            (Self::Null, _) => Ok(Ordering::Greater),
            (_, Self::Null) => Ok(Ordering::Less),
            (Self::Bool(lhs), Self::Bool(rhs)) => Ok(lhs.cmp(rhs)),
            (Self::Int(lhs), Self::Int(rhs)) => Ok(lhs.cmp(rhs)),
            (Self::Str(lhs), Self::Str(rhs)) => Ok(lhs.cmp(rhs)),
            // NaN orders after every other float under total_cmp.
            (Self::Float(lhs), Self::Float(rhs)) => Ok(lhs.total_cmp(rhs)),
            (Self::Int(lhs), Self::Float(rhs)) => Ok((*lhs as f64).total_cmp(rhs)),
            (Self::Float(lhs), Self::Int(rhs)) => Ok(lhs.total_cmp(&(*rhs as f64))),
            (lhs, rhs) => Err(CellError::Incomparable {
                left: lhs.kind(),
                right: rhs.kind(),
            }),
        }
    }

    /// Hashable projection for map keys (join keys, unique tuples).
    ///
    /// Pointwise cell equality: null keys equal only null. Float keys are
    /// normalized so that every NaN collapses to one key and `-0.0` keys as
    /// `0.0`, keeping key equality consistent with value equality.
    #[must_use]
    pub fn key(&self) -> CellKey {
        match self {
            Self::Null => CellKey::Null,
            Self::Bool(v) => CellKey::Bool(*v),
            Self::Int(v) => CellKey::Int(*v),
            Self::Float(v) => {
                let normalized = if v.is_nan() {
                    f64::NAN
                } else if *v == 0.0 {
                    0.0
                } else {
                    *v
                };
                CellKey::Float(normalized.to_bits())
            }
            Self::Str(v) => CellKey::Str(v.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Equality-and-hash form of a [`Cell`], produced by [`Cell::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
}
