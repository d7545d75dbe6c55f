//! Requirement flags attached to attribute specs.
//!
//! A [`Constraints`] value is a small immutable bit-set. Flags compose with
//! `|` and are tested with [`Constraints::contains`]; named unions such as
//! [`Constraints::MEANINGFUL`] are shorthand for the same primitive bits.
//!
//! # Examples
//!
//! ```
//! use blockspec_core::Constraints;
//!
//! let c = Constraints::REQUIRED | Constraints::MEANINGFUL;
//! assert!(c.contains(Constraints::NON_NULL));
//! assert!(c.contains(Constraints::NON_EMPTY));
//! assert!(!c.contains(Constraints::INTEGER));
//! assert_eq!(c, Constraints::REQUIRED_MEANINGFUL);
//! ```

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// An immutable set of requirement flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Constraint>", into = "Vec<Constraint>")]
pub struct Constraints(u8);

impl Constraints {
    /// No requirements.
    pub const NONE: Self = Self(0);
    /// The attribute or block must be present in the body.
    pub const REQUIRED: Self = Self(1);
    /// The value must not be null.
    pub const NON_NULL: Self = Self(1 << 1);
    /// Strings and collections must have at least one element.
    pub const NON_EMPTY: Self = Self(1 << 2);
    /// Strings are trimmed of surrounding whitespace and must stay non-empty.
    pub const TRIMMED_NON_EMPTY: Self = Self(1 << 3);
    /// Numbers must be exactly integral.
    pub const INTEGER: Self = Self(1 << 4);

    /// `NON_NULL | NON_EMPTY`.
    pub const MEANINGFUL: Self = Self(Self::NON_NULL.0 | Self::NON_EMPTY.0);
    /// `REQUIRED | NON_NULL`.
    pub const REQUIRED_NON_NULL: Self = Self(Self::REQUIRED.0 | Self::NON_NULL.0);
    /// `REQUIRED | NON_NULL | NON_EMPTY`.
    pub const REQUIRED_MEANINGFUL: Self = Self(Self::REQUIRED.0 | Self::MEANINGFUL.0);

    const PRIMITIVES: [(Self, Constraint); 5] = [
        (Self::REQUIRED, Constraint::Required),
        (Self::NON_NULL, Constraint::NonNull),
        (Self::NON_EMPTY, Constraint::NonEmpty),
        (Self::TRIMMED_NON_EMPTY, Constraint::TrimmedNonEmpty),
        (Self::INTEGER, Constraint::Integer),
    ];

    /// Returns `true` when every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of both sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` when no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` when either emptiness flag is set.
    pub const fn requires_non_empty(self) -> bool {
        self.0 & (Self::NON_EMPTY.0 | Self::TRIMMED_NON_EMPTY.0) != 0
    }

    /// Iterates over the primitive flags present in the set.
    pub fn iter(self) -> impl Iterator<Item = Constraint> {
        Self::PRIMITIVES
            .into_iter()
            .filter(move |(bits, _)| self.contains(*bits))
            .map(|(_, flag)| flag)
    }
}

impl BitOr for Constraints {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Constraints {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Constraint::name).collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}

/// Named constraint as written in spec files.
///
/// The union names expand to their primitive flags when collected into a
/// [`Constraints`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// See [`Constraints::REQUIRED`].
    Required,
    /// See [`Constraints::NON_NULL`].
    NonNull,
    /// See [`Constraints::NON_EMPTY`].
    NonEmpty,
    /// See [`Constraints::TRIMMED_NON_EMPTY`].
    TrimmedNonEmpty,
    /// See [`Constraints::INTEGER`].
    Integer,
    /// See [`Constraints::MEANINGFUL`].
    Meaningful,
    /// See [`Constraints::REQUIRED_NON_NULL`].
    RequiredNonNull,
    /// See [`Constraints::REQUIRED_MEANINGFUL`].
    RequiredMeaningful,
}

impl Constraint {
    /// Returns the snake_case name used in spec files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::NonNull => "non_null",
            Self::NonEmpty => "non_empty",
            Self::TrimmedNonEmpty => "trimmed_non_empty",
            Self::Integer => "integer",
            Self::Meaningful => "meaningful",
            Self::RequiredNonNull => "required_non_null",
            Self::RequiredMeaningful => "required_meaningful",
        }
    }

    /// Returns the bit-set this name stands for.
    pub fn bits(self) -> Constraints {
        match self {
            Self::Required => Constraints::REQUIRED,
            Self::NonNull => Constraints::NON_NULL,
            Self::NonEmpty => Constraints::NON_EMPTY,
            Self::TrimmedNonEmpty => Constraints::TRIMMED_NON_EMPTY,
            Self::Integer => Constraints::INTEGER,
            Self::Meaningful => Constraints::MEANINGFUL,
            Self::RequiredNonNull => Constraints::REQUIRED_NON_NULL,
            Self::RequiredMeaningful => Constraints::REQUIRED_MEANINGFUL,
        }
    }
}

impl From<Constraint> for Constraints {
    fn from(flag: Constraint) -> Self {
        flag.bits()
    }
}

impl From<Vec<Constraint>> for Constraints {
    fn from(flags: Vec<Constraint>) -> Self {
        flags.into_iter().fold(Self::NONE, |acc, flag| acc | flag.bits())
    }
}

impl From<Constraints> for Vec<Constraint> {
    fn from(set: Constraints) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<Constraint> for Constraints {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |acc, flag| acc | flag.bits())
    }
}
