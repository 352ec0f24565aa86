//! Universe sorts
//!
//! Sorts stratify the type hierarchy: `Sort u` lives in `Sort (u+1)`. Levels
//! are concrete naturals; there is no sort polymorphism. `Sort 0` doubles as
//! the impredicative-codomain sort (`PROP`): a Pi whose codomain lands in
//! `PROP` lands in `PROP` itself regardless of its domain (§ Pi rule in the
//! checker).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A universe level. The unsigned representation enforces the "no negative
/// sorts" invariant by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sort(u64);

impl Sort {
    /// The impredicative-codomain sort, `Sort 0`.
    pub const PROP: Sort = Sort(0);

    pub fn new(level: u64) -> Self {
        Sort(level)
    }

    pub fn level(self) -> u64 {
        self.0
    }

    /// The sort that classifies this one: `sort_of(u) = u + 1`.
    pub fn sort_of(self) -> Sort {
        Sort(self.0 + 1)
    }

    pub fn max(self, other: Sort) -> Sort {
        Sort(self.0.max(other.0))
    }

    pub fn is_prop(self) -> bool {
        self == Sort::PROP
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sort {}", self.0)
    }
}
