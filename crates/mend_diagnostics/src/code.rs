//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The pipeline stage that produced a diagnostic, which fixes its code prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Manifest text does not match the record grammar (`P`).
    Parse,
    /// An integrity finding of the index (`I`).
    Integrity,
    /// The planner refused to guess (`R`).
    Plan,
    /// The mutated text failed re-validation (`V`).
    Validation,
    /// Reading, backing up or committing failed (`F`).
    FileSystem,
    /// The `mend.toml` configuration is invalid (`C`).
    Config,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Parse => 'P',
            Category::Integrity => 'I',
            Category::Plan => 'R',
            Category::Validation => 'V',
            Category::FileSystem => 'F',
            Category::Config => 'C',
        }
    }
}

/// A category prefix plus a number, displayed as e.g. `P001` or `I003`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
