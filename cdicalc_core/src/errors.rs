//! # Error Types
//!
//! Structured error types for cdicalc_core. Every failure the engine can
//! produce is a value of [`CalcError`], carrying enough context for a
//! presentation layer to tell the user which field to fix.
//!
//! None of these errors are transient: calculations are pure, so repeating a
//! request with the same inputs reproduces the same error.
//!
//! ## Example
//!
//! ```rust
//! use cdicalc_core::errors::{CalcError, CalcResult};
//!
//! fn validate_distance(distance_m: f64) -> CalcResult<()> {
//!     if distance_m <= 0.0 {
//!         return Err(CalcError::invalid_input(
//!             "detector_distance",
//!             distance_m.to_string(),
//!             "Distance must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(validate_distance(-1.0).unwrap_err().error_code(), "INVALID_INPUT");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formulas::Role;
use crate::units::Dimension;

/// Result type alias for cdicalc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculation operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// Unit symbol not present in the unit catalog
    #[error("Unknown unit symbol: '{symbol}'")]
    InvalidUnit { symbol: String },

    /// Conversion or arithmetic between quantities of different dimensions
    #[error("Incompatible dimensions: cannot use {from} as {to}")]
    IncompatibleDimension { from: Dimension, to: Dimension },

    /// A role required by the formula was not supplied
    #[error("Missing input for formula '{formula}': {role}")]
    MissingInput { formula: String, role: Role },

    /// A supplied quantity has the wrong dimension for its role
    #[error("Dimension mismatch for '{role}': expected {expected}, got {found}")]
    DimensionMismatch {
        role: Role,
        expected: Dimension,
        found: Dimension,
    },

    /// No registered formula fits the requested role combination
    #[error("No matching formula: {reason}")]
    NoMatchingFormula { reason: String },

    /// A role was supplied that the formula does not take (or is the target)
    #[error("Unexpected input for formula '{formula}': {role} - {reason}")]
    UnexpectedInput {
        formula: String,
        role: Role,
        reason: String,
    },

    /// The closed-form inversion has no real, finite solution for these inputs
    #[error("No solution for '{target}' in formula '{formula}': {reason}")]
    OutOfDomain {
        formula: String,
        target: Role,
        reason: String,
    },

    /// A formula definition was rejected at registration
    #[error("Invalid formula '{name}': {reason}")]
    InvalidFormula { name: String, reason: String },

    /// An input value is invalid (non-finite, out of range, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Text could not be parsed into a quantity or identifier
    #[error("Cannot parse '{input}': {reason}")]
    ParseError { input: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// TOML/JSON serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CalcError {
    /// Create an InvalidUnit error
    pub fn invalid_unit(symbol: impl Into<String>) -> Self {
        CalcError::InvalidUnit {
            symbol: symbol.into(),
        }
    }

    /// Create an IncompatibleDimension error
    pub fn incompatible_dimension(from: Dimension, to: Dimension) -> Self {
        CalcError::IncompatibleDimension { from, to }
    }

    /// Create a MissingInput error
    pub fn missing_input(formula: impl Into<String>, role: Role) -> Self {
        CalcError::MissingInput {
            formula: formula.into(),
            role,
        }
    }

    /// Create a DimensionMismatch error
    pub fn dimension_mismatch(role: Role, expected: Dimension, found: Dimension) -> Self {
        CalcError::DimensionMismatch {
            role,
            expected,
            found,
        }
    }

    /// Create a NoMatchingFormula error
    pub fn no_matching_formula(reason: impl Into<String>) -> Self {
        CalcError::NoMatchingFormula {
            reason: reason.into(),
        }
    }

    /// Create an UnexpectedInput error
    pub fn unexpected_input(formula: impl Into<String>, role: Role, reason: impl Into<String>) -> Self {
        CalcError::UnexpectedInput {
            formula: formula.into(),
            role,
            reason: reason.into(),
        }
    }

    /// Create an OutOfDomain error
    pub fn out_of_domain(formula: impl Into<String>, target: Role, reason: impl Into<String>) -> Self {
        CalcError::OutOfDomain {
            formula: formula.into(),
            target,
            reason: reason.into(),
        }
    }

    /// Create an InvalidFormula error
    pub fn invalid_formula(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidFormula {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a ParseError
    pub fn parse_error(input: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::ParseError {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        CalcError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Whether the error stems from the values the user typed, as opposed
    /// to files or formula definitions.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CalcError::InvalidUnit { .. }
                | CalcError::IncompatibleDimension { .. }
                | CalcError::MissingInput { .. }
                | CalcError::DimensionMismatch { .. }
                | CalcError::NoMatchingFormula { .. }
                | CalcError::UnexpectedInput { .. }
                | CalcError::OutOfDomain { .. }
                | CalcError::InvalidInput { .. }
                | CalcError::ParseError { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidUnit { .. } => "INVALID_UNIT",
            CalcError::IncompatibleDimension { .. } => "INCOMPATIBLE_DIMENSION",
            CalcError::MissingInput { .. } => "MISSING_INPUT",
            CalcError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            CalcError::NoMatchingFormula { .. } => "NO_MATCHING_FORMULA",
            CalcError::UnexpectedInput { .. } => "UNEXPECTED_INPUT",
            CalcError::OutOfDomain { .. } => "OUT_OF_DOMAIN",
            CalcError::InvalidFormula { .. } => "INVALID_FORMULA",
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::ParseError { .. } => "PARSE_ERROR",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
