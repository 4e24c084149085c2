//! Error types crossing the binding boundary.
//!
//! ## Error Hierarchy
//!
//! ```text
//! LuaError         - script-visible failure (bad argument, host-raised error)
//! ConversionError  - internal mismatch while handing marshalled values to a host fn
//! Thrown           - what a host method produced: a LuaError, or any other error
//! ```
//!
//! Only [`LuaError`] is ever shown to scripts verbatim. Anything else a host
//! method raises is logged by the registry and replaced with an opaque
//! internal error.

use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Result alias for operations that may fail with a script error.
pub type LuaResult<T> = Result<T, LuaError>;

// ============================================================================
// Script errors
// ============================================================================

/// Whether an error originates from script misuse or from a host fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    #[default]
    Script,
    Internal,
}

/// An error reported to the calling script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LuaError {
    message: String,
    level: u32,
    kind: ErrorKind,
}

impl LuaError {
    /// A script error blamed on the immediate caller.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: 1,
            kind: ErrorKind::Script,
        }
    }

    /// A script error blamed on the caller `level` frames up.
    pub fn with_level(message: impl Into<String>, level: u32) -> Self {
        Self {
            message: message.into(),
            level,
            kind: ErrorKind::Script,
        }
    }

    /// An opaque error standing in for a host-side fault.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: 1,
            kind: ErrorKind::Internal,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_internal(&self) -> bool {
        self.kind == ErrorKind::Internal
    }
}

// ----------------------------------------------------------------------------
// Argument error helpers
// ----------------------------------------------------------------------------

/// `bad argument #N (EXPECTED expected, got ACTUAL)`. `index` is zero-based.
pub fn bad_argument(index: usize, expected: &str, actual: &str) -> LuaError {
    LuaError::new(format!(
        "bad argument #{} ({expected} expected, got {actual})",
        index + 1
    ))
}

/// [`bad_argument`] reporting the type of `value`.
pub fn bad_argument_of(index: usize, expected: &str, value: &Value) -> LuaError {
    bad_argument(index, expected, value.type_name())
}

/// `bad argument #N (unknown option NAME)`.
pub fn unknown_option(index: usize, name: &str) -> LuaError {
    LuaError::new(format!("bad argument #{} (unknown option {name})", index + 1))
}

/// `table item #N is not EXPECTED (got ACTUAL)`.
pub fn bad_table_item(index: i64, expected: &str, actual: &str) -> LuaError {
    LuaError::new(format!("table item #{index} is not {expected} (got {actual})"))
}

/// `field KEY is not EXPECTED (got ACTUAL)`.
pub fn bad_field(key: &str, expected: &str, actual: &str) -> LuaError {
    LuaError::new(format!("field {key} is not {expected} (got {actual})"))
}

/// Name a number the way argument errors report it.
pub fn numeric_type(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value == f64::INFINITY {
        "inf"
    } else if value == f64::NEG_INFINITY {
        "-inf"
    } else {
        "number"
    }
}

/// Reject non-finite numbers for argument `index`.
pub fn check_finite(index: usize, value: f64) -> LuaResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(bad_argument(index, "number", numeric_type(value)))
    }
}

// ============================================================================
// Internal errors
// ============================================================================

/// A marshalled value did not match what the host function expected.
///
/// These indicate a mismatch between a declaration and its function and are
/// never caused by script input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("expected {expected} argument, got {actual}")]
    Mismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("missing argument for parameter #{index}")]
    Missing { index: usize },

    #[error("target is not a {expected}")]
    Receiver { expected: &'static str },
}

/// A failure produced by a host method.
pub enum Thrown {
    /// A script error, surfaced as-is.
    Lua(LuaError),
    /// Any other error, hidden from scripts.
    Host(Box<dyn std::error::Error + Send + Sync>),
}

impl Thrown {
    /// Classify an arbitrary error value.
    pub fn classify<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(error);
        match boxed.downcast::<LuaError>() {
            Ok(lua) => Thrown::Lua(*lua),
            Err(other) => Thrown::Host(other),
        }
    }
}

impl From<LuaError> for Thrown {
    fn from(error: LuaError) -> Self {
        Thrown::Lua(error)
    }
}

impl From<ConversionError> for Thrown {
    fn from(error: ConversionError) -> Self {
        Thrown::Host(Box::new(error))
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thrown::Lua(e) => f.debug_tuple("Lua").field(e).finish(),
            Thrown::Host(e) => f.debug_tuple("Host").field(&e.to_string()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_argument_is_one_based() {
        assert_eq!(
            bad_argument(1, "number", "string").message(),
            "bad argument #2 (number expected, got string)"
        );
    }

    #[test]
    fn non_finite_numbers_are_named() {
        assert_eq!(
            check_finite(0, f64::NAN).unwrap_err().message(),
            "bad argument #1 (number expected, got nan)"
        );
        assert_eq!(
            check_finite(0, f64::NEG_INFINITY).unwrap_err().message(),
            "bad argument #1 (number expected, got -inf)"
        );
        assert_eq!(check_finite(0, 2.5), Ok(2.5));
    }

    #[test]
    fn classify_separates_script_errors() {
        assert!(matches!(Thrown::classify(LuaError::new("!")), Thrown::Lua(e) if e.message() == "!"));
        let io = std::io::Error::other("disk on fire");
        assert!(matches!(Thrown::classify(io), Thrown::Host(_)));
    }
}
