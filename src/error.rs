//! The crate's unified error type.

use std::fmt;

/// Everything that can go wrong building or querying a [crate::Context].
///
/// Construction failures ([CcsError::Parse], [CcsError::ExpansionLimitExceeded])
/// discard the partially-built ruleset; query failures
/// ([CcsError::MissingProperty] and friends) leave the context usable.
#[derive(Debug, thiserror::Error)]
pub enum CcsError {
    #[error("{origin}: {message}")]
    Parse { origin: String, message: String },

    #[error(
        "expansion limit exceeded while converting a selector to DNF: {actual} clauses would be produced, limit is {limit}"
    )]
    ExpansionLimitExceeded { actual: usize, limit: usize },

    #[error("no property named '{name}' is set in this context")]
    MissingProperty { name: String },

    #[error("property '{name}' has no matching rule in this context")]
    EmptyProperty { name: String },

    #[error("property '{name}' is ambiguous in this context: {candidates:?}")]
    AmbiguousProperty {
        name: String,
        candidates: Vec<String>,
    },

    #[error("failed to cast value of '{name}' ({value:?}): {message}")]
    Cast {
        name: String,
        value: String,
        message: String,
    },
}

/// A non-fatal construction-time issue: a parse error in one of several
/// imported files, or a circular `@import`.
///
/// Collected rather than raised so a whole ruleset load can partially
/// succeed, per the crate's diagnostics policy.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub origin: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.message)
    }
}

impl Diagnostic {
    pub(crate) fn circular_import(origin: impl Into<String>, path: impl fmt::Display) -> Self {
        Self {
            origin: origin.into(),
            message: format!("circular @import of '{path}' skipped"),
        }
    }

    pub(crate) fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }
}
