//! Error types for category model operations
//!
//! Hard failures are reported through [`ModelError`]. Learning calls that
//! simply decline to change the model (no feasible solution, solution too
//! disruptive) are not errors; they surface as
//! [`LearningOutcome::Rejected`](crate::learning::LearningOutcome).

use std::fmt;

/// Result type alias for category model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error type for category model operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A label that is not present in the category table
    UnknownCategory { name: String },

    /// A radius that is zero, negative or not finite
    DegenerateRadius {
        category: String,
        parameter: String,
        value: f64,
    },

    /// A parameter outside its admissible range
    InvalidParameter {
        parameter: String,
        value: String,
        constraint: String,
    },

    /// Malformed observation context (colour count, target index, labels)
    InvalidContext { reason: String },

    /// The optimiser failed in a way that is not a plain non-convergence
    Solver { details: String },

    /// Underlying I/O failure while reading or writing a category table
    Io { details: String },

    /// Category table text could not be parsed
    Parse { line: usize, reason: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownCategory { name } => {
                write!(f, "Unknown category '{}': not present in the model", name)
            }
            ModelError::DegenerateRadius {
                category,
                parameter,
                value,
            } => write!(
                f,
                "Degenerate radius for category '{}': {} = {} must be a positive finite value",
                category, parameter, value
            ),
            ModelError::InvalidParameter {
                parameter,
                value,
                constraint,
            } => write!(
                f,
                "Invalid parameter '{}' = '{}': must satisfy {}",
                parameter, value, constraint
            ),
            ModelError::InvalidContext { reason } => {
                write!(f, "Invalid observation context: {}", reason)
            }
            ModelError::Solver { details } => write!(f, "Optimiser failure: {}", details),
            ModelError::Io { details } => write!(f, "I/O error: {}", details),
            ModelError::Parse { line, reason } => {
                write!(f, "Parse error on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io {
            details: err.to_string(),
        }
    }
}

impl ModelError {
    pub fn unknown_category(name: impl Into<String>) -> Self {
        ModelError::UnknownCategory { name: name.into() }
    }

    pub fn degenerate_radius(
        category: impl Into<String>,
        parameter: impl Into<String>,
        value: f64,
    ) -> Self {
        ModelError::DegenerateRadius {
            category: category.into(),
            parameter: parameter.into(),
            value,
        }
    }

    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        ModelError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    pub fn invalid_context(reason: impl Into<String>) -> Self {
        ModelError::InvalidContext {
            reason: reason.into(),
        }
    }

    pub fn solver(details: impl Into<String>) -> Self {
        ModelError::Solver {
            details: details.into(),
        }
    }

    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        ModelError::Parse {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_display() {
        let err = ModelError::unknown_category("mauve");
        assert!(err.to_string().contains("mauve"));
    }

    #[test]
    fn test_degenerate_radius_display() {
        let err = ModelError::degenerate_radius("red", "hr", 0.0);
        let msg = err.to_string();
        assert!(msg.contains("red"));
        assert!(msg.contains("hr"));
    }

    #[test]
    fn test_parse_display_carries_line() {
        let err = ModelError::parse(7, "expected 7 columns");
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("expected 7 columns"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing preset");
        let err: ModelError = io.into();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModelError>();
    }
}
