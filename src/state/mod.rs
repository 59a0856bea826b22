//! Smoothed environment state.
//!
//! Sensor snapshots are represented as [`StateTree`]s: numeric leaves nested in
//! string-keyed mappings. [`aggregate`] folds each new snapshot into the
//! previous smoothed tree using an exponential moving average, and
//! [`SmoothedEnvironment`] owns the long-lived result.

mod aggregate;
mod alpha;
mod smoothed;
mod tree;

pub use aggregate::aggregate;
pub use alpha::DecayAlpha;
pub use smoothed::SmoothedEnvironment;
pub use tree::StateTree;

use thiserror::Error;

/// Path used in error messages for the top of a tree.
pub const ROOT_PATH: &str = "<root>";

/// Errors produced while converting or aggregating state trees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    /// The same key holds a leaf on one side and a mapping on the other.
    #[error("structural mismatch at {path}: previous value is a {old}, new value is a {new}")]
    StructuralMismatch {
        path: String,
        old: &'static str,
        new: &'static str,
    },

    /// A leaf that would enter the smoothed state is NaN or infinite.
    #[error("non-finite value {value} at {path}")]
    NonFinite { path: String, value: f64 },

    /// Decay alpha outside the open interval (0, 1).
    #[error("decay alpha must be strictly between 0 and 1, got {0}")]
    InvalidAlpha(f64),

    /// A JSON value that has no state tree representation (string, bool, array).
    #[error("unsupported {kind} value at {path}")]
    UnsupportedValue { path: String, kind: &'static str },
}

/// Join a parent path and a key into a dotted path.
pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent == ROOT_PATH {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        assert_eq!(child_path(ROOT_PATH, "temperature"), "temperature");
        assert_eq!(child_path("pm_units_env", "pm25um"), "pm_units_env.pm25um");
    }

    #[test]
    fn test_error_messages_name_the_path() {
        let err = AggregationError::StructuralMismatch {
            path: "pm_particles".to_string(),
            old: "leaf",
            new: "mapping",
        };
        assert_eq!(
            err.to_string(),
            "structural mismatch at pm_particles: previous value is a leaf, new value is a mapping"
        );
    }
}
