//! Long-lived smoothed environment.

use super::{AggregationError, DecayAlpha, StateTree, aggregate};

/// Cycle-over-cycle smoothed environment owned by the dashboard loop.
///
/// The first snapshot is adopted as-is. Every later snapshot is folded in with
/// [`aggregate`]. A failed update leaves the previous state untouched.
#[derive(Debug, Clone)]
pub struct SmoothedEnvironment {
    alpha: DecayAlpha,
    state: Option<StateTree>,
    updates: u64,
}

impl SmoothedEnvironment {
    pub fn new(alpha: DecayAlpha) -> Self {
        Self {
            alpha,
            state: None,
            updates: 0,
        }
    }

    pub fn alpha(&self) -> DecayAlpha {
        self.alpha
    }

    /// Current smoothed state, `None` before the first snapshot.
    pub fn current(&self) -> Option<&StateTree> {
        self.state.as_ref()
    }

    /// Number of snapshots successfully folded in.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Fold a snapshot into the smoothed state.
    pub fn update(&mut self, snapshot: &StateTree) -> Result<&StateTree, AggregationError> {
        let next = match &self.state {
            Some(previous) => aggregate(previous, snapshot, self.alpha)?,
            None => aggregate(&StateTree::Missing, snapshot, self.alpha)?,
        };
        self.updates += 1;
        Ok(self.state.insert(next))
    }

    /// Serialize the current state as a JSON payload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self.state.as_ref().unwrap_or(&StateTree::Missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> StateTree {
        StateTree::from_json(&value).unwrap()
    }

    #[test]
    fn test_first_snapshot_is_adopted() {
        let mut env = SmoothedEnvironment::new(DecayAlpha::new(0.9).unwrap());
        assert!(env.current().is_none());

        let first = tree(json!({"temperature": 20.0, "light": 100.0}));
        assert_eq!(env.update(&first).unwrap(), &first);
        assert_eq!(env.updates(), 1);
    }

    #[test]
    fn test_later_snapshots_are_smoothed() {
        let mut env = SmoothedEnvironment::new(DecayAlpha::new(0.5).unwrap());
        env.update(&tree(json!({"temperature": 20.0}))).unwrap();
        env.update(&tree(json!({"temperature": 30.0}))).unwrap();
        assert_eq!(env.current().unwrap().leaf("temperature"), Some(25.0));
        assert_eq!(env.to_json().unwrap(), r#"{"temperature":25.0}"#);
    }

    #[test]
    fn test_failed_update_keeps_previous_state() {
        let mut env = SmoothedEnvironment::new(DecayAlpha::default());
        let first = tree(json!({"pm": {"p03um": 5.0}}));
        env.update(&first).unwrap();

        let err = env.update(&tree(json!({"pm": 5.0}))).unwrap_err();
        assert!(matches!(err, AggregationError::StructuralMismatch { .. }));
        assert_eq!(env.current(), Some(&first));
        assert_eq!(env.updates(), 1);
    }

    #[test]
    fn test_empty_serializes_as_null() {
        let env = SmoothedEnvironment::new(DecayAlpha::default());
        assert_eq!(env.to_json().unwrap(), "null");
    }
}
