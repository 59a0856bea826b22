//! Exponentially decayed merge of state trees.

use super::{AggregationError, DecayAlpha, ROOT_PATH, StateTree, child_path};
use log::debug;
use std::collections::BTreeMap;

/// Fold a freshly sampled tree into the previous smoothed tree.
///
/// The result has exactly the keys of `new` at every level. For each key:
/// - a missing new reading carries the previous value forward, and stays
///   missing when there is no previous value either,
/// - a missing previous value adopts the new reading verbatim,
/// - mappings are merged recursively,
/// - numeric leaves become `alpha * old + (1 - alpha) * new`.
///
/// A key holding a leaf on one side and a mapping on the other fails with
/// [`AggregationError::StructuralMismatch`]. Non-finite leaves entering the
/// result fail with [`AggregationError::NonFinite`]. Neither input is modified.
pub fn aggregate(
    old: &StateTree,
    new: &StateTree,
    alpha: DecayAlpha,
) -> Result<StateTree, AggregationError> {
    merge(Some(old), new, alpha, ROOT_PATH)
}

/// Merge one value. `old` is `None` when the previous mapping lacks the key.
fn merge(
    old: Option<&StateTree>,
    new: &StateTree,
    alpha: DecayAlpha,
    path: &str,
) -> Result<StateTree, AggregationError> {
    let old = old.filter(|o| !o.is_missing());

    if new.is_missing() {
        return Ok(match old {
            Some(previous) => {
                debug!("[State] No new value for {}, keeping previous", path);
                previous.clone()
            }
            None => StateTree::Missing,
        });
    }

    let Some(old) = old else {
        debug!("[State] No previous value for {}, adopting new", path);
        new.check_finite(path)?;
        return Ok(new.clone());
    };

    match (old, new) {
        (StateTree::Node(old_map), StateTree::Node(new_map)) => {
            merge_nodes(old_map, new_map, alpha, path)
        }
        (StateTree::Leaf(o), StateTree::Leaf(n)) => {
            for value in [*o, *n] {
                if !value.is_finite() {
                    return Err(AggregationError::NonFinite {
                        path: path.to_string(),
                        value,
                    });
                }
            }
            Ok(StateTree::Leaf(alpha.blend(*o, *n)))
        }
        (old, new) => Err(AggregationError::StructuralMismatch {
            path: path.to_string(),
            old: old.kind(),
            new: new.kind(),
        }),
    }
}

fn merge_nodes(
    old: &BTreeMap<String, StateTree>,
    new: &BTreeMap<String, StateTree>,
    alpha: DecayAlpha,
    path: &str,
) -> Result<StateTree, AggregationError> {
    let mut merged = BTreeMap::new();
    for (key, new_value) in new {
        let key_path = child_path(path, key);
        let value = merge(old.get(key), new_value, alpha, &key_path)?;
        merged.insert(key.clone(), value);
    }
    Ok(StateTree::Node(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> StateTree {
        StateTree::from_json(&value).unwrap()
    }

    fn alpha(value: f64) -> DecayAlpha {
        DecayAlpha::new(value).unwrap()
    }

    #[test]
    fn test_adopts_new_when_no_previous() {
        let result = aggregate(&tree(json!({})), &tree(json!({"a": 5.0})), alpha(0.9)).unwrap();
        assert_eq!(result, tree(json!({"a": 5.0})));
    }

    #[test]
    fn test_keeps_previous_when_new_missing() {
        let result = aggregate(
            &tree(json!({"a": 5.0})),
            &tree(json!({"a": null})),
            alpha(0.9),
        )
        .unwrap();
        assert_eq!(result, tree(json!({"a": 5.0})));
    }

    #[test]
    fn test_missing_on_both_sides_keeps_key_as_missing() {
        let result = aggregate(
            &tree(json!({"b": 1.0})),
            &tree(json!({"a": null, "b": 2.0})),
            alpha(0.5),
        )
        .unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(result.get("a").unwrap().is_missing());
    }

    #[test]
    fn test_unread_key_is_kept_whatever_the_previous_state() {
        let new = tree(json!({"temperature": null, "light": 3.0}));
        let expected = vec!["light", "temperature"];

        let first = aggregate(&StateTree::Missing, &new, alpha(0.5)).unwrap();
        let from_empty = aggregate(&StateTree::node(), &new, alpha(0.5)).unwrap();
        let later = aggregate(&first, &new, alpha(0.5)).unwrap();

        for result in [&first, &from_empty, &later] {
            assert_eq!(result.keys().collect::<Vec<_>>(), expected);
            assert!(result.get("temperature").unwrap().is_missing());
            assert_eq!(result.leaf("light"), Some(3.0));
        }
        assert_eq!(
            serde_json::to_string(&later).unwrap(),
            r#"{"light":3.0,"temperature":null}"#
        );
    }

    #[test]
    fn test_recursive_merge() {
        let result = aggregate(
            &tree(json!({"a": {"b": 10.0}})),
            &tree(json!({"a": {"b": 20.0}})),
            alpha(0.5),
        )
        .unwrap();
        assert_eq!(result, tree(json!({"a": {"b": 15.0}})));
    }

    #[test]
    fn test_missing_subtree_is_carried_forward() {
        let old = tree(json!({"temperature": 20.0, "pm_particles": {"p03um": 100.0}}));
        let new = tree(json!({"temperature": 22.0, "pm_particles": null}));
        let result = aggregate(&old, &new, alpha(0.5)).unwrap();
        assert_eq!(result.leaf("temperature"), Some(21.0));
        assert_eq!(result.leaf("pm_particles.p03um"), Some(100.0));
    }

    #[test]
    fn test_keys_only_in_previous_are_dropped() {
        let old = tree(json!({"a": 1.0, "gone": 3.0, "n": {"x": 1.0, "y": 2.0}}));
        let new = tree(json!({"a": 2.0, "n": {"x": 3.0}, "fresh": 4.0}));
        let result = aggregate(&old, &new, alpha(0.5)).unwrap();

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["a", "fresh", "n"]);
        assert_eq!(result.get("n").unwrap().keys().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(result.leaf("fresh"), Some(4.0));
    }

    #[test]
    fn test_structural_mismatch_leaf_then_mapping() {
        let err = aggregate(
            &tree(json!({"a": 5.0})),
            &tree(json!({"a": {"b": 1.0}})),
            alpha(0.9),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AggregationError::StructuralMismatch {
                path: "a".to_string(),
                old: "leaf",
                new: "mapping",
            }
        );
    }

    #[test]
    fn test_structural_mismatch_nested_mapping_then_leaf() {
        let err = aggregate(
            &tree(json!({"pm": {"env": {"pm25um": 3.0}}})),
            &tree(json!({"pm": {"env": 3.0}})),
            alpha(0.9),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AggregationError::StructuralMismatch { ref path, old: "mapping", new: "leaf" } if path == "pm.env"
        ));
    }

    #[test]
    fn test_root_leaves_are_smoothed() {
        let result = aggregate(&StateTree::Leaf(10.0), &StateTree::Leaf(20.0), alpha(0.75)).unwrap();
        assert_eq!(result, StateTree::Leaf(12.5));

        let result = aggregate(&StateTree::Missing, &StateTree::Leaf(4.0), alpha(0.75)).unwrap();
        assert_eq!(result, StateTree::Leaf(4.0));

        let result = aggregate(&StateTree::Leaf(4.0), &StateTree::Missing, alpha(0.75)).unwrap();
        assert_eq!(result, StateTree::Leaf(4.0));
    }

    #[test]
    fn test_non_finite_leaves_are_rejected() {
        let err = aggregate(
            &tree(json!({"a": 1.0})),
            &StateTree::node().with("a", f64::INFINITY),
            alpha(0.5),
        )
        .unwrap_err();
        assert!(matches!(err, AggregationError::NonFinite { ref path, .. } if path == "a"));

        let err = aggregate(
            &StateTree::node(),
            &StateTree::node().with("n", StateTree::node().with("x", f64::NAN)),
            alpha(0.5),
        )
        .unwrap_err();
        assert!(matches!(err, AggregationError::NonFinite { ref path, .. } if path == "n.x"));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let old = tree(json!({"a": 1.0, "b": {"c": 2.0}}));
        let new = tree(json!({"a": 3.0, "b": {"c": null}}));
        let (old_before, new_before) = (old.clone(), new.clone());
        let _ = aggregate(&old, &new, alpha(0.5)).unwrap();
        assert_eq!(old, old_before);
        assert_eq!(new, new_before);
    }

    #[test]
    fn test_result_stays_between_old_and_new() {
        let pairs = [(0.0, 1.0), (-40.0, 85.0), (1013.25, 990.0), (1e6, -1e6), (3.0, 3.0)];
        let alphas = [0.01, 0.25, 0.5, 0.9, 0.97, 0.999];
        for &(o, n) in &pairs {
            for &a in &alphas {
                let result = aggregate(
                    &StateTree::node().with("v", o),
                    &StateTree::node().with("v", n),
                    alpha(a),
                )
                .unwrap();
                let v = result.leaf("v").unwrap();
                let tolerance = 1e-9 * o.abs().max(n.abs()).max(1.0);
                assert!(
                    v >= o.min(n) - tolerance && v <= o.max(n) + tolerance,
                    "{} not between {} and {} for alpha {}",
                    v,
                    o,
                    n,
                    a
                );
            }
        }
    }

    #[test]
    fn test_identical_input_is_a_fixed_point() {
        let state = tree(json!({
            "temperature": 21.37,
            "pressure": 1008.4,
            "pm_units_std": {"pm10um": 2.0, "pm25um": 3.0, "pm100um": 4.0}
        }));
        let result = aggregate(&state, &state, alpha(0.97)).unwrap();
        for path in ["temperature", "pressure", "pm_units_std.pm25um"] {
            let (a, b) = (result.leaf(path).unwrap(), state.leaf(path).unwrap());
            assert!((a - b).abs() < 1e-9, "{}: {} != {}", path, a, b);
        }
        assert_eq!(
            result.get("pm_units_std").unwrap().keys().count(),
            state.get("pm_units_std").unwrap().keys().count()
        );
    }

    #[test]
    fn test_repeated_updates_converge() {
        for a in [0.1, 0.5, 0.97] {
            let target = tree(json!({"t": 25.0, "pm": {"p": 10.0}}));
            let mut state = tree(json!({"t": -10.0, "pm": {"p": 500.0}}));
            for _ in 0..2000 {
                state = aggregate(&state, &target, alpha(a)).unwrap();
            }
            assert!((state.leaf("t").unwrap() - 25.0).abs() < 1e-6);
            assert!((state.leaf("pm.p").unwrap() - 10.0).abs() < 1e-6);
        }
    }
}
