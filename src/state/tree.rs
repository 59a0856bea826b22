//! Recursive state tree.

use super::{AggregationError, ROOT_PATH, child_path};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// A sampled or smoothed environment reading.
///
/// Mappings use a sorted map so the published JSON is stable between cycles.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StateTree {
    /// A key that is present but carries no reading (JSON `null`).
    #[default]
    Missing,
    /// A numeric reading.
    Leaf(f64),
    /// Named sub-readings.
    Node(BTreeMap<String, StateTree>),
}

impl StateTree {
    /// An empty mapping.
    pub fn node() -> Self {
        StateTree::Node(BTreeMap::new())
    }

    /// Builder-style insert. Turns `Missing` into a mapping first; leaves are
    /// returned unchanged.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StateTree>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a child, converting `Missing` into a mapping first.
    ///
    /// Returns `false` when `self` is a leaf.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StateTree>) -> bool {
        if self.is_missing() {
            *self = StateTree::node();
        }
        match self {
            StateTree::Node(map) => {
                map.insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, StateTree::Missing)
    }

    pub fn as_leaf(&self) -> Option<f64> {
        match self {
            StateTree::Leaf(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&BTreeMap<String, StateTree>> {
        match self {
            StateTree::Node(map) => Some(map),
            _ => None,
        }
    }

    /// Keys of a mapping, empty for leaves and missing values.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.as_node()
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    /// Look up a value by dotted path, e.g. `pm_units_env.pm25um`.
    pub fn get(&self, path: &str) -> Option<&StateTree> {
        path.split('.').try_fold(self, |tree, key| tree.as_node()?.get(key))
    }

    /// Look up a numeric leaf by dotted path.
    pub fn leaf(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(StateTree::as_leaf)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StateTree::Missing => "missing value",
            StateTree::Leaf(_) => "leaf",
            StateTree::Node(_) => "mapping",
        }
    }

    /// Ensure every leaf below `self` is finite.
    pub fn check_finite(&self, path: &str) -> Result<(), AggregationError> {
        match self {
            StateTree::Missing => Ok(()),
            StateTree::Leaf(v) if v.is_finite() => Ok(()),
            StateTree::Leaf(v) => Err(AggregationError::NonFinite {
                path: path.to_string(),
                value: *v,
            }),
            StateTree::Node(map) => map
                .iter()
                .try_for_each(|(key, child)| child.check_finite(&child_path(path, key))),
        }
    }

    /// Convert a JSON value, rejecting strings, booleans and arrays.
    pub fn from_json(value: &Value) -> Result<Self, AggregationError> {
        Self::from_json_at(value, ROOT_PATH)
    }

    fn from_json_at(value: &Value, path: &str) -> Result<Self, AggregationError> {
        let unsupported = |kind| AggregationError::UnsupportedValue {
            path: path.to_string(),
            kind,
        };
        match value {
            Value::Null => Ok(StateTree::Missing),
            Value::Number(n) => n.as_f64().map(StateTree::Leaf).ok_or(unsupported("number")),
            Value::Object(map) => map
                .iter()
                .map(|(key, child)| {
                    Self::from_json_at(child, &child_path(path, key)).map(|t| (key.clone(), t))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(StateTree::Node),
            Value::Bool(_) => Err(unsupported("boolean")),
            Value::String(_) => Err(unsupported("string")),
            Value::Array(_) => Err(unsupported("array")),
        }
    }

    /// Convert into a JSON value. Non-finite leaves become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            StateTree::Missing => Value::Null,
            StateTree::Leaf(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            StateTree::Node(map) => Value::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), child.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for StateTree {
    fn from(value: f64) -> Self {
        StateTree::Leaf(value)
    }
}

impl From<Option<f64>> for StateTree {
    fn from(value: Option<f64>) -> Self {
        value.map(StateTree::Leaf).unwrap_or(StateTree::Missing)
    }
}

impl From<BTreeMap<String, StateTree>> for StateTree {
    fn from(map: BTreeMap<String, StateTree>) -> Self {
        StateTree::Node(map)
    }
}

impl TryFrom<Value> for StateTree {
    type Error = AggregationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

impl From<&StateTree> for Value {
    fn from(tree: &StateTree) -> Self {
        tree.to_json()
    }
}

impl Serialize for StateTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StateTree::Missing => serializer.serialize_none(),
            StateTree::Leaf(v) => serializer.serialize_f64(*v),
            StateTree::Node(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, child) in map {
                    out.serialize_entry(key, child)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for StateTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        StateTree::from_json(&value).map_err(D::Error::custom)
    }
}
