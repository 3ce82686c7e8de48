//! Call arguments and their JSON serialization policy.
//!
//! Every argument is classified once, at the call boundary, into one of
//! three capabilities:
//!
//! - [`Argument::Value`]: already plain JSON (primitives, or anything whose
//!   `Serialize` impl survives a JSON round-trip).
//! - [`Argument::Custom`]: a type implementing [`JsonArgument`], which
//!   controls its own document (designators, poses, ...).
//! - [`Argument::Opaque`]: anything else. The callable can still use it, but
//!   it is left out of serialized documents with a warning.

use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::BindError;

/// Custom serialization capability for call arguments.
pub trait JsonArgument: fmt::Debug + Send + Sync {
    /// The JSON document representing this argument.
    fn to_json(&self) -> Value;

    /// Designator type name, if this argument is persisted as a designator
    /// row when it is the `self` argument of a call.
    fn designator_type(&self) -> Option<&str> {
        None
    }
}

/// A single bound argument.
#[derive(Clone)]
pub enum Argument {
    Value(Value),
    Custom {
        json: Arc<dyn JsonArgument>,
        value: Arc<dyn Any + Send + Sync>,
    },
    Opaque {
        type_name: &'static str,
        value: Arc<dyn Any + Send + Sync>,
    },
}

impl Argument {
    /// Classifies a serializable value.
    ///
    /// Falls back to [`Argument::Opaque`] when the value does not survive a
    /// JSON round-trip.
    pub fn from_serialize<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        match json_round_trip(&value) {
            Ok(json) => Argument::Value(json),
            Err(_) => Argument::opaque(value),
        }
    }

    /// Wraps a value with its own JSON representation.
    pub fn custom<T>(value: T) -> Self
    where
        T: JsonArgument + 'static,
    {
        let shared = Arc::new(value);
        Argument::Custom {
            json: shared.clone(),
            value: shared,
        }
    }

    /// Wraps a value that has no JSON representation.
    pub fn opaque<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Argument::Opaque {
            type_name: any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// The JSON document for this argument, or `None` for opaque values.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Argument::Value(json) => Some(json.clone()),
            Argument::Custom { json, .. } => Some(json.to_json()),
            Argument::Opaque { .. } => None,
        }
    }

    /// Borrows the original value of a custom or opaque argument.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Argument::Value(_) => None,
            Argument::Custom { value, .. } | Argument::Opaque { value, .. } => {
                value.downcast_ref::<T>()
            }
        }
    }

    /// Designator type of a custom argument, if it declares one.
    pub fn designator_type(&self) -> Option<&str> {
        match self {
            Argument::Custom { json, .. } => json.designator_type(),
            _ => None,
        }
    }
}

fn json_round_trip<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    let text = serde_json::to_string(value)?;
    serde_json::from_str(&text)
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Argument::Value(a), Argument::Value(b)) => a == b,
            (Argument::Custom { json: a, .. }, Argument::Custom { json: b, .. }) => {
                a.to_json() == b.to_json()
            }
            (Argument::Opaque { value: a, .. }, Argument::Opaque { value: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(json) => f.debug_tuple("Value").field(json).finish(),
            Argument::Custom { json, .. } => f.debug_tuple("Custom").field(json).finish(),
            Argument::Opaque { type_name, .. } => {
                f.debug_struct("Opaque").field("type_name", type_name).finish()
            }
        }
    }
}

impl From<Value> for Argument {
    fn from(json: Value) -> Self {
        Argument::Value(json)
    }
}

macro_rules! argument_from_primitive {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Argument {
            fn from(value: $ty) -> Self {
                Argument::Value(Value::from(value))
            }
        })*
    };
}

argument_from_primitive!(bool, i32, i64, u32, u64, f64, String, &str);

/// Named call arguments. Comparison ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(IndexMap<String, Argument>);

impl Arguments {
    pub fn new() -> Self {
        Arguments(IndexMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, argument: impl Into<Argument>) -> Self {
        self.insert(name, argument);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, argument: impl Into<Argument>) {
        self.0.insert(name.into(), argument.into());
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.0.get(name)
    }

    /// Removes and returns an argument.
    pub fn take(&mut self, name: &str) -> Option<Argument> {
        self.0.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.0.iter().map(|(name, arg)| (name.as_str(), arg))
    }

    /// Reads a JSON-representable argument as `T`.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> Result<T, BindError> {
        let json = self
            .get(name)
            .and_then(Argument::to_json)
            .ok_or_else(|| BindError::InvalidArgument {
                name: name.to_string(),
                reason: "no JSON value bound".to_string(),
            })?;
        serde_json::from_value(json).map_err(|err| BindError::InvalidArgument {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    /// Borrows a custom or opaque argument as its original type.
    pub fn get_ref<T: Any>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(Argument::downcast_ref::<T>)
    }

    /// Serializes every representable argument, skipping opaque ones.
    ///
    /// Each argument is handled independently: a skipped argument never
    /// affects its siblings.
    pub fn to_json(&self, operation: &str) -> Map<String, Value> {
        let mut result = Map::new();
        for (name, argument) in &self.0 {
            match argument.to_json() {
                Some(json) => {
                    result.insert(name.clone(), json);
                }
                None => {
                    if let Argument::Opaque { type_name, .. } = argument {
                        tracing::warn!(
                            operation,
                            argument = %name,
                            type_name,
                            "argument cannot be JSON serialized, skipping"
                        );
                    }
                }
            }
        }
        result
    }
}

impl FromIterator<(String, Argument)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Argument)>>(iter: I) -> Self {
        Arguments(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use serde_json::json;

    #[derive(Debug)]
    struct Gripper {
        side: String,
    }

    impl JsonArgument for Gripper {
        fn to_json(&self) -> Value {
            json!({ "gripper": self.side })
        }
    }

    #[test]
    fn from_serialize_keeps_plain_json() {
        let arg = Argument::from_serialize(vec![1.3, 1.0, 0.9]);
        assert_eq!(arg, Argument::Value(json!([1.3, 1.0, 0.9])));
    }

    #[test]
    fn from_serialize_falls_back_to_opaque_for_non_string_keys() {
        let mut grid = HashMap::new();
        grid.insert((1, 2), "cell");
        let arg = Argument::from_serialize(grid);
        assert!(matches!(arg, Argument::Opaque { .. }));
        assert!(arg.to_json().is_none());
    }

    #[test]
    fn custom_arguments_use_their_own_document() {
        let arg = Argument::custom(Gripper {
            side: "left".into(),
        });
        assert_eq!(arg.to_json(), Some(json!({ "gripper": "left" })));
        assert_eq!(arg.downcast_ref::<Gripper>().unwrap().side, "left");
    }

    #[test]
    fn opaque_arguments_are_skipped_but_siblings_survive() {
        let args = Arguments::new()
            .with("x", 1)
            .with("handle", Argument::opaque(std::sync::Mutex::new(0u8)))
            .with("name", "milk");

        let doc = args.to_json("perform");
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["x"], json!(1));
        assert_eq!(doc["name"], json!("milk"));
        assert!(!doc.contains_key("handle"));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = Arguments::new().with("x", 1).with("y", "up");
        let b = Arguments::new().with("y", "up").with("x", 1);
        assert_eq!(a, b);
        assert_ne!(a, Arguments::new().with("x", 2).with("y", "up"));
    }

    #[test]
    fn opaque_equality_is_identity() {
        let arg = Argument::opaque(5u8);
        assert_eq!(arg, arg.clone());
        assert_ne!(arg, Argument::opaque(5u8));
    }

    #[test]
    fn typed_reads() {
        let args = Arguments::new().with("height", 0.3).with("arm", "left");
        let height: f64 = args.value("height").unwrap();
        assert_eq!(height, 0.3);
        assert!(args.value::<f64>("arm").is_err());
        assert!(args.value::<f64>("missing").is_err());
    }
}
