//! Attribute access for condition evaluation
//!
//! Conditions never reflect over arbitrary objects. Each participant in a
//! decision exposes its attributes through [`AttributeResolver`], walked one
//! path segment at a time.

use crate::core::urn::Urn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Scalar attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(n) => Some(*n as f64),
            AttributeValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert a JSON scalar; objects, arrays and null have no scalar form
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(AttributeValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(AttributeValue::Int)
                .or_else(|| n.as_f64().map(AttributeValue::Float)),
            Value::String(s) => Some(AttributeValue::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Numbers compare numerically. Policy literals are written as text, so a
/// string equals any other scalar with the same text form.
impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        use AttributeValue::*;

        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (String(s), other) | (other, String(s)) => *s == other.to_string(),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(n) => write!(f, "{}", n),
            AttributeValue::Float(n) => write!(f, "{}", n),
            AttributeValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Int(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

/// Read access to a participant's attributes
pub trait AttributeResolver {
    /// Walk `path` and return the scalar at its end, `None` if any segment is missing
    fn get(&self, path: &[&str]) -> Option<AttributeValue>;

    /// Short identity used in diagnostics and authorization errors
    fn describe(&self) -> String {
        "<anonymous>".to_string()
    }
}

/// A participant that can be matched against resource patterns
pub trait Resource: AttributeResolver {
    fn urn(&self) -> &Urn;
}

/// Resolver with no attributes, used when a decision carries no request context
pub struct NoAttributes;

impl AttributeResolver for NoAttributes {
    fn get(&self, _path: &[&str]) -> Option<AttributeValue> {
        None
    }
}

impl AttributeResolver for Value {
    fn get(&self, path: &[&str]) -> Option<AttributeValue> {
        let mut current = self;
        for segment in path {
            current = match current {
                Value::Object(map) => map.get(*segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        AttributeValue::from_json(current)
    }

    fn describe(&self) -> String {
        ["urn", "id", "name"]
            .iter()
            .find_map(|key| AttributeResolver::get(self, &[*key]))
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

impl AttributeResolver for HashMap<String, AttributeValue> {
    fn get(&self, path: &[&str]) -> Option<AttributeValue> {
        match path {
            [key] => HashMap::get(self, *key).cloned(),
            _ => None,
        }
    }
}

/// URN fields are addressable by name; `id` is shorthand for `resource_id`
impl AttributeResolver for Urn {
    fn get(&self, path: &[&str]) -> Option<AttributeValue> {
        let [field] = path else {
            return None;
        };

        let value = match *field {
            "scheme" => self.scheme(),
            "partition" => self.partition(),
            "service" => self.service(),
            "region" => self.region(),
            "account_id" => self.account_id(),
            "resource_type" => self.resource_type()?,
            "resource_id" | "id" => self.resource_id()?,
            _ => return None,
        };

        Some(AttributeValue::String(value.to_string()))
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl Resource for Urn {
    fn urn(&self) -> &Urn {
        self
    }
}

/// A URN paired with a JSON attribute document
///
/// Attribute lookups read the document first. Paths under `urn` address the
/// URN's own fields.
#[derive(Debug, Clone)]
pub struct Entity {
    urn: Urn,
    attributes: Value,
}

impl Entity {
    pub fn new(urn: Urn, attributes: Value) -> Self {
        Entity { urn, attributes }
    }

    pub fn attributes(&self) -> &Value {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Value {
        &mut self.attributes
    }

    pub fn set_urn(&mut self, urn: Urn) {
        self.urn = urn;
    }
}

impl AttributeResolver for Entity {
    fn get(&self, path: &[&str]) -> Option<AttributeValue> {
        if let Some(value) = AttributeResolver::get(&self.attributes, path) {
            return Some(value);
        }

        match path {
            ["urn"] => Some(AttributeValue::String(self.urn.to_string())),
            ["urn", rest @ ..] => self.urn.get(rest),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        self.urn.to_string()
    }
}

impl Resource for Entity {
    fn urn(&self) -> &Urn {
        &self.urn
    }
}
