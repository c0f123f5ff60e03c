//! Policy document structure
//!
//! A document is a named bundle of rules. Each rule binds a URN pattern and a
//! set of actions to an effect, optionally gated by condition groups:
//!
//! ```json
//! [{ "name": "CognitoPowerUser", "description": "...", "version": "1",
//!    "rules": [{ "description": "Allow owners to read their account",
//!                "resource": "urn:acme:cognito:*:*:user",
//!                "action": ["cognito:ReadUser"],
//!                "effect": "allow",
//!                "conditions": [{ "equal": { "subject::id": ["resource::id"] } }] }] }]
//! ```

use super::attribute::AttributeValue;
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

/// Outcome a satisfied rule contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    /// Takes precedence over Allow
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<AttributeValue>),
    One(AttributeValue),
}

type RawGroup = BTreeMap<String, BTreeMap<String, OneOrMany>>;

/// An operator applied to one or more attribute comparisons
///
/// Wire form is a single-key object: `{ "<operator>": { "<path>": [<refs>...] } }`.
/// A bare value is accepted where a list is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGroup", into = "RawGroup")]
pub struct ConditionGroup {
    pub operator: String,
    /// Left-hand attribute reference -> candidate right-hand references
    pub clauses: BTreeMap<String, Vec<AttributeValue>>,
}

impl ConditionGroup {
    pub fn new(operator: impl Into<String>) -> Self {
        ConditionGroup {
            operator: operator.into(),
            clauses: BTreeMap::new(),
        }
    }

    /// Shorthand for an `equal` group with one clause
    pub fn equal(left: &str, right: Vec<AttributeValue>) -> Self {
        Self::new("equal").with_clause(left, right)
    }

    pub fn with_clause(mut self, left: &str, right: Vec<AttributeValue>) -> Self {
        self.clauses.insert(left.to_string(), right);
        self
    }
}

impl TryFrom<RawGroup> for ConditionGroup {
    type Error = String;

    fn try_from(raw: RawGroup) -> std::result::Result<Self, Self::Error> {
        if raw.len() != 1 {
            return Err(format!(
                "condition must name exactly one operator, found {}",
                raw.len()
            ));
        }

        let (operator, raw_clauses) = raw.into_iter().next().ok_or("empty condition")?;
        let clauses = raw_clauses
            .into_iter()
            .map(|(left, right)| {
                let values = match right {
                    OneOrMany::Many(values) => values,
                    OneOrMany::One(value) => vec![value],
                };
                (left, values)
            })
            .collect();

        Ok(ConditionGroup { operator, clauses })
    }
}

impl From<ConditionGroup> for RawGroup {
    fn from(group: ConditionGroup) -> Self {
        let clauses = group
            .clauses
            .into_iter()
            .map(|(left, right)| (left, OneOrMany::Many(right)))
            .collect();

        let mut raw = BTreeMap::new();
        raw.insert(group.operator, clauses);
        raw
    }
}

/// A single rule
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuleDefinition {
    #[serde(default)]
    pub description: String,

    /// URN pattern this rule applies to
    #[validate(length(min = 1, message = "rule has no resource pattern"))]
    pub resource: String,

    /// Actions this rule applies to
    #[validate(length(min = 1, message = "rule has no actions"))]
    pub action: Vec<String>,

    pub effect: Effect,

    /// All groups must hold for the rule to be satisfied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionGroup>,
}

impl RuleDefinition {
    pub fn new(effect: Effect, action: Vec<&str>, resource: &str) -> Self {
        RuleDefinition {
            description: String::new(),
            resource: resource.to_string(),
            action: action.into_iter().map(str::to_string).collect(),
            effect,
            conditions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_condition(mut self, group: ConditionGroup) -> Self {
        self.conditions.push(group);
        self
    }
}

/// Named bundle of rules
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PolicyDocument {
    #[validate(length(min = 1, message = "policy document has no name"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    #[validate(nested)]
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl PolicyDocument {
    pub fn new(name: &str) -> Self {
        PolicyDocument {
            name: name.to_string(),
            description: String::new(),
            version: "1".to_string(),
            rules: Vec::new(),
        }
    }

    pub fn add_rule(&mut self, rule: RuleDefinition) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: RuleDefinition) -> Self {
        self.add_rule(rule);
        self
    }

    /// Parse policy JSON holding either an array of documents or one document
    ///
    /// `source_name` identifies the input in `PolicyLoad` errors.
    pub fn parse_many(json: &str, source_name: &str) -> Result<Vec<PolicyDocument>> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| GuardError::policy_load(source_name, e))?;
        Self::from_value(value, source_name)
    }

    /// Decode already-parsed JSON (array or single document)
    pub fn from_value(value: Value, source_name: &str) -> Result<Vec<PolicyDocument>> {
        let documents = match value {
            Value::Array(_) => serde_json::from_value(value),
            other => serde_json::from_value(other).map(|doc| vec![doc]),
        }
        .map_err(|e| GuardError::policy_load(source_name, e))?;

        Ok(documents)
    }

    /// Serialize a set of documents to pretty JSON
    pub fn to_json(documents: &[PolicyDocument]) -> Result<String> {
        serde_json::to_string_pretty(documents).map_err(|e| GuardError::policy_load("serialize", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COGNITO: &str = r#"
    [
      { "name": "CognitoPowerUser",
        "description": "Provides administrative access to existing Cognito resources",
        "version": "1",
        "rules": [
          {
            "description": "Allow owners to read their account",
            "resource": "urn:acme:cognito:*:*:user",
            "action": ["cognito:ReadUser"],
            "effect": "allow",
            "conditions": [
              { "equal": { "user::id": ["resource::id"] } }
            ]
          }
        ]
      }
    ]"#;

    #[test]
    fn test_parse_document_array() {
        let docs = PolicyDocument::parse_many(COGNITO, "inline").unwrap();
        assert_eq!(docs.len(), 1);

        let rule = &docs[0].rules[0];
        assert_eq!(rule.resource, "urn:acme:cognito:*:*:user");
        assert_eq!(rule.action, vec!["cognito:ReadUser"]);
        assert_eq!(rule.effect, Effect::Allow);
        assert_eq!(rule.conditions.len(), 1);
        assert_eq!(rule.conditions[0].operator, "equal");
        assert_eq!(
            rule.conditions[0].clauses["user::id"],
            vec![AttributeValue::from("resource::id")]
        );
    }

    #[test]
    fn test_parse_single_document() {
        let json = r#"{ "name": "Storage", "rules": [
            { "resource": "urn:acme:storage:*:*", "action": ["storage:ReadObject"], "effect": "deny" }
        ] }"#;

        let docs = PolicyDocument::parse_many(json, "inline").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].rules[0].effect, Effect::Deny);
        assert!(docs[0].rules[0].conditions.is_empty());
    }

    #[test]
    fn test_scalar_condition_value() {
        let group: ConditionGroup =
            serde_json::from_str(r#"{ "equal": { "user::id": "1" } }"#).unwrap();
        assert_eq!(group.clauses["user::id"], vec![AttributeValue::from("1")]);
    }

    #[test]
    fn test_condition_requires_one_operator() {
        assert!(serde_json::from_str::<ConditionGroup>(r#"{}"#).is_err());
        assert!(serde_json::from_str::<ConditionGroup>(
            r#"{ "equal": {}, "not_equal": {} }"#
        )
        .is_err());
    }

    #[test]
    fn test_missing_effect_is_load_error() {
        let json = r#"[{ "name": "Broken", "rules": [
            { "resource": "urn:acme:storage:*:*", "action": ["read"] }
        ] }]"#;

        match PolicyDocument::parse_many(json, "broken.json") {
            Err(GuardError::PolicyLoad { source_name, .. }) => assert_eq!(source_name, "broken.json"),
            other => panic!("expected PolicyLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_effect_is_load_error() {
        let json = r#"[{ "name": "Broken", "rules": [
            { "resource": "urn:acme:storage:*:*", "action": ["read"], "effect": "maybe" }
        ] }]"#;
        assert!(PolicyDocument::parse_many(json, "inline").is_err());
    }

    #[test]
    fn test_invalid_json_is_load_error() {
        assert!(matches!(
            PolicyDocument::parse_many("[{", "inline"),
            Err(GuardError::PolicyLoad { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let mut doc = PolicyDocument::new("Test");
        doc.add_rule(RuleDefinition::new(Effect::Allow, vec!["read"], "urn:a:b"));
        assert!(doc.validate().is_ok());

        doc.add_rule(RuleDefinition::new(Effect::Allow, vec![], "urn:a:b"));
        assert!(doc.validate().is_err());

        let no_resource = PolicyDocument::new("Test")
            .with_rule(RuleDefinition::new(Effect::Allow, vec!["read"], ""));
        assert!(no_resource.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let doc = PolicyDocument::new("Owners").with_rule(
            RuleDefinition::new(Effect::Allow, vec!["cognito:ReadUser"], "urn:acme:cognito:*:*:user")
                .with_condition(ConditionGroup::equal(
                    "subject::id",
                    vec![AttributeValue::from("resource::id")],
                )),
        );

        let json = PolicyDocument::to_json(&[doc]).unwrap();
        let parsed = PolicyDocument::parse_many(&json, "roundtrip").unwrap();

        assert_eq!(parsed[0].rules[0].conditions[0].operator, "equal");
        assert_eq!(parsed[0].rules[0].action, vec!["cognito:ReadUser"]);
    }
}
