//! Condition evaluation
//!
//! References take the form `<namespace>::<path>::<...>`. The namespace picks
//! a root participant of the decision and the rest is walked segment by
//! segment through that root's [`AttributeResolver`]. Anything else,
//! including text whose namespace is not a known root, is a literal.
//!
//! Roots:
//! - `subject` (alias `user`) - who is acting
//! - `resource` - what is acted upon
//! - `context` - request attributes supplied with the decision

use super::attribute::{AttributeResolver, AttributeValue, Resource};
use super::cache::DecisionCache;
use super::policy::{ConditionGroup, RuleDefinition};
use crate::error::{GuardError, Result};
use std::str::FromStr;

/// Separates the namespace and path segments of a reference
pub const NAMESPACE_DELIMITER: &str = "::";

/// Registered reference roots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Subject,
    Resource,
    Context,
}

impl Root {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "subject" | "user" => Some(Root::Subject),
            "resource" => Some(Root::Resource),
            "context" => Some(Root::Context),
            _ => None,
        }
    }
}

/// Supported comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Left value equals at least one right value
    Equal,
    /// Left value equals none of the right values
    NotEqual,
}

impl FromStr for Operator {
    type Err = GuardError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "equal" => Ok(Operator::Equal),
            "not_equal" => Ok(Operator::NotEqual),
            other => Err(GuardError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// Everything one decision call needs to evaluate conditions
///
/// Created per call and dropped when the call returns.
pub struct DecisionContext<'a> {
    subject: &'a dyn AttributeResolver,
    resource: &'a dyn Resource,
    context: &'a dyn AttributeResolver,
    cache: DecisionCache,
}

impl<'a> DecisionContext<'a> {
    pub fn new(
        subject: &'a dyn AttributeResolver,
        resource: &'a dyn Resource,
        context: &'a dyn AttributeResolver,
        cache: DecisionCache,
    ) -> Self {
        DecisionContext {
            subject,
            resource,
            context,
            cache,
        }
    }

    pub fn subject(&self) -> &'a dyn AttributeResolver {
        self.subject
    }

    pub fn resource(&self) -> &'a dyn Resource {
        self.resource
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }
}

/// Stateless evaluator for rule conditions
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        ConditionEvaluator
    }

    /// Resolve a value reference to a scalar
    ///
    /// Non-text values and text without a known namespace are returned as-is.
    /// A missing attribute anywhere along the path resolves to `None`.
    pub fn resolve_value(
        &self,
        reference: &AttributeValue,
        ctx: &mut DecisionContext<'_>,
    ) -> Option<AttributeValue> {
        match reference {
            AttributeValue::String(text) => self.resolve_text(text, ctx),
            literal => Some(literal.clone()),
        }
    }

    fn resolve_text(&self, text: &str, ctx: &mut DecisionContext<'_>) -> Option<AttributeValue> {
        let Some((namespace, path)) = text.split_once(NAMESPACE_DELIMITER) else {
            return Some(AttributeValue::from(text));
        };

        let Some(root) = Root::from_name(namespace) else {
            return Some(AttributeValue::from(text));
        };

        let subject = ctx.subject;
        let resource = ctx.resource;
        let context = ctx.context;

        ctx.cache.fetch(text, || {
            let segments: Vec<&str> = path.split(NAMESPACE_DELIMITER).collect();
            match root {
                Root::Subject => subject.get(&segments),
                Root::Resource => resource.get(&segments),
                Root::Context => context.get(&segments),
            }
        })
    }

    /// Evaluate one condition group
    ///
    /// Every clause must hold. A clause whose left side does not resolve never
    /// holds; unresolved right-hand references are skipped.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperator` when the group names an unknown operator.
    pub fn evaluate_group(&self, group: &ConditionGroup, ctx: &mut DecisionContext<'_>) -> Result<bool> {
        let operator = Operator::from_str(&group.operator)?;
        Ok(self.evaluate_clauses(operator, group, ctx))
    }

    fn evaluate_clauses(
        &self,
        operator: Operator,
        group: &ConditionGroup,
        ctx: &mut DecisionContext<'_>,
    ) -> bool {
        group.clauses.iter().all(|(left, rights)| {
            let Some(left) = self.resolve_text(left, ctx) else {
                return false;
            };

            let any_equal = rights
                .iter()
                .filter_map(|right| self.resolve_value(right, ctx))
                .any(|right| right == left);

            match operator {
                Operator::Equal => any_equal,
                Operator::NotEqual => !any_equal,
            }
        })
    }

    /// True when the rule has no conditions or every group holds
    ///
    /// All operators are checked before anything is evaluated, so a bad
    /// operator surfaces even when an earlier group already fails.
    pub fn evaluate_rule(&self, rule: &RuleDefinition, ctx: &mut DecisionContext<'_>) -> Result<bool> {
        let operators = rule
            .conditions
            .iter()
            .map(|group| Operator::from_str(&group.operator))
            .collect::<Result<Vec<_>>>()?;

        Ok(operators
            .into_iter()
            .zip(&rule.conditions)
            .all(|(operator, group)| self.evaluate_clauses(operator, group, ctx)))
    }
}
