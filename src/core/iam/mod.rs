//! Attribute-based authorization
//!
//! Decides whether a subject may perform an action on a resource:
//! - JSON policy documents flattened into a pattern -> action -> rules index
//! - URN pattern matching with wildcard region, account and instance
//! - Condition groups comparing subject, resource and context attributes
//! - Explicit deny precedence and default deny
//! - Per-decision memoization of attribute lookups

mod attribute;
mod cache;
mod condition;
mod engine;
mod index;
mod policy;
mod resolver;

pub use attribute::{AttributeResolver, AttributeValue, Entity, NoAttributes, Resource};
pub use cache::DecisionCache;
pub use condition::{ConditionEvaluator, DecisionContext, Operator, Root, NAMESPACE_DELIMITER};
pub use engine::{Decision, DecisionEngine};
pub use index::{PatternBucket, PolicyIndex};
pub use policy::{ConditionGroup, Effect, PolicyDocument, RuleDefinition};
pub use resolver::{ExactResolver, ResolverKind, RuleResolver, UrnResolver};
