//! # urnguard - Attribute-Based Authorization over URN-Addressed Resources
//!
//! `urnguard` answers one question: may this subject perform this action on
//! this resource? Policies are JSON documents whose rules bind URN patterns
//! and actions to an allow or deny effect, optionally gated by attribute
//! conditions:
//!
//! - **URN patterns** with wildcard region, account and instance segments
//! - **Explicit deny precedence**, default deny when nothing matches
//! - **Attribute conditions** over subject, resource and request context
//! - **Per-decision memoization** of attribute lookups
//! - **Atomic reload** of the policy index
//!
//! ## Quick Start
//!
//! ```rust
//! use urnguard::{DecisionEngine, Entity, Result, Urn};
//! use serde_json::json;
//!
//! # fn main() -> Result<()> {
//! let engine = DecisionEngine::from_json(r#"[
//!   { "name": "CognitoPowerUser", "version": "1", "rules": [
//!     { "resource": "urn:acme:cognito:*:*:user",
//!       "action": ["cognito:ReadUser"],
//!       "effect": "allow",
//!       "conditions": [ { "equal": { "user::id": ["resource::id"] } } ] } ] }
//! ]"#)?;
//!
//! let account = Entity::new(
//!     Urn::parse("urn:acme:cognito:ap-southeast-1:123456789:user/1")?,
//!     json!({ "id": 1 }),
//! );
//!
//! assert!(engine.can(&json!({ "id": 1 }), "cognito:ReadUser", &account));
//! assert!(!engine.can(&json!({ "id": 2 }), "cognito:ReadUser", &account));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configured Engines
//!
//! ```rust,no_run
//! use urnguard::{Configuration, DecisionEngine, Result};
//!
//! # fn main() -> Result<()> {
//! // policies = ["policies/"], resolver = "urn", memoize = true, ...
//! let config = Configuration::from_file("urnguard.toml")?;
//! let engine = DecisionEngine::from_config(&config)?;
//!
//! // Pick up edited policy files without dropping in-flight decisions
//! engine.reload_from(config.policy_source()?.as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use crate::config::{AdapterKind, Configuration};
pub use crate::core::credential::{CredentialDecoder, JwtDecoder};
pub use crate::core::iam::{
    AttributeResolver, AttributeValue, ConditionEvaluator, ConditionGroup, Decision,
    DecisionCache, DecisionContext, DecisionEngine, Effect, Entity, ExactResolver,
    NoAttributes, PolicyDocument, PolicyIndex, Resource, ResolverKind, RuleDefinition,
    RuleResolver, UrnResolver,
};
pub use crate::core::storage::{FileSource, InlineSource, PolicySource};
pub use crate::core::urn::Urn;
pub use crate::error::{GuardError, Result};
