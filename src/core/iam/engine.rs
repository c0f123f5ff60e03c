//! Decision engine with deny precedence
//!
//! Evaluates policies to determine if a subject may perform an action on a
//! resource:
//! - Explicit deny takes precedence over allow, independent of rule order
//! - No satisfied rule means deny
//! - Conditions are resolved through a fresh per-decision cache
//! - The index is swapped atomically on reload, never patched in place

use super::attribute::{AttributeResolver, NoAttributes, Resource};
use super::cache::DecisionCache;
use super::condition::{ConditionEvaluator, DecisionContext};
use super::index::PolicyIndex;
use super::policy::{Effect, PolicyDocument, RuleDefinition};
use super::resolver::{ResolverKind, RuleResolver};
use crate::config::Configuration;
use crate::core::storage::PolicySource;
use crate::error::{GuardError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a single decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Rules in scope for the resource and action
    pub candidates: usize,
    /// Candidates whose conditions held
    pub satisfied: usize,
    /// Effect that settled the decision, `None` for a default deny
    pub effect: Option<Effect>,
}

/// Policy decision engine
pub struct DecisionEngine {
    index: RwLock<Arc<PolicyIndex>>,
    resolver: Box<dyn RuleResolver>,
    resolver_kind: ResolverKind,
    evaluator: ConditionEvaluator,
    memoize: bool,
    namespace: String,
}

impl DecisionEngine {
    /// Create an engine over `index` with default settings
    /// (URN resolver, memoization on)
    pub fn new(index: PolicyIndex) -> Self {
        Self::with_config(index, &Configuration::default())
    }

    /// Create an engine over `index` using the settings in `config`
    pub fn with_config(index: PolicyIndex, config: &Configuration) -> Self {
        DecisionEngine {
            index: RwLock::new(Arc::new(index)),
            resolver: config.resolver.resolver(),
            resolver_kind: config.resolver,
            evaluator: ConditionEvaluator::new(),
            memoize: config.memoize,
            namespace: config.namespace.clone(),
        }
    }

    /// Load documents from the configured source and build the engine
    ///
    /// Settings are validated first; an invalid field is a `Config` error.
    ///
    /// # Examples
    ///
    /// ```
    /// use urnguard::{Configuration, DecisionEngine, Urn};
    /// use serde_json::json;
    ///
    /// let config = Configuration::from_toml_str(r#"
    ///     adapter = "inline"
    ///
    ///     [[documents]]
    ///     name = "Storage"
    ///
    ///     [[documents.rules]]
    ///     resource = "urn:acme:storage:*:*:bucket"
    ///     action = ["storage:ReadObject"]
    ///     effect = "allow"
    /// "#).unwrap();
    ///
    /// let engine = DecisionEngine::from_config(&config).unwrap();
    /// let bucket = Urn::parse("urn:acme:storage:ap-southeast-1:123:bucket/reports").unwrap();
    ///
    /// assert!(engine.can(&json!({ "id": 1 }), "storage:ReadObject", &bucket));
    /// assert!(!engine.can(&json!({ "id": 1 }), "storage:DeleteObject", &bucket));
    /// ```
    pub fn from_config(config: &Configuration) -> Result<Self> {
        config.validate_settings()?;
        let source = config.policy_source()?;
        let documents = source.load()?;
        let index = PolicyIndex::build(&documents)?;

        info!(
            namespace = %config.namespace,
            source = %source.describe(),
            resolver = ?config.resolver,
            memoize = config.memoize,
            "Policy engine ready"
        );

        Ok(Self::with_config(index, config))
    }

    /// Build an engine directly from documents with default settings
    pub fn from_documents(documents: &[PolicyDocument]) -> Result<Self> {
        Ok(Self::new(PolicyIndex::build(documents)?))
    }

    /// Build an engine from policy JSON with default settings
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(PolicyIndex::from_json(json)?))
    }

    /// Snapshot of the current index
    pub fn index(&self) -> Arc<PolicyIndex> {
        self.index.read().clone()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn resolver_kind(&self) -> ResolverKind {
        self.resolver_kind
    }

    pub fn is_memoizing(&self) -> bool {
        self.memoize
    }

    /// Toggle per-decision memoization; never changes a verdict
    pub fn set_memoize(&mut self, memoize: bool) {
        self.memoize = memoize;
    }

    /// Replace the index with one built from `documents`
    ///
    /// On failure the current index stays in place.
    pub fn reload(&self, documents: &[PolicyDocument]) -> Result<()> {
        match PolicyIndex::build(documents) {
            Ok(index) => {
                self.swap(index);
                Ok(())
            }
            Err(e) => {
                warn!(namespace = %self.namespace, "Policy reload rejected, keeping current index: {}", e);
                Err(e)
            }
        }
    }

    /// Reload from a policy source; on failure the current index stays in place
    pub fn reload_from(&self, source: &dyn PolicySource) -> Result<()> {
        let documents = source.load().map_err(|e| {
            warn!(namespace = %self.namespace, source = %source.describe(), "Policy reload failed: {}", e);
            e
        })?;
        self.reload(&documents)
    }

    fn swap(&self, index: PolicyIndex) {
        let rules = index.rule_count();
        *self.index.write() = Arc::new(index);
        info!(namespace = %self.namespace, rules, "Policy index reloaded");
    }

    /// Rules structurally in scope for `resource` and `action`, regardless of
    /// whether their conditions currently hold
    pub fn find_applicable(
        &self,
        _subject: &dyn AttributeResolver,
        action: &str,
        resource: &dyn Resource,
    ) -> Vec<Arc<RuleDefinition>> {
        let index = self.index();
        self.resolver.find(&index, resource.urn(), action)
    }

    /// Decide without request context
    pub fn decide(
        &self,
        subject: &dyn AttributeResolver,
        action: &str,
        resource: &dyn Resource,
    ) -> Result<Decision> {
        self.decide_with(subject, action, resource, &NoAttributes)
    }

    /// Decide with request attributes available under the `context` namespace
    ///
    /// Every candidate is evaluated so a malformed condition surfaces no
    /// matter where it sits among the candidates.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperator` when any candidate rule uses an unknown operator.
    pub fn decide_with(
        &self,
        subject: &dyn AttributeResolver,
        action: &str,
        resource: &dyn Resource,
        context: &dyn AttributeResolver,
    ) -> Result<Decision> {
        let candidates = self.find_applicable(subject, action, resource);
        let mut ctx = DecisionContext::new(subject, resource, context, DecisionCache::new(self.memoize));

        let mut satisfied = 0;
        let mut granted = false;
        let mut denied = false;

        for rule in &candidates {
            if !self.evaluator.evaluate_rule(rule, &mut ctx)? {
                continue;
            }

            satisfied += 1;
            match rule.effect {
                Effect::Deny => denied = true,
                Effect::Allow => granted = true,
            }
        }

        let effect = if denied {
            Some(Effect::Deny)
        } else if granted {
            Some(Effect::Allow)
        } else {
            None
        };

        let decision = Decision {
            allowed: effect == Some(Effect::Allow),
            candidates: candidates.len(),
            satisfied,
            effect,
        };

        debug!(
            namespace = %self.namespace,
            action,
            resource = %resource.urn(),
            candidates = decision.candidates,
            satisfied = decision.satisfied,
            allowed = decision.allowed,
            cache_hits = ctx.cache().hits(),
            "Authorization decision"
        );

        Ok(decision)
    }

    /// Succeed when allowed, otherwise fail with `Authorization`
    ///
    /// Evaluation errors are returned as-is, never turned into a deny.
    pub fn authorize(
        &self,
        subject: &dyn AttributeResolver,
        action: &str,
        resource: &dyn Resource,
    ) -> Result<()> {
        let decision = self.decide(subject, action, resource)?;
        if decision.allowed {
            return Ok(());
        }

        Err(GuardError::Authorization {
            subject: subject.describe(),
            action: action.to_string(),
            resource: resource.urn().to_string(),
        })
    }

    /// Boolean form of `decide`; never fails
    ///
    /// An evaluation error is logged and counts as a deny.
    pub fn can(&self, subject: &dyn AttributeResolver, action: &str, resource: &dyn Resource) -> bool {
        match self.decide(subject, action, resource) {
            Ok(decision) => decision.allowed,
            Err(e) => {
                warn!(
                    namespace = %self.namespace,
                    action,
                    resource = %resource.urn(),
                    "Decision failed, denying: {}",
                    e
                );
                false
            }
        }
    }
}
