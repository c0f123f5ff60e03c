//! Rule index: resource pattern -> action -> rules
//!
//! Built once from every loaded document, then read-only. Patterns are parsed
//! at build time so a malformed pattern fails the build instead of a decision.
//! Buckets are keyed by the canonical text of the parsed pattern, so
//! `urn:a:b` and `urn:a:b:*:*` share one bucket.

use super::policy::{PolicyDocument, RuleDefinition};
use crate::core::urn::Urn;
use crate::error::{GuardError, Result};
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// All rules registered under one resource pattern
#[derive(Debug)]
pub struct PatternBucket {
    pattern: Urn,
    actions: AHashMap<String, Vec<Arc<RuleDefinition>>>,
}

impl PatternBucket {
    pub fn pattern(&self) -> &Urn {
        &self.pattern
    }

    /// Rules for `action` in registration order
    pub fn rules(&self, action: &str) -> &[Arc<RuleDefinition>] {
        self.actions.get(action).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

/// Immutable lookup structure over a set of policy documents
#[derive(Debug, Default)]
pub struct PolicyIndex {
    buckets: AHashMap<String, PatternBucket>,
    document_count: usize,
    rule_count: usize,
}

impl PolicyIndex {
    /// An index with no rules; every decision against it is a default deny
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flatten every rule of every document into the index
    ///
    /// A rule naming several actions is registered once per distinct action.
    /// Nothing is returned unless every document validates and every pattern
    /// parses.
    ///
    /// # Errors
    ///
    /// `PolicyLoad` for a document or rule missing required fields,
    /// `MalformedUrn` for an unparseable resource pattern.
    pub fn build(documents: &[PolicyDocument]) -> Result<Self> {
        let mut index = PolicyIndex::default();

        for document in documents {
            document
                .validate()
                .map_err(|e| GuardError::policy_load(document.name.as_str(), e))?;

            for rule in &document.rules {
                index.insert(&document.name, rule)?;
            }
            index.document_count += 1;
        }

        info!(
            documents = index.document_count,
            patterns = index.buckets.len(),
            rules = index.rule_count,
            "Built policy index"
        );

        Ok(index)
    }

    /// Parse policy JSON (array of documents or a single document) and build
    pub fn from_json(json: &str) -> Result<Self> {
        let documents = PolicyDocument::parse_many(json, "inline")?;
        Self::build(&documents)
    }

    fn insert(&mut self, document: &str, rule: &RuleDefinition) -> Result<()> {
        let pattern = Urn::parse(&rule.resource).map_err(|e| {
            GuardError::MalformedUrn(format!("{} (policy '{}')", e, document))
        })?;

        let mut seen = AHashSet::new();
        for action in &rule.action {
            if action.is_empty() {
                return Err(GuardError::policy_load(
                    document,
                    format!("rule on '{}' has an empty action", rule.resource),
                ));
            }
            seen.insert(action.as_str());
        }

        let shared = Arc::new(rule.clone());
        let bucket = self
            .buckets
            .entry(pattern.to_string())
            .or_insert_with(|| PatternBucket {
                pattern,
                actions: AHashMap::new(),
            });

        // Keep declaration order while skipping repeated actions
        for action in &rule.action {
            if seen.remove(action.as_str()) {
                bucket
                    .actions
                    .entry(action.clone())
                    .or_default()
                    .push(Arc::clone(&shared));
            }
        }

        self.rule_count += 1;
        Ok(())
    }

    /// Direct bucket read; empty when the pattern or action is unknown
    ///
    /// `pattern` is canonicalized first, so any spelling that parses to the
    /// registered pattern finds its bucket.
    pub fn lookup(&self, pattern: &str, action: &str) -> &[Arc<RuleDefinition>] {
        match Urn::parse(pattern) {
            Ok(urn) => self.lookup_urn(&urn, action),
            Err(_) => &[],
        }
    }

    /// Bucket read keyed by an already parsed pattern
    pub fn lookup_urn(&self, pattern: &Urn, action: &str) -> &[Arc<RuleDefinition>] {
        self.buckets
            .get(pattern.to_string().as_str())
            .map(|bucket| bucket.rules(action))
            .unwrap_or(&[])
    }

    /// Every registered pattern with its parsed form (unordered)
    pub fn patterns(&self) -> impl Iterator<Item = (&str, &Urn)> {
        self.buckets
            .iter()
            .map(|(text, bucket)| (text.as_str(), &bucket.pattern))
    }

    pub fn buckets(&self) -> impl Iterator<Item = &PatternBucket> {
        self.buckets.values()
    }

    /// Number of distinct resource patterns
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of rules indexed (a multi-action rule counts once)
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }
}
