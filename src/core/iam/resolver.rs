//! Candidate rule lookup
//!
//! Resolvers answer "which rules are structurally in scope for this resource
//! and action", ignoring conditions entirely.

use super::index::PolicyIndex;
use super::policy::RuleDefinition;
use crate::core::urn::Urn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which resolver strategy the engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Match the resource against every registered URN pattern
    #[default]
    Urn,
    /// Only rules whose pattern text equals the resource text
    Exact,
}

impl ResolverKind {
    pub fn resolver(self) -> Box<dyn RuleResolver> {
        match self {
            ResolverKind::Urn => Box::new(UrnResolver),
            ResolverKind::Exact => Box::new(ExactResolver),
        }
    }
}

pub trait RuleResolver: Send + Sync {
    /// Every rule registered for `action` under a pattern covering `resource`
    ///
    /// Each rule appears once. Order across distinct patterns is unspecified.
    fn find(&self, index: &PolicyIndex, resource: &Urn, action: &str) -> Vec<Arc<RuleDefinition>>;
}

/// Pattern-matching resolver
pub struct UrnResolver;

impl RuleResolver for UrnResolver {
    fn find(&self, index: &PolicyIndex, resource: &Urn, action: &str) -> Vec<Arc<RuleDefinition>> {
        index
            .buckets()
            .filter(|bucket| resource.matches_pattern(bucket.pattern()))
            .flat_map(|bucket| bucket.rules(action).iter().cloned())
            .collect()
    }
}

/// Exact-key resolver
///
/// Only rules whose pattern is canonically identical to the resource apply;
/// wildcards in the pattern are not expanded.
pub struct ExactResolver;

impl RuleResolver for ExactResolver {
    fn find(&self, index: &PolicyIndex, resource: &Urn, action: &str) -> Vec<Arc<RuleDefinition>> {
        index.lookup_urn(resource, action).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iam::policy::{Effect, PolicyDocument, RuleDefinition};

    fn index() -> PolicyIndex {
        let doc = PolicyDocument::new("Mixed")
            .with_rule(RuleDefinition::new(
                Effect::Allow,
                vec!["cognito:ReadUser"],
                "urn:acme:cognito:*:*:user",
            ))
            .with_rule(RuleDefinition::new(
                Effect::Deny,
                vec!["cognito:ReadUser"],
                "urn:acme:cognito:ap-southeast-1:123:user/1",
            ))
            .with_rule(RuleDefinition::new(
                Effect::Allow,
                vec!["cognito:ReadUser"],
                "urn:acme:cognito:eu-west-1:*:user",
            ))
            .with_rule(RuleDefinition::new(
                Effect::Allow,
                vec!["storage:ReadObject"],
                "urn:acme:storage:*:*:bucket",
            ));
        PolicyIndex::build(&[doc]).unwrap()
    }

    #[test]
    fn test_urn_resolver_collects_all_matching_patterns() {
        let index = index();
        let resource = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/1").unwrap();

        let rules = UrnResolver.find(&index, &resource, "cognito:ReadUser");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.iter().filter(|r| r.effect == Effect::Deny).count(), 1);
    }

    #[test]
    fn test_urn_resolver_respects_action() {
        let index = index();
        let resource = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/1").unwrap();
        assert!(UrnResolver.find(&index, &resource, "cognito:DeleteUser").is_empty());
    }

    #[test]
    fn test_urn_resolver_other_instance() {
        let index = index();
        let resource = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/2").unwrap();
        let rules = UrnResolver.find(&index, &resource, "cognito:ReadUser");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].effect, Effect::Allow);
    }

    #[test]
    fn test_exact_resolver() {
        let index = index();

        let exact = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/1").unwrap();
        let rules = ExactResolver.find(&index, &exact, "cognito:ReadUser");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].effect, Effect::Deny);

        let other = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/2").unwrap();
        assert!(ExactResolver.find(&index, &other, "cognito:ReadUser").is_empty());
    }

    #[test]
    fn test_exact_resolver_short_pattern() {
        let doc = PolicyDocument::new("Short").with_rule(RuleDefinition::new(
            Effect::Allow,
            vec!["storage:ListBuckets"],
            "urn:acme:storage",
        ));
        let index = PolicyIndex::build(&[doc]).unwrap();

        let resource = Urn::parse("urn:acme:storage").unwrap();
        assert_eq!(ExactResolver.find(&index, &resource, "storage:ListBuckets").len(), 1);

        let spelled_out = Urn::parse("urn:acme:storage:*:*").unwrap();
        assert_eq!(ExactResolver.find(&index, &spelled_out, "storage:ListBuckets").len(), 1);
    }

    #[test]
    fn test_kind_selects_resolver() {
        let index = index();
        let resource = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/1").unwrap();

        assert_eq!(ResolverKind::Urn.resolver().find(&index, &resource, "cognito:ReadUser").len(), 2);
        assert_eq!(ResolverKind::Exact.resolver().find(&index, &resource, "cognito:ReadUser").len(), 1);
        assert_eq!(ResolverKind::default(), ResolverKind::Urn);
    }
}
