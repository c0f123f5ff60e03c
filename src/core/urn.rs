//! Uniform resource names for subjects and resources
//!
//! Text form: `scheme:partition:service:region:account_id:resource_type/resource_id`
//!
//! The same type serves as a concrete identifier and as a policy pattern.
//! On the pattern side an empty field or `*` in region/account_id matches
//! anything, and a missing resource id matches every id of the resource type.

use crate::core::credential::CredentialDecoder;
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Field delimiter
pub const DELIMITER: char = ':';

/// Separator between resource type and resource id
pub const RESOURCE_SEPARATOR: char = '/';

/// Wildcard marker used when region or account id are absent
pub const WILDCARD: &str = "*";

/// A parsed URN
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn {
    scheme: String,
    partition: String,
    service: String,
    region: String,
    account_id: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
}

impl Urn {
    /// Parse a colon-delimited URN
    ///
    /// # Errors
    ///
    /// Returns `MalformedUrn` when scheme, partition or service is missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use urnguard::Urn;
    ///
    /// let urn = Urn::parse("urn:acme:cognito::123456789:user/1").unwrap();
    /// assert_eq!(urn.service(), "cognito");
    /// assert_eq!(urn.resource_type(), Some("user"));
    /// assert_eq!(urn.resource_id(), Some("1"));
    /// assert_eq!(urn.to_string(), "urn:acme:cognito::123456789:user/1");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields = text.splitn(6, DELIMITER);

        let mut required = |name: &str| -> Result<String> {
            match fields.next() {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(GuardError::MalformedUrn(format!(
                    "'{}' is missing its {}",
                    text, name
                ))),
            }
        };

        let scheme = required("scheme")?;
        let partition = required("partition")?;
        let service = required("service")?;

        let region = fields.next().unwrap_or(WILDCARD).to_string();
        let account_id = fields.next().unwrap_or(WILDCARD).to_string();

        let (resource_type, resource_id) = match fields.next() {
            None => (None, None),
            Some(resource) => match resource.split_once(RESOURCE_SEPARATOR) {
                Some((kind, id)) => (Some(kind.to_string()), Some(id.to_string())),
                None => (Some(resource.to_string()), None),
            },
        };

        Ok(Urn {
            scheme,
            partition,
            service,
            region,
            account_id,
            resource_type,
            resource_id,
        })
    }

    /// Create a URN with wildcard region and account and no resource
    pub fn new(
        scheme: impl Into<String>,
        partition: impl Into<String>,
        service: impl Into<String>,
    ) -> Result<Self> {
        let urn = Urn {
            scheme: scheme.into(),
            partition: partition.into(),
            service: service.into(),
            region: WILDCARD.to_string(),
            account_id: WILDCARD.to_string(),
            resource_type: None,
            resource_id: None,
        };

        if urn.scheme.is_empty() || urn.partition.is_empty() || urn.service.is_empty() {
            return Err(GuardError::MalformedUrn(
                "scheme, partition and service must not be empty".to_string(),
            ));
        }

        Ok(urn)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    /// Set the resource type and optional instance id
    pub fn with_resource(mut self, resource_type: impl Into<String>, resource_id: Option<&str>) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = resource_id.map(str::to_string);
        self
    }

    /// Decode a bearer credential's subject claim into a URN
    ///
    /// Any failure (bad signature, expired token, missing claim, malformed
    /// subject) yields `None`: the caller has no identity, which is never
    /// the same as being allowed.
    pub fn from_credential(token: &str, decoder: &dyn CredentialDecoder) -> Option<Self> {
        let subject = decoder.subject(token)?;
        match Urn::parse(&subject) {
            Ok(urn) => Some(urn),
            Err(e) => {
                debug!("Credential subject is not a URN: {}", e);
                None
            }
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    /// Instance id; `None` for a type-level reference
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Text form; the inverse of `parse` for URNs with at least five fields
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// True when any field would act as a wildcard on the pattern side
    pub fn is_pattern(&self) -> bool {
        is_wildcard(&self.region)
            || is_wildcard(&self.account_id)
            || self.resource_id.as_deref().map_or(true, is_wildcard)
    }

    /// Check whether this (concrete) URN is covered by `pattern`
    ///
    /// Scheme, partition, service and resource type must be identical.
    /// Region and account id match anything when the pattern leaves them
    /// empty or `*`. A pattern without a resource id covers every id of its
    /// resource type.
    ///
    /// # Examples
    ///
    /// ```
    /// use urnguard::Urn;
    ///
    /// let pattern = Urn::parse("urn:acme:cognito:*:*:user").unwrap();
    /// let user = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/1").unwrap();
    /// let bucket = Urn::parse("urn:acme:storage:ap-southeast-1:123:user/1").unwrap();
    ///
    /// assert!(user.matches_pattern(&pattern));
    /// assert!(!bucket.matches_pattern(&pattern));
    /// ```
    pub fn matches_pattern(&self, pattern: &Urn) -> bool {
        if self.scheme != pattern.scheme
            || self.partition != pattern.partition
            || self.service != pattern.service
            || self.resource_type != pattern.resource_type
        {
            return false;
        }

        if !field_matches(&pattern.region, &self.region) {
            return false;
        }

        if !field_matches(&pattern.account_id, &self.account_id) {
            return false;
        }

        match pattern.resource_id.as_deref() {
            None => true,
            Some(id) if is_wildcard(id) => true,
            Some(id) => self.resource_id.as_deref() == Some(id),
        }
    }
}

fn is_wildcard(value: &str) -> bool {
    value.is_empty() || value == WILDCARD
}

fn field_matches(pattern: &str, value: &str) -> bool {
    is_wildcard(pattern) || pattern == value
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.scheme, self.partition, self.service, self.region, self.account_id
        )?;

        if let Some(kind) = &self.resource_type {
            write!(f, ":{}", kind)?;
            if let Some(id) = &self.resource_id {
                write!(f, "/{}", id)?;
            }
        }

        Ok(())
    }
}

impl FromStr for Urn {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        Urn::parse(s)
    }
}

impl TryFrom<String> for Urn {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self> {
        Urn::parse(&value)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_fields() {
        let urn = Urn::parse("urn:acme:storage:ap-southeast-1:123456789:bucket/object").unwrap();

        assert_eq!(urn.scheme(), "urn");
        assert_eq!(urn.partition(), "acme");
        assert_eq!(urn.service(), "storage");
        assert_eq!(urn.region(), "ap-southeast-1");
        assert_eq!(urn.account_id(), "123456789");
        assert_eq!(urn.resource_type(), Some("bucket"));
        assert_eq!(urn.resource_id(), Some("object"));
    }

    #[test]
    fn test_parse_defaults_region_and_account() {
        let urn = Urn::parse("urn:acme:storage").unwrap();
        assert_eq!(urn.region(), WILDCARD);
        assert_eq!(urn.account_id(), WILDCARD);
        assert_eq!(urn.resource_type(), None);
        assert_eq!(urn.resource_id(), None);
    }

    #[test]
    fn test_parse_type_level_reference() {
        let urn = Urn::parse("urn:acme:cognito:*:*:user").unwrap();
        assert_eq!(urn.resource_type(), Some("user"));
        assert_eq!(urn.resource_id(), None);
        assert!(urn.is_pattern());
    }

    #[test]
    fn test_resource_keeps_extra_delimiters() {
        let urn = Urn::parse("urn:acme:storage:r:a:bucket/path:with:colons").unwrap();
        assert_eq!(urn.resource_id(), Some("path:with:colons"));
        assert_eq!(urn.to_string(), "urn:acme:storage:r:a:bucket/path:with:colons");
    }

    #[test]
    fn test_parse_missing_required_fields() {
        assert!(matches!(Urn::parse(""), Err(GuardError::MalformedUrn(_))));
        assert!(matches!(Urn::parse("urn"), Err(GuardError::MalformedUrn(_))));
        assert!(matches!(Urn::parse("urn:acme"), Err(GuardError::MalformedUrn(_))));
        assert!(matches!(Urn::parse("urn::cognito"), Err(GuardError::MalformedUrn(_))));
    }

    #[test]
    fn test_format_round_trip() {
        for text in [
            "urn:acme:cognito::123456789:user/1",
            "urn:acme:cognito:*:*:user",
            "urn:acme:storage:*:*",
            "urn:acme:storage:ap-southeast-1:123456789:bucket/object",
            "urn:acme:storage:::",
            "urn:acme:storage:r:a:bucket/",
        ] {
            assert_eq!(Urn::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_matches_wildcard_region_and_account() {
        let pattern = Urn::parse("urn:acme:cognito:*:*:user").unwrap();
        let resource = Urn::parse("urn:acme:cognito:ap-southeast-1:123:user/1").unwrap();
        assert!(resource.matches_pattern(&pattern));

        let empty = Urn::parse("urn:acme:cognito:::user").unwrap();
        assert!(resource.matches_pattern(&empty));
    }

    #[test]
    fn test_mismatched_service_or_partition() {
        let pattern = Urn::parse("urn:acme:cognito:*:*:user").unwrap();

        let other_service = Urn::parse("urn:acme:storage:ap-southeast-1:123:user/1").unwrap();
        assert!(!other_service.matches_pattern(&pattern));

        let other_partition = Urn::parse("urn:prod:cognito:ap-southeast-1:123:user/1").unwrap();
        assert!(!other_partition.matches_pattern(&pattern));

        let other_scheme = Urn::parse("arn:acme:cognito:ap-southeast-1:123:user/1").unwrap();
        assert!(!other_scheme.matches_pattern(&pattern));
    }

    #[test]
    fn test_resource_type_must_match() {
        let pattern = Urn::parse("urn:acme:cognito:*:*:user").unwrap();
        let group = Urn::parse("urn:acme:cognito:r:1:group/1").unwrap();
        assert!(!group.matches_pattern(&pattern));
    }

    #[test]
    fn test_concrete_region_and_account() {
        let pattern = Urn::parse("urn:acme:storage:ap-southeast-1:123456789:bucket/object").unwrap();

        let same = Urn::parse("urn:acme:storage:ap-southeast-1:123456789:bucket/object").unwrap();
        assert!(same.matches_pattern(&pattern));

        let other_region = Urn::parse("urn:acme:storage:eu-west-1:123456789:bucket/object").unwrap();
        assert!(!other_region.matches_pattern(&pattern));

        let other_account = Urn::parse("urn:acme:storage:ap-southeast-1:987:bucket/object").unwrap();
        assert!(!other_account.matches_pattern(&pattern));

        let other_object = Urn::parse("urn:acme:storage:ap-southeast-1:123456789:bucket/other").unwrap();
        assert!(!other_object.matches_pattern(&pattern));
    }

    #[test]
    fn test_resource_id_wildcard() {
        let pattern = Urn::parse("urn:acme:cognito:*:*:user/*").unwrap();
        let resource = Urn::parse("urn:acme:cognito:r:1:user/42").unwrap();
        assert!(resource.matches_pattern(&pattern));
    }

    #[test]
    fn test_format_matches_input() {
        for text in [
            "urn:acme:cognito::123456789:user/1",
            "urn:acme:storage:*:*",
            "urn:acme:storage:eu-west-1:42:bucket/reports/2024:q1",
        ] {
            assert_eq!(Urn::parse(text).unwrap().format(), text);
        }
    }

    #[test]
    fn test_builder() {
        let urn = Urn::new("urn", "acme", "cognito")
            .unwrap()
            .with_account("123456789")
            .with_region("")
            .with_resource("user", Some("1"));
        assert_eq!(urn.to_string(), "urn:acme:cognito::123456789:user/1");

        assert!(Urn::new("urn", "", "cognito").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let urn: Urn = serde_json::from_str("\"urn:acme:cognito::1:user/1\"").unwrap();
        assert_eq!(urn.resource_id(), Some("1"));
        assert_eq!(
            serde_json::to_string(&urn).unwrap(),
            "\"urn:acme:cognito::1:user/1\""
        );

        assert!(serde_json::from_str::<Urn>("\"urn\"").is_err());
    }

    struct FixedDecoder(Option<&'static str>);

    impl CredentialDecoder for FixedDecoder {
        fn subject(&self, _token: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_from_credential() {
        let urn = Urn::from_credential("token", &FixedDecoder(Some("urn:acme:cognito::1:user/7")));
        assert_eq!(urn.unwrap().resource_id(), Some("7"));

        assert!(Urn::from_credential("token", &FixedDecoder(None)).is_none());
        assert!(Urn::from_credential("token", &FixedDecoder(Some("not-a-urn"))).is_none());
    }
}
