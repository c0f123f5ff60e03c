//! Engine configuration
//!
//! Read once when an engine is built. Recognized keys map onto typed fields;
//! any other top-level key is kept in the extension map so embedding
//! applications can carry their own settings in the same file.
//!
//! ```toml
//! adapter = "file"
//! policies = ["policies/"]
//! namespace = "billing"
//! memoize = true
//! resolver = "urn"
//! ```

use crate::core::iam::{PolicyDocument, ResolverKind};
use crate::core::storage::{FileSource, InlineSource, PolicySource};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Default label for engines that do not set one
pub const DEFAULT_NAMESPACE: &str = "urnguard";

/// Where policy documents come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// JSON files or directories listed in `policies`
    #[default]
    File,
    /// Documents embedded in the configuration itself
    Inline,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Configuration {
    #[serde(default)]
    pub adapter: AdapterKind,

    /// Files or directories read by the `file` adapter
    #[serde(default)]
    pub policies: Vec<PathBuf>,

    /// Documents served by the `inline` adapter
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<PolicyDocument>,

    /// Label attached to every log line the engine emits
    #[validate(length(min = 1, message = "namespace must not be empty"))]
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Cache attribute lookups for the duration of one decision
    #[serde(default = "default_memoize")]
    pub memoize: bool,

    #[serde(default)]
    pub resolver: ResolverKind,

    #[serde(flatten)]
    pub extensions: HashMap<String, toml::Value>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_memoize() -> bool {
    true
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            adapter: AdapterKind::default(),
            policies: Vec::new(),
            documents: Vec::new(),
            namespace: default_namespace(),
            memoize: default_memoize(),
            resolver: ResolverKind::default(),
            extensions: HashMap::new(),
        }
    }
}

impl Configuration {
    /// Parse and validate TOML configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Configuration =
            toml::from_str(text).map_err(|e| GuardError::Config(e.to_string()))?;
        config.validate_settings()?;
        Ok(config)
    }

    /// Read a TOML configuration file
    ///
    /// Relative policy paths are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            config.policies = config
                .policies
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }

        Ok(config)
    }

    /// Field-level checks, reported as a `Config` error
    pub fn validate_settings(&self) -> Result<()> {
        self.validate()
            .map_err(|e| GuardError::Config(e.to_string()))
    }

    /// Unrecognized top-level key
    pub fn extension(&self, name: &str) -> Option<&toml::Value> {
        self.extensions.get(name)
    }

    pub fn set_extension(&mut self, name: impl Into<String>, value: impl Into<toml::Value>) {
        self.extensions.insert(name.into(), value.into());
    }

    pub fn with_policies<P: AsRef<Path>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.adapter = AdapterKind::File;
        self.policies = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        self
    }

    pub fn with_documents(mut self, documents: Vec<PolicyDocument>) -> Self {
        self.adapter = AdapterKind::Inline;
        self.documents = documents;
        self
    }

    /// The policy source selected by `adapter`
    ///
    /// # Errors
    ///
    /// `Config` when the `file` adapter has no paths to read.
    pub fn policy_source(&self) -> Result<Box<dyn PolicySource>> {
        match self.adapter {
            AdapterKind::File => {
                if self.policies.is_empty() {
                    return Err(GuardError::Config(
                        "file adapter requires at least one entry in `policies`".to_string(),
                    ));
                }
                Ok(Box::new(FileSource::new(&self.policies)))
            }
            AdapterKind::Inline => Ok(Box::new(InlineSource::new(self.documents.clone()))),
        }
    }
}
