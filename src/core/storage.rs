//! Policy sources
//!
//! A source yields already-parsed policy documents. It is chosen once when
//! the engine is configured and consulted only when an index is built, never
//! on the decision path.

use crate::core::iam::PolicyDocument;
use crate::error::{GuardError, Result};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub trait PolicySource: Send + Sync {
    /// Load every document this source knows about
    fn load(&self) -> Result<Vec<PolicyDocument>>;

    /// Human readable origin, used in logs
    fn describe(&self) -> String;
}

/// JSON policy files on disk
///
/// Each path is either a file holding an array of documents (or a single
/// document), or a directory whose `*.json` files are read in name order.
#[derive(Debug, Clone)]
pub struct FileSource {
    paths: Vec<PathBuf>,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        FileSource {
            paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn expand(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_dir() {
                let entries = fs::read_dir(path)
                    .map_err(|e| GuardError::policy_load(path.display().to_string(), e))?
                    .map(|entry| entry.map(|e| e.path()));
                files.extend(json_files(path, entries)?);
            } else {
                files.push(path.clone());
            }
        }

        Ok(files)
    }

    fn load_file(path: &Path) -> Result<Vec<PolicyDocument>> {
        let name = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|e| GuardError::policy_load(name.as_str(), e))?;
        let documents = PolicyDocument::parse_many(&contents, &name)?;
        debug!("Loaded {} policy documents from {}", documents.len(), name);
        Ok(documents)
    }
}

/// Sorted `*.json` files among a directory's entries
///
/// An unreadable entry fails the whole directory, never a partial load.
fn json_files(
    dir: &Path,
    entries: impl IntoIterator<Item = io::Result<PathBuf>>,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in entries {
        let path = entry.map_err(|e| GuardError::policy_load(dir.display().to_string(), e))?;
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

impl PolicySource for FileSource {
    fn load(&self) -> Result<Vec<PolicyDocument>> {
        let files = self.expand()?;
        let mut documents = Vec::new();

        for file in &files {
            documents.extend(Self::load_file(file)?);
        }

        info!(
            files = files.len(),
            documents = documents.len(),
            "Loaded policy files"
        );

        Ok(documents)
    }

    fn describe(&self) -> String {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("file:{}", paths.join(","))
    }
}

/// Documents supplied in memory
#[derive(Debug, Clone, Default)]
pub struct InlineSource {
    documents: Vec<PolicyDocument>,
}

impl InlineSource {
    pub fn new(documents: Vec<PolicyDocument>) -> Self {
        InlineSource { documents }
    }

    /// Decode structured JSON (array of documents or a single document)
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(Self::new(PolicyDocument::from_value(value, "inline")?))
    }
}

impl PolicySource for InlineSource {
    fn load(&self) -> Result<Vec<PolicyDocument>> {
        Ok(self.documents.clone())
    }

    fn describe(&self) -> String {
        format!("inline:{} documents", self.documents.len())
    }
}
