//! Schema registry: the column table and its resolution against a dataset header.

use super::derived::DerivedFeature;
use super::spec::{CleaningPolicy, ColumnSpec};
use crate::error::{PipelineError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Current schema document version
pub const SCHEMA_VERSION: &str = "1";

/// The declared column table plus derived features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    /// Document version for future migrations
    #[serde(default = "default_version")]
    pub version: String,

    /// Column declarations, in output order
    pub columns: Vec<ColumnSpec>,

    /// Dataset columns that may appear without a declaration
    #[serde(default)]
    pub ignorable: Vec<String>,

    /// Features appended after all per-column outputs
    #[serde(default)]
    pub derived: Vec<DerivedFeature>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_owned()
}

impl SchemaRegistry {
    /// Build and validate a registry.
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        Self::with_derived(columns, Vec::new())
    }

    pub fn with_derived(columns: Vec<ColumnSpec>, derived: Vec<DerivedFeature>) -> Result<Self> {
        let registry = Self {
            version: default_version(),
            columns,
            ignorable: Vec::new(),
            derived,
        };
        registry.validate()?;
        Ok(registry)
    }

    pub fn with_ignorable<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignorable = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Load a registry from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read schema file {}", path.as_ref().display())
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a registry from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let registry: Self = serde_json::from_str(json).context("Failed to parse schema JSON")?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).context("Failed to write schema file")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize schema")
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that contribute to the feature matrix, in declaration order.
    pub fn feature_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.emits_features())
    }

    /// SHA-256 over the canonical JSON form, used to pair Stats with their schema.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }

    /// Checks every column declaration and every derived-feature reference.
    pub fn validate(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(PipelineError::config(format!(
                "unsupported schema version '{}', expected '{SCHEMA_VERSION}'",
                self.version
            )));
        }

        let mut seen = HashSet::new();
        for spec in &self.columns {
            spec.validate().map_err(PipelineError::Config)?;
            if !seen.insert(spec.name.as_str()) {
                return Err(PipelineError::config(format!(
                    "column '{}' declared more than once",
                    spec.name
                )));
            }
        }

        let mut derived_names = HashSet::new();
        for feature in &self.derived {
            if !derived_names.insert(feature.name()) || seen.contains(feature.name()) {
                return Err(PipelineError::config(format!(
                    "derived feature '{}' clashes with another column",
                    feature.name()
                )));
            }
            for input in feature.inputs() {
                let source = self.get(input).ok_or_else(|| {
                    PipelineError::config(format!(
                        "derived feature '{}' references undeclared column '{input}'",
                        feature.name()
                    ))
                })?;
                if !(source.kind.is_numeric() && source.emits_features()) {
                    return Err(PipelineError::config(format!(
                        "derived feature '{}' needs a cleaned numeric column, '{input}' is {} / {}",
                        feature.name(),
                        source.kind.as_str(),
                        source.policy.as_str()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Resolve the table against a dataset header.
    ///
    /// Every declared column must be present, and every dataset column must be
    /// declared or listed as ignorable. Returns the declarations in table order.
    pub fn resolve(&self, raw_column_names: &[String]) -> Result<Vec<ColumnSpec>> {
        let present: BTreeSet<&str> = raw_column_names.iter().map(String::as_str).collect();

        let absent: Vec<&str> = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !present.contains(name))
            .collect();
        if !absent.is_empty() {
            return Err(PipelineError::config(format!(
                "declared columns missing from dataset: {absent:?}"
            )));
        }

        let ignorable: HashSet<&str> = self.ignorable.iter().map(String::as_str).collect();
        let undeclared: Vec<&str> = present
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none() && !ignorable.contains(name))
            .collect();
        if !undeclared.is_empty() {
            return Err(PipelineError::config(format!(
                "dataset columns without a declaration: {undeclared:?}"
            )));
        }

        Ok(self.columns.clone())
    }

    /// Columns carried alongside the matrix rather than encoded into it.
    pub fn kept_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns
            .iter()
            .filter(|c| c.policy == CleaningPolicy::Keep)
    }
}
