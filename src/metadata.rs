//! Per-template metadata handling.
//! Reads the optional `.itmpl.toml` file that describes a template, declares
//! extra default variables, requirements and files excluded from templating.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use serde::Deserialize;

use crate::constants::METADATA_FILE;
use crate::error::{Error, Result};
use crate::variables::Variables;

/// The `[metadata]` section of the metadata file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    /// Human readable description shown by `list`
    pub template_description: Option<String>,
    /// Tools the generated project expects to be installed
    pub template_requirements: Vec<String>,
    /// Glob patterns of files whose content and name are left as-is
    pub templating_excludes: Vec<String>,
}

/// The whole contents of the metadata file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TemplateMetadata {
    pub metadata: MetadataSection,
    pub variables: Variables,
}

impl TemplateMetadata {
    /// Compiles `templating_excludes` into a single matcher.
    ///
    /// # Errors
    /// * `Error::MetadataError` if any pattern is not a valid glob
    pub fn exclude_set(&self) -> Result<GlobSet> {
        let invalid = |e: globset::Error| Error::MetadataError {
            path: METADATA_FILE.into(),
            message: e.to_string(),
        };

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.metadata.templating_excludes {
            builder.add(Glob::new(pattern).map_err(invalid)?);
        }
        builder.build().map_err(invalid)
    }
}

/// Reads a metadata file.
///
/// # Arguments
/// * `path` - Path to the metadata file
///
/// # Returns
/// * `Result<TemplateMetadata>` - Parsed metadata, or the defaults if the file does not exist
///
/// # Errors
/// * `Error::MetadataError` if the document is not valid TOML or a value has the wrong type
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<TemplateMetadata> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No metadata file at '{}'", path.display());
        return Ok(TemplateMetadata::default());
    }

    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::MetadataError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

/// Reads the metadata file of the template stored in `template_dir`.
pub fn read_template_metadata<P: AsRef<Path>>(template_dir: P) -> Result<TemplateMetadata> {
    read_metadata(template_dir.as_ref().join(METADATA_FILE))
}
