//! Template discovery.
//! Templates are the immediate subdirectories of two roots: the templates
//! bundled with itmpl and the user's extra templates directory.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::metadata::{read_template_metadata, TemplateMetadata};

/// A template available for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Directory name, used to select the template
    pub name: String,
    /// Template directory
    pub path: PathBuf,
    /// Parsed metadata file, or the defaults
    pub metadata: TemplateMetadata,
}

impl Template {
    pub fn description(&self) -> Option<&str> {
        self.metadata.metadata.template_description.as_deref()
    }

    pub fn requirements(&self) -> &[String] {
        &self.metadata.metadata.template_requirements
    }
}

/// Lists the templates stored in `directory`, sorted by name.
///
/// A missing directory holds no templates. A template whose metadata cannot be
/// read is still listed, with default metadata, so one broken template does not
/// hide its siblings.
pub fn templates_in_dir<P: AsRef<Path>>(directory: P) -> Result<IndexMap<String, Template>> {
    let directory = directory.as_ref();
    let mut templates = IndexMap::new();

    if !directory.is_dir() {
        debug!("Templates directory '{}' does not exist", directory.display());
        return Ok(templates);
    }

    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            warn!("Skipping template with a non UTF-8 name: '{}'", path.display());
            continue;
        };

        let metadata = read_template_metadata(&path).unwrap_or_else(|e| {
            warn!("{e}");
            TemplateMetadata::default()
        });
        templates.insert(name.clone(), Template { name, path, metadata });
    }

    templates.sort_keys();
    Ok(templates)
}

/// Lists the templates of both roots.
///
/// # Errors
/// * `Error::DuplicateTemplateError` if a template name exists in both roots;
///   the error carries the conflicting templates from `primary_root`
pub fn list_templates<P, Q>(primary_root: P, secondary_root: Q) -> Result<IndexMap<String, Template>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let primary = templates_in_dir(primary_root)?;
    let secondary = templates_in_dir(secondary_root)?;

    let duplicates: IndexMap<String, Template> = primary
        .iter()
        .filter(|(name, _)| secondary.contains_key(*name))
        .map(|(name, template)| (name.clone(), template.clone()))
        .collect();
    if !duplicates.is_empty() {
        return Err(Error::DuplicateTemplateError { templates: duplicates });
    }

    let mut templates = primary;
    templates.extend(secondary);
    templates.sort_keys();
    Ok(templates)
}

/// Looks up `name` among `templates`.
///
/// # Errors
/// * `Error::TemplateNotFound` listing the available names
pub fn find_template<'a>(templates: &'a IndexMap<String, Template>, name: &str) -> Result<&'a Template> {
    templates.get(name).ok_or_else(|| Error::TemplateNotFound {
        name: name.to_string(),
        available: templates.keys().cloned().collect(),
    })
}
