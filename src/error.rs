//! Error handling for itmpl.
//! Defines the error type and result alias used throughout the application.

use std::io;
use std::path::PathBuf;

use indexmap::IndexMap;
use thiserror::Error;

use crate::registry::Template;
use crate::script::EntryPoint;

/// Errors that can occur while discovering, loading or rendering templates.
///
/// `TemplatingError` is the single failure kind reported by the rendering
/// pipeline; the lower level kinds are wrapped into it with phase context.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors raised while walking a directory tree
    #[error("Failed to walk directory: {0}.")]
    WalkError(#[from] walkdir::Error),

    /// An invalid glob pattern
    #[error("Invalid glob pattern: {0}.")]
    GlobError(#[from] globset::Error),

    /// Represents errors reported by the template engine
    #[error("{0}")]
    MinijinjaError(#[from] minijinja::Error),

    /// A per-template metadata file is malformed or fails validation
    #[error("Invalid template metadata in '{}': {message}.", path.display())]
    MetadataError { path: PathBuf, message: String },

    /// The same template name exists in both template roots
    #[error(
        "Templates exist in both the bundled and the extra templates directory: {}.",
        duplicate_names(templates)
    )]
    DuplicateTemplateError { templates: IndexMap<String, Template> },

    /// A template script exists but cannot be loaded
    #[error("Failed to load script '{}': {message}.", path.display())]
    ScriptLoadError { path: PathBuf, message: String },

    /// A template script entry point failed while running
    #[error("Script failed while {entry_point}: {message}")]
    ScriptExecutionError { entry_point: EntryPoint, message: String },

    /// Represents errors that occur during template processing
    #[error("Templating error: {0}.")]
    TemplatingError(String),

    /// The requested template is not present in any root
    #[error("Template '{name}' not found. Available templates: {}.", available.join(", "))]
    TemplateNotFound { name: String, available: Vec<String> },

    /// Represents errors that occur while reading or updating the configuration
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Reading the operator's answer failed
    #[error("Prompt failed: {0}.")]
    PromptError(#[from] dialoguer::Error),

    /// The operator declined to continue
    #[error("Aborted.")]
    Aborted,
}

fn duplicate_names(templates: &IndexMap<String, Template>) -> String {
    templates
        .iter()
        .map(|(name, template)| format!("'{name}' ({})", template.path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
