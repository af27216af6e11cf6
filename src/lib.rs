//! itmpl creates new projects from template directories.
//! Templates are plain directory trees whose file contents and names may
//! contain placeholders, optionally accompanied by a metadata file and a
//! script that computes extra variables.

/// Command-line interface module
pub mod cli;

/// User configuration stored in the application directory
pub mod config;

/// Common constants
pub mod constants;

/// Error types and handling
pub mod error;

/// Logger setup for the binary
pub mod logger;

/// Per-template `.itmpl.toml` metadata
pub mod metadata;

/// In-place rendering of file contents and names in a directory tree
pub mod processor;

/// User input and interaction handling
pub mod prompt;

/// Template discovery across the bundled and extra template roots
pub mod registry;

/// Template string rendering
pub mod renderer;

/// Template scripts and their entry points:
/// - .itmpl.hooks/get_variables
/// - .itmpl.hooks/post_script
pub mod script;

/// Table output for the template listing
pub mod table;

/// Core template rendering orchestration
pub mod templating;

/// Copy, duplicate detection and deletion over directory trees
pub mod tree;

/// Template variable sets
pub mod variables;
