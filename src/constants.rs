//! Common constants used throughout itmpl.

/// Application name, used for the per-user application directory
pub const APP_NAME: &str = "itmpl";

/// Prefix shared by every template housekeeping file
pub const HOUSEKEEPING_PREFIX: &str = ".itmpl";

/// Per-template metadata file name
pub const METADATA_FILE: &str = ".itmpl.toml";

/// Per-template script directory holding the entry point executables
pub const SCRIPT_DIR: &str = ".itmpl.hooks";

/// Patterns removed from a generated project once rendering is finished
pub const CLEANUP_PATTERNS: [&str; 2] = [".itmpl*", "__pycache__"];

/// Configuration file name inside the application directory
pub const CONFIG_FILE: &str = "config.json";

/// Templates shipped with itmpl
pub const BUNDLED_TEMPLATES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");
