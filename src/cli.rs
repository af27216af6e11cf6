//! Command-line interface implementation for itmpl.
//! Provides argument parsing and help text formatting using clap.

use std::path::PathBuf;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};

use crate::config::ConfigOption;

/// Command-line arguments structure for itmpl.
#[derive(Parser, Debug)]
#[command(author, version, about = "itmpl: create new projects from templates", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the bundled templates
    #[arg(long, global = true, env = "ITMPL_TEMPLATES_DIR", value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Configuration file to use instead of the default one
    #[arg(long, global = true, env = "ITMPL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available templates
    List,

    /// Create a new project from a template
    New {
        /// Name of the template to use
        #[arg(value_name = "TEMPLATE")]
        template: String,

        /// Name of the new project
        #[arg(value_name = "NAME")]
        name: String,

        /// Directory in which the project directory is created
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Do not ask for confirmation when files already exist.
        /// Existing files are kept as they are.
        #[arg(short, long)]
        force: bool,
    },

    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the whole configuration, or a single option
    Show { option: Option<ConfigOption> },

    /// Set a configuration option
    Set { option: ConfigOption, value: String },

    /// Get a configuration option
    Get { option: ConfigOption },

    /// Reset the configuration to the default values
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument
                || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
