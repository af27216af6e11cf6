//! itmpl's main application entry point.
//! Handles command-line argument parsing and dispatches to the template
//! listing, project creation and configuration commands.

use std::path::{Path, PathBuf};

use itmpl::{
    cli::{get_args, Args, Command, ConfigCommand},
    config::{default_config_path, read_config, write_config, Config},
    constants::BUNDLED_TEMPLATES_DIR,
    error::{default_error_handler, Error, Result},
    logger::init_logger,
    prompt::{DialoguerPrompter, Prompter},
    registry::{find_template, list_templates},
    renderer::MiniJinjaRenderer,
    script::HookLoader,
    table::Table,
    templating::Generator,
    variables::global_variables,
};

/// Main application entry point.
fn main() {
    // Fix the process-wide timestamp variables before anything else runs.
    global_variables();

    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn run(args: Args) -> Result<()> {
    let prompt = DialoguerPrompter::new();
    let config_path = args.config.unwrap_or_else(default_config_path);
    let templates_dir =
        args.templates_dir.unwrap_or_else(|| PathBuf::from(BUNDLED_TEMPLATES_DIR));

    match args.command {
        Command::List => list(&config_path, &templates_dir),
        Command::New { template, name, path, force } => {
            new(&prompt, &config_path, &templates_dir, &template, &name, &path, force)
        }
        Command::Config { action } => configure(&prompt, &config_path, action),
    }
}

/// Prints the available templates.
fn list(config_path: &Path, templates_dir: &Path) -> Result<()> {
    let config = read_config(config_path)?;
    let templates = list_templates(templates_dir, &config.extra_templates_dir)?;

    let mut table = Table::new(&["Template", "Description", "Requirements"]);
    for template in templates.values() {
        table.add_row(vec![
            template.name.clone(),
            template.description().unwrap_or_default().to_string(),
            template.requirements().join(", "),
        ]);
    }

    if table.is_empty() {
        println!("No templates found.");
    } else {
        println!("{}", table.render());
    }
    Ok(())
}

/// Creates project `name` from `template` in `path`.
fn new(
    prompt: &dyn Prompter,
    config_path: &Path,
    templates_dir: &Path,
    template: &str,
    name: &str,
    path: &Path,
    force: bool,
) -> Result<()> {
    let config = read_config(config_path)?;
    let templates = list_templates(templates_dir, &config.extra_templates_dir)?;
    let selected = find_template(&templates, template)?;

    let destination = path.join(name);
    let renderer = MiniJinjaRenderer::new();
    Generator::new(&renderer, prompt, &HookLoader).render(
        name,
        &selected.name,
        &destination,
        &selected.path,
        !force,
    )?;

    println!("Created project '{name}' in {}.", destination.display());
    Ok(())
}

/// Shows or changes the configuration.
fn configure(prompt: &dyn Prompter, config_path: &Path, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Show { option: Some(option) } => {
            println!("{}", read_config(config_path)?.get(option));
        }
        ConfigCommand::Show { option: None } => {
            let config = read_config(config_path)?;
            let content = serde_json::to_string_pretty(&config)
                .map_err(|e| Error::ConfigError(e.to_string()))?;
            println!("{content}");
        }
        ConfigCommand::Get { option } => {
            let config = read_config(config_path)?;
            println!("{option} is set to {}", config.get(option));
        }
        ConfigCommand::Set { option, value } => {
            let mut config = read_config(config_path)?;
            config.set(option, &value)?;
            write_config(config_path, &config)?;
            println!("Set {option} to {}", config.get(option));
        }
        ConfigCommand::Reset { yes } => {
            let prompt_text = "Are you sure you want to reset the configuration?".to_string();
            if !prompt.confirm(yes, prompt_text)? {
                return Err(Error::Aborted);
            }
            write_config(config_path, &Config::default())?;
            println!("Reset configuration to default values.");
        }
    }
    Ok(())
}
