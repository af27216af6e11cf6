//! Core template rendering orchestration.
//!
//! Rendering a project goes through these steps:
//! 1. Compute the built-in variables
//! 2. Copy the template into a scratch directory
//! 3. Merge the metadata file's variables
//! 4. Merge the variables returned by the script's `get_variables`
//! 5. Render the scratch copy, leaving unresolved placeholders in place
//! 6. Ask before continuing if files in the destination would be skipped
//! 7. Copy the rendered tree into the destination without overwriting
//! 8. Run the script's `post_script` in the destination
//! 9. If it returned variables, render the destination again, strictly
//! 10. Remove housekeeping files from the destination

use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use log::{debug, info, warn};

use crate::constants::{CLEANUP_PATTERNS, METADATA_FILE};
use crate::error::{Error, Result};
use crate::metadata::read_template_metadata;
use crate::processor::template_directory;
use crate::prompt::{DialoguerPrompter, Prompter};
use crate::renderer::{MiniJinjaRenderer, TemplateRenderer, UndefinedPolicy};
use crate::script::{EntryPoint, HookLoader, ScriptLoader};
use crate::tree::{copy_tree, find_duplicates, recursive_delete};
use crate::variables::{base_variables, merge_variables, Variables};

/// Wraps `err` into a `TemplatingError` naming the phase that failed.
fn templating_error(phase: &str, err: Error) -> Error {
    match err {
        Error::TemplatingError(message) => Error::TemplatingError(format!("error {phase}: {message}")),
        other => Error::TemplatingError(format!("error {phase}: {other}")),
    }
}

/// Variables resolved for a template, along with its exclusion globs.
#[derive(Debug)]
pub struct ResolvedVariables {
    pub variables: Variables,
    pub excludes: GlobSet,
}

/// Renders templates into project directories.
pub struct Generator<'a> {
    renderer: &'a dyn TemplateRenderer,
    prompt: &'a dyn Prompter,
    scripts: &'a dyn ScriptLoader,
    /// Parent of the scratch directories; the system temp dir if unset
    scratch_root: Option<PathBuf>,
}

impl<'a> Generator<'a> {
    pub fn new(
        renderer: &'a dyn TemplateRenderer,
        prompt: &'a dyn Prompter,
        scripts: &'a dyn ScriptLoader,
    ) -> Self {
        Self { renderer, prompt, scripts, scratch_root: None }
    }

    /// Creates scratch directories below `root` instead of the system temp dir.
    pub fn with_scratch_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Resolves the variables of the template stored in `template_dir`.
    ///
    /// Layers, each overriding the previous one: the built-ins, the metadata
    /// file's `[variables]`, and the result of the script's `get_variables`,
    /// which receives the first two layers.
    ///
    /// # Errors
    /// * `Error::TemplatingError` if the metadata file or the script fails
    pub fn resolve_variables(
        &self,
        project_name: &str,
        template_dir: &Path,
        destination: &Path,
    ) -> Result<ResolvedVariables> {
        let metadata = read_template_metadata(template_dir)
            .map_err(|e| templating_error(&format!("reading {METADATA_FILE}"), e))?;
        let excludes = metadata
            .exclude_set()
            .map_err(|e| templating_error(&format!("reading {METADATA_FILE}"), e))?;

        let variables = merge_variables(base_variables(project_name), &metadata.variables);

        let script = self
            .scripts
            .load(template_dir)
            .map_err(|e| templating_error("loading script", e))?;
        let variables = match script {
            Some(script) if script.has_entry_point(EntryPoint::GetVariables) => {
                let script_variables = script
                    .get_variables(project_name, destination, &variables)
                    .map_err(|e| templating_error(&EntryPoint::GetVariables.to_string(), e))?;
                merge_variables(variables, &script_variables)
            }
            _ => variables,
        };

        Ok(ResolvedVariables { variables, excludes })
    }

    /// Renders `template_path` as project `project_name` into `destination`.
    ///
    /// Existing files in `destination` are never overwritten. When some would
    /// be skipped and `prompt_if_duplicates` is set, the operator is asked to
    /// confirm first; declining returns `Error::Aborted` with `destination`
    /// untouched.
    ///
    /// The scratch copy is removed on every exit path, and once anything was
    /// copied to `destination` its housekeeping files are removed even if the
    /// post script fails.
    pub fn render(
        &self,
        project_name: &str,
        template_name: &str,
        destination: &Path,
        template_path: &Path,
        prompt_if_duplicates: bool,
    ) -> Result<()> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("itmpl-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let work_dir = scratch.path().join(template_name);
        fs::create_dir_all(&work_dir)?;
        copy_tree(template_path, &work_dir, None)?;
        debug!("Copied '{}' to '{}'", template_path.display(), work_dir.display());

        let ResolvedVariables { variables, excludes } =
            self.resolve_variables(project_name, &work_dir, destination)?;

        template_directory(self.renderer, &work_dir, &variables, &excludes, UndefinedPolicy::Preserve)
            .map_err(|e| templating_error("templating directory", e))?;

        let duplicates = find_duplicates(&work_dir, destination, None).collect::<Result<Vec<PathBuf>>>()?;
        if !duplicates.is_empty() && !self.confirm_duplicates(&duplicates, prompt_if_duplicates)? {
            return Err(Error::Aborted);
        }

        fs::create_dir_all(destination)?;
        copy_tree(&work_dir, destination, None)?;
        info!("Created '{}' from template '{template_name}'", destination.display());

        let outcome = self.post_render(project_name, destination, &variables, &excludes);
        let cleanup = cleanup(destination);
        if let (Err(_), Err(e)) = (&outcome, &cleanup) {
            warn!("{e}");
        }
        outcome?;
        cleanup?;

        scratch.close()?;
        Ok(())
    }

    fn confirm_duplicates(&self, duplicates: &[PathBuf], prompt_if_duplicates: bool) -> Result<bool> {
        let listing = duplicates
            .iter()
            .map(|path| format!("  {}", fs::canonicalize(path).unwrap_or_else(|_| path.clone()).display()))
            .collect::<Vec<_>>()
            .join("\n");
        if prompt_if_duplicates {
            eprintln!("The following files already exist and will not be overwritten:\n{listing}");
        } else {
            debug!("Keeping existing files:\n{listing}");
        }

        self.prompt.confirm(!prompt_if_duplicates, "Continue?".to_string())
    }

    /// Runs the post script in `destination` and, if it returns variables,
    /// renders `destination` again with only those variables.
    fn post_render(
        &self,
        project_name: &str,
        destination: &Path,
        variables: &Variables,
        excludes: &GlobSet,
    ) -> Result<()> {
        let phase = EntryPoint::PostScript.to_string();
        let Some(script) = self.scripts.load(destination).map_err(|e| templating_error(&phase, e))? else {
            return Ok(());
        };
        if !script.has_entry_point(EntryPoint::PostScript) {
            return Ok(());
        }

        let new_variables = script
            .post_script(project_name, destination, variables)
            .map_err(|e| templating_error(&phase, e))?;
        match new_variables {
            Some(new_variables) if !new_variables.is_empty() => {
                debug!("Rendering '{}' with post script variables", destination.display());
                template_directory(self.renderer, destination, &new_variables, excludes, UndefinedPolicy::Strict)
                    .map_err(|e| templating_error("templating directory", e))
            }
            _ => Ok(()),
        }
    }
}

/// Removes housekeeping files and build artifacts from a generated project.
pub fn cleanup<P: AsRef<Path>>(destination: P) -> Result<()> {
    for pattern in CLEANUP_PATTERNS {
        recursive_delete(destination.as_ref(), pattern)?;
    }
    Ok(())
}

/// Renders a template with the default renderer, prompter and script loader.
///
/// See [`Generator::render`].
pub fn render_template(
    project_name: &str,
    template_name: &str,
    destination: &Path,
    template_path: &Path,
    prompt_if_duplicates: bool,
) -> Result<()> {
    let renderer = MiniJinjaRenderer::new();
    let prompt = DialoguerPrompter::new();
    Generator::new(&renderer, &prompt, &HookLoader).render(
        project_name,
        template_name,
        destination,
        template_path,
        prompt_if_duplicates,
    )
}
