//! Renders a directory tree in place.
//! Both file contents and file/directory names are passed through the
//! template renderer.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use log::debug;
use walkdir::WalkDir;

use crate::constants::HOUSEKEEPING_PREFIX;
use crate::error::{Error, Result};
use crate::renderer::{TemplateRenderer, UndefinedPolicy};
use crate::variables::Variables;

/// Whether `file_name` belongs to the template's own housekeeping files.
pub fn is_housekeeping(file_name: &OsStr) -> bool {
    file_name.to_str().is_some_and(|name| name.starts_with(HOUSEKEEPING_PREFIX))
}

/// Whether a rendered file name can be used as a single path component.
pub fn is_rendered_name_valid(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains(std::path::MAIN_SEPARATOR)
}

/// Renders every file below a directory with one variable set.
pub struct DirectoryProcessor<'a> {
    renderer: &'a dyn TemplateRenderer,
    variables: &'a Variables,
    excludes: &'a GlobSet,
    policy: UndefinedPolicy,
}

impl<'a> DirectoryProcessor<'a> {
    pub fn new(
        renderer: &'a dyn TemplateRenderer,
        variables: &'a Variables,
        excludes: &'a GlobSet,
        policy: UndefinedPolicy,
    ) -> Self {
        Self { renderer, variables, excludes, policy }
    }

    /// Renders the contents and names of every entry below `root`.
    ///
    /// Housekeeping entries are skipped with their subtree, and entries matching
    /// the exclusion globs keep their content and name. Files are handled during
    /// the walk; directories are renamed afterwards, deepest first, so renaming a
    /// parent never invalidates a recorded child path.
    pub fn process<P: AsRef<Path>>(&self, root: P) -> Result<()> {
        let root = root.as_ref();
        debug!("Templating directory '{}'", root.display());

        // Collect up front: renaming files while a directory is being read
        // could make the walk see an entry twice.
        let entries = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_housekeeping(entry.file_name()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut directories = Vec::new();
        for entry in entries {
            let path = entry.path();
            if self.is_excluded(root, path) {
                debug!("Skipping excluded '{}'", path.display());
                continue;
            }

            if entry.file_type().is_dir() {
                directories.push(path.to_path_buf());
            } else {
                self.render_contents(path)?;
                self.rename(path)?;
            }
        }

        for directory in directories.iter().rev() {
            self.rename(directory)?;
        }

        Ok(())
    }

    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        path.strip_prefix(root).is_ok_and(|relative| self.excludes.is_match(relative))
    }

    fn render_contents(&self, path: &Path) -> Result<()> {
        let bytes = fs::read(path)?;
        let Ok(content) = String::from_utf8(bytes) else {
            debug!("Not rendering contents of binary file '{}'", path.display());
            return Ok(());
        };

        let rendered = self
            .renderer
            .render(&content, self.variables, self.policy)
            .map_err(|e| Error::TemplatingError(format!("'{}': {e}", path.display())))?;
        if rendered != content {
            fs::write(path, rendered)?;
        }
        Ok(())
    }

    /// Renames `path` to its rendered name, returning the new path if it changed.
    fn rename(&self, path: &Path) -> Result<Option<PathBuf>> {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
        else {
            return Ok(None);
        };

        let rendered = self
            .renderer
            .render(name, self.variables, self.policy)
            .map_err(|e| Error::TemplatingError(format!("name '{name}': {e}")))?;
        if rendered == name {
            return Ok(None);
        }
        if !is_rendered_name_valid(&rendered) {
            return Err(Error::TemplatingError(format!(
                "name '{name}' rendered to invalid name '{rendered}'"
            )));
        }

        let target = parent.join(&rendered);
        debug!("Renaming '{}' to '{}'", path.display(), target.display());
        fs::rename(path, &target)?;
        Ok(Some(target))
    }
}

/// Renders the contents and names of every entry below `root`.
///
/// See [`DirectoryProcessor::process`].
pub fn template_directory<P: AsRef<Path>>(
    renderer: &dyn TemplateRenderer,
    root: P,
    variables: &Variables,
    excludes: &GlobSet,
    policy: UndefinedPolicy,
) -> Result<()> {
    DirectoryProcessor::new(renderer, variables, excludes, policy).process(root)
}
