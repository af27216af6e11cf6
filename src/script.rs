//! Template scripts.
//!
//! A template may ship a `.itmpl.hooks/` directory with up to two executables:
//! - `get_variables` produces extra variables before the first render pass
//! - `post_script` runs once the project is materialized and may return
//!   variables for a final, strict render pass
//!
//! Each entry point receives a JSON object on stdin and may print a JSON object
//! of variables on stdout.

use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::constants::SCRIPT_DIR;
use crate::error::{Error, Result};
use crate::variables::Variables;

const SPAWN_ATTEMPTS: u32 = 5;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(50);

/// The entry points a template script may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    GetVariables,
    PostScript,
}

impl EntryPoint {
    /// File name of the entry point inside the script directory.
    pub fn file_name(self) -> &'static str {
        match self {
            EntryPoint::GetVariables => "get_variables",
            EntryPoint::PostScript => "post_script",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::GetVariables => write!(f, "getting variables"),
            EntryPoint::PostScript => write!(f, "running post script"),
        }
    }
}

/// A loaded template script.
///
/// Both entry points are optional; callers check [`TemplateScript::has_entry_point`]
/// before invoking one.
pub trait TemplateScript {
    /// Whether the script exposes `entry_point`.
    fn has_entry_point(&self, entry_point: EntryPoint) -> bool;

    /// Produces variables for the project about to be rendered into `destination`.
    fn get_variables(
        &self,
        project_name: &str,
        destination: &Path,
        variables: &Variables,
    ) -> Result<Variables>;

    /// Runs after the project was materialized in `final_directory`.
    ///
    /// Returned variables replace the whole variable set for a second render pass.
    fn post_script(
        &self,
        project_name: &str,
        final_directory: &Path,
        variables: &Variables,
    ) -> Result<Option<Variables>>;
}

/// Trait for loading the script of a template directory.
pub trait ScriptLoader {
    /// Loads the script stored in `template_dir`.
    ///
    /// # Returns
    /// * `Result<Option<Box<dyn TemplateScript>>>` - `None` if the template has no script
    fn load(&self, template_dir: &Path) -> Result<Option<Box<dyn TemplateScript>>>;
}

/// Loads scripts made of executables in the template's `.itmpl.hooks/` directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct HookLoader;

impl ScriptLoader for HookLoader {
    /// # Errors
    /// * `Error::ScriptLoadError` if the hooks path is not a directory or an
    ///   entry point is not an executable file
    fn load(&self, template_dir: &Path) -> Result<Option<Box<dyn TemplateScript>>> {
        Ok(HookScript::load(template_dir)?.map(|script| Box::new(script) as Box<dyn TemplateScript>))
    }
}

/// Loads the script of `template_dir` with the default [`HookLoader`].
pub fn load_script<P: AsRef<Path>>(template_dir: P) -> Result<Option<Box<dyn TemplateScript>>> {
    HookLoader.load(template_dir.as_ref())
}

/// A script backed by executables.
#[derive(Debug, Clone)]
pub struct HookScript {
    root: PathBuf,
    get_variables: Option<PathBuf>,
    post_script: Option<PathBuf>,
}

/// What an entry point reads from stdin.
#[derive(Serialize)]
struct ScriptInput<'a> {
    project_name: &'a str,
    directory: &'a Path,
    variables: &'a Variables,
}

impl HookScript {
    /// Loads the hook executables of `template_dir`, if it has any.
    pub fn load<P: AsRef<Path>>(template_dir: P) -> Result<Option<Self>> {
        let root = template_dir.as_ref();
        let hooks_dir = root.join(SCRIPT_DIR);
        if !hooks_dir.exists() {
            return Ok(None);
        }
        if !hooks_dir.is_dir() {
            return Err(Error::ScriptLoadError {
                path: hooks_dir,
                message: "expected a directory".to_string(),
            });
        }

        debug!("Loading script from '{}'", hooks_dir.display());
        Ok(Some(Self {
            root: root.to_path_buf(),
            get_variables: entry_point_path(&hooks_dir, EntryPoint::GetVariables)?,
            post_script: entry_point_path(&hooks_dir, EntryPoint::PostScript)?,
        }))
    }

    fn path(&self, entry_point: EntryPoint) -> Option<&Path> {
        match entry_point {
            EntryPoint::GetVariables => self.get_variables.as_deref(),
            EntryPoint::PostScript => self.post_script.as_deref(),
        }
    }

    /// Runs `entry_point`, returning the variables it printed, if any.
    fn run(&self, entry_point: EntryPoint, input: &ScriptInput<'_>) -> Result<Option<Variables>> {
        let Some(path) = self.path(entry_point) else {
            return Ok(None);
        };
        let execution_error = |message: String| Error::ScriptExecutionError { entry_point, message };

        debug!("Running '{}'", path.display());
        let mut command = Command::new(path);
        command
            .current_dir(&self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let mut child = spawn(&mut command)
            .map_err(|e| Error::ScriptLoadError { path: path.to_path_buf(), message: e.to_string() })?;

        let payload = serde_json::to_vec(input).map_err(|e| execution_error(e.to_string()))?;
        if let Some(mut stdin) = child.stdin.take() {
            // A script is free to ignore its input and exit early.
            match stdin.write_all(&payload) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(Error::IoError(e)),
                _ => {}
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(execution_error(format!("'{}' exited with {}", path.display(), output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(stdout.trim()) {
            Ok(serde_json::Value::Object(variables)) => Ok(Some(variables)),
            Ok(_) => Err(execution_error("expected a JSON object on stdout".to_string())),
            Err(e) => Err(execution_error(format!("invalid JSON on stdout: {e}"))),
        }
    }
}

impl TemplateScript for HookScript {
    fn has_entry_point(&self, entry_point: EntryPoint) -> bool {
        self.path(entry_point).is_some()
    }

    fn get_variables(
        &self,
        project_name: &str,
        destination: &Path,
        variables: &Variables,
    ) -> Result<Variables> {
        let input = ScriptInput { project_name, directory: destination, variables };
        Ok(self.run(EntryPoint::GetVariables, &input)?.unwrap_or_default())
    }

    fn post_script(
        &self,
        project_name: &str,
        final_directory: &Path,
        variables: &Variables,
    ) -> Result<Option<Variables>> {
        let input = ScriptInput { project_name, directory: final_directory, variables };
        self.run(EntryPoint::PostScript, &input)
    }
}

/// Spawns `command`, retrying while the executable is busy. An entry point
/// copied into a project can still be open for writing in a child process
/// forked by another thread of the embedding program.
fn spawn(command: &mut Command) -> std::io::Result<Child> {
    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e) if e.kind() == ErrorKind::ExecutableFileBusy && attempts < SPAWN_ATTEMPTS => {
                attempts += 1;
                debug!("'{}' is busy, retrying", command.get_program().to_string_lossy());
                thread::sleep(SPAWN_RETRY_DELAY);
            }
            result => return result,
        }
    }
}

fn entry_point_path(hooks_dir: &Path, entry_point: EntryPoint) -> Result<Option<PathBuf>> {
    let path = hooks_dir.join(entry_point.file_name());
    if !path.exists() {
        return Ok(None);
    }
    if !path.is_file() {
        return Err(Error::ScriptLoadError { path, message: "expected a file".to_string() });
    }
    if !is_executable(&path)? {
        return Err(Error::ScriptLoadError { path, message: "file is not executable".to_string() });
    }
    Ok(Some(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    Ok(path.metadata()?.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> Result<bool> {
    Ok(true)
}
