use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use itmpl::error::{Error, Result};
use itmpl::prompt::Prompter;
use itmpl::renderer::MiniJinjaRenderer;
use itmpl::script::{EntryPoint, ScriptLoader, TemplateScript};
use itmpl::templating::Generator;
use itmpl::variables::{global_variables, Variables};
use serde_json::json;
use tempfile::TempDir;

type GetVariables = fn(&str, &Path, &Variables) -> Result<Variables>;
type PostScript = fn(&str, &Path, &Variables) -> Result<Option<Variables>>;

/// A script made of plain functions, loaded for any directory holding a
/// `.itmpl.hooks` directory.
#[derive(Clone, Copy, Default)]
struct FnScript {
    get_variables: Option<GetVariables>,
    post_script: Option<PostScript>,
}

impl TemplateScript for FnScript {
    fn has_entry_point(&self, entry_point: EntryPoint) -> bool {
        match entry_point {
            EntryPoint::GetVariables => self.get_variables.is_some(),
            EntryPoint::PostScript => self.post_script.is_some(),
        }
    }

    fn get_variables(&self, project_name: &str, destination: &Path, variables: &Variables) -> Result<Variables> {
        (self.get_variables.unwrap())(project_name, destination, variables)
    }

    fn post_script(
        &self,
        project_name: &str,
        final_directory: &Path,
        variables: &Variables,
    ) -> Result<Option<Variables>> {
        (self.post_script.unwrap())(project_name, final_directory, variables)
    }
}

impl ScriptLoader for FnScript {
    fn load(&self, template_dir: &Path) -> Result<Option<Box<dyn TemplateScript>>> {
        if template_dir.join(".itmpl.hooks").exists() {
            Ok(Some(Box::new(*self)))
        } else {
            Ok(None)
        }
    }
}

/// Answers every confirmation with a fixed value and records the prompts.
struct StaticPrompter {
    answer: bool,
    asked: RefCell<Vec<String>>,
}

impl StaticPrompter {
    fn new(answer: bool) -> Self {
        Self { answer, asked: RefCell::new(Vec::new()) }
    }
}

impl Prompter for StaticPrompter {
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool> {
        if skip {
            return Ok(true);
        }
        self.asked.borrow_mut().push(prompt);
        Ok(self.answer)
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Marks `template` as having a script; the loader only checks for the hooks directory.
fn add_hooks(template: &Path) {
    write(&template.join(".itmpl.hooks/README"), "");
}

fn variables(value: serde_json::Value) -> Variables {
    value.as_object().cloned().unwrap()
}

struct Fixture {
    _temp_dir: TempDir,
    template: PathBuf,
    destination: PathBuf,
    scratch: PathBuf,
}

impl Fixture {
    fn scratch_is_empty(&self) -> bool {
        fs::read_dir(&self.scratch).unwrap().next().is_none()
    }
}

fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let template = temp_dir.path().join("templates/demo");
    let destination = temp_dir.path().join("out/test-project");
    let scratch = temp_dir.path().join("scratch");
    fs::create_dir_all(&template).unwrap();
    fs::create_dir_all(&scratch).unwrap();
    Fixture { _temp_dir: temp_dir, template, destination, scratch }
}

fn render(fixture: &Fixture, script: FnScript, prompt: &StaticPrompter, prompt_if_duplicates: bool) -> Result<()> {
    let renderer = MiniJinjaRenderer::new();
    Generator::new(&renderer, prompt, &script).with_scratch_root(&fixture.scratch).render(
        "test-project",
        "demo",
        &fixture.destination,
        &fixture.template,
        prompt_if_duplicates,
    )
}

#[test]
fn test_render_file_name_and_content() {
    let fixture = fixture();
    write(&fixture.template.join("{{ project_name }}.txt"), "{{ project_title }}");

    render(&fixture, FnScript::default(), &StaticPrompter::new(true), true).unwrap();

    assert_eq!(
        fs::read_to_string(fixture.destination.join("test-project.txt")).unwrap(),
        "Test Project"
    );
    assert!(fixture.scratch_is_empty());
}

#[test]
fn test_render_does_not_modify_template() {
    let fixture = fixture();
    write(&fixture.template.join("{{ project_name }}/README.md"), "# {{ project_title }}\n");
    let pristine = fixture._temp_dir.path().join("pristine");
    itmpl::tree::copy_tree(&fixture.template, &pristine, None).unwrap();

    render(&fixture, FnScript::default(), &StaticPrompter::new(true), true).unwrap();

    assert!(!dir_diff::is_different(&fixture.template, &pristine).unwrap());
    assert_eq!(
        fs::read_to_string(fixture.destination.join("test-project/README.md")).unwrap(),
        "# Test Project\n"
    );
}

#[test]
fn test_resolve_variables_layers() {
    let fixture = fixture();
    write(&fixture.template.join(".itmpl.toml"), "[variables]\na = 1\nb = 2\n");
    add_hooks(&fixture.template);
    let script = FnScript {
        get_variables: Some(|_, _, _| Ok(variables(json!({"c": 3})))),
        post_script: None,
    };

    let renderer = MiniJinjaRenderer::new();
    let prompt = StaticPrompter::new(true);
    let resolved = Generator::new(&renderer, &prompt, &script)
        .resolve_variables("test-project", &fixture.template, &fixture.destination)
        .unwrap();

    let mut expected = variables(json!({
        "a": 1,
        "b": 2,
        "c": 3,
        "project_name": "test-project",
        "project_title": "Test Project",
    }));
    expected.extend(global_variables().clone());
    assert_eq!(resolved.variables, expected);
}

#[test]
fn test_script_variables_override_metadata() {
    let fixture = fixture();
    write(&fixture.template.join(".itmpl.toml"), "[variables]\nauthor = \"metadata\"\nlicense = \"MIT\"\n");
    add_hooks(&fixture.template);
    write(&fixture.template.join("AUTHORS"), "{{ author }} {{ license }} {{ seen }}");
    let script = FnScript {
        get_variables: Some(|_, _, layers| {
            let mut result = Variables::new();
            result.insert("author".to_string(), json!("script"));
            result.insert("seen".to_string(), layers["license"].clone());
            Ok(result)
        }),
        post_script: None,
    };

    render(&fixture, script, &StaticPrompter::new(true), true).unwrap();

    assert_eq!(
        fs::read_to_string(fixture.destination.join("AUTHORS")).unwrap(),
        "script MIT MIT"
    );
}

#[test]
fn test_get_variables_failure_is_a_templating_error() {
    let fixture = fixture();
    add_hooks(&fixture.template);
    write(&fixture.template.join("file.txt"), "{{ project_name }}");
    let script = FnScript {
        get_variables: Some(|_, _, _| {
            Err(Error::ScriptExecutionError {
                entry_point: EntryPoint::GetVariables,
                message: "This is a test exception".to_string(),
            })
        }),
        post_script: None,
    };

    match render(&fixture, script, &StaticPrompter::new(true), true) {
        Err(Error::TemplatingError(message)) => {
            assert!(message.contains("getting variables"));
            assert!(message.contains("This is a test exception"));
        }
        other => panic!("Expected TemplatingError, got {other:?}"),
    }
    assert!(!fixture.destination.exists());
    assert!(fixture.scratch_is_empty());
}

#[test]
fn test_invalid_metadata_is_a_templating_error() {
    let fixture = fixture();
    write(&fixture.template.join(".itmpl.toml"), "[metadata\n");

    let result = render(&fixture, FnScript::default(), &StaticPrompter::new(true), true);

    assert!(matches!(result, Err(Error::TemplatingError(_))));
    assert!(!fixture.destination.exists());
    assert!(fixture.scratch_is_empty());
}

#[test]
fn test_duplicates_declined() {
    let fixture = fixture();
    write(&fixture.template.join("README.md"), "new");
    write(&fixture.template.join("LICENSE"), "new");
    write(&fixture.destination.join("README.md"), "old");
    let prompt = StaticPrompter::new(false);

    let result = render(&fixture, FnScript::default(), &prompt, true);

    assert!(matches!(result, Err(Error::Aborted)));
    assert!(fixture.scratch_is_empty());
    assert_eq!(prompt.asked.borrow().len(), 1);
    assert_eq!(fs::read_to_string(fixture.destination.join("README.md")).unwrap(), "old");
    assert!(!fixture.destination.join("LICENSE").exists());
}

#[test]
fn test_duplicates_accepted_keep_existing_files() {
    let fixture = fixture();
    write(&fixture.template.join("README.md"), "new");
    write(&fixture.template.join("LICENSE"), "new");
    write(&fixture.destination.join("README.md"), "old");
    let prompt = StaticPrompter::new(true);

    render(&fixture, FnScript::default(), &prompt, true).unwrap();

    assert_eq!(prompt.asked.borrow().len(), 1);
    assert_eq!(fs::read_to_string(fixture.destination.join("README.md")).unwrap(), "old");
    assert_eq!(fs::read_to_string(fixture.destination.join("LICENSE")).unwrap(), "new");
}

#[test]
fn test_duplicates_without_prompt() {
    let fixture = fixture();
    write(&fixture.template.join("README.md"), "new");
    write(&fixture.destination.join("README.md"), "old");
    let prompt = StaticPrompter::new(false);

    render(&fixture, FnScript::default(), &prompt, false).unwrap();

    assert!(prompt.asked.borrow().is_empty());
    assert_eq!(fs::read_to_string(fixture.destination.join("README.md")).unwrap(), "old");
}

#[test]
fn test_post_script_variables_render_second_pass() {
    let fixture = fixture();
    add_hooks(&fixture.template);
    write(&fixture.template.join("{{ module }}/info.txt"), "{{ project_name }}: {{ version }}\n");
    let script = FnScript {
        get_variables: None,
        post_script: Some(|_, final_directory, variables| {
            assert!(final_directory.join(".itmpl.hooks").exists());
            let mut variables = variables.clone();
            variables.insert("version".to_string(), json!("1.0"));
            variables.insert("module".to_string(), json!("core"));
            Ok(Some(variables))
        }),
    };

    render(&fixture, script, &StaticPrompter::new(true), true).unwrap();

    assert_eq!(
        fs::read_to_string(fixture.destination.join("core/info.txt")).unwrap(),
        "test-project: 1.0\n"
    );
    assert!(!fixture.destination.join(".itmpl.hooks").exists());
}

#[test]
fn test_second_pass_is_strict() {
    let fixture = fixture();
    add_hooks(&fixture.template);
    write(&fixture.template.join(".itmpl.toml"), "[variables]\na = 1\n");
    write(&fixture.template.join("info.txt"), "{{ never_defined }}");
    let script = FnScript {
        get_variables: None,
        post_script: Some(|_, _, _| Ok(Some(variables(json!({"other": 1}))))),
    };

    let result = render(&fixture, script, &StaticPrompter::new(true), true);

    match result {
        Err(Error::TemplatingError(message)) => assert!(message.contains("templating directory")),
        other => panic!("Expected TemplatingError, got {other:?}"),
    }
    assert!(!fixture.destination.join(".itmpl.hooks").exists());
    assert!(!fixture.destination.join(".itmpl.toml").exists());
}

#[test]
fn test_housekeeping_removed_when_post_script_fails() {
    let fixture = fixture();
    add_hooks(&fixture.template);
    write(&fixture.template.join(".itmpl.toml"), "[variables]\na = 1\n");
    write(&fixture.template.join("__pycache__/cache.pyc"), "");
    write(&fixture.template.join("main.txt"), "{{ a }}");
    let script = FnScript {
        get_variables: None,
        post_script: Some(|_, _, _| {
            Err(Error::ScriptExecutionError {
                entry_point: EntryPoint::PostScript,
                message: "This is a test exception".to_string(),
            })
        }),
    };

    let result = render(&fixture, script, &StaticPrompter::new(true), true);

    match result {
        Err(Error::TemplatingError(message)) => assert!(message.contains("running post script")),
        other => panic!("Expected TemplatingError, got {other:?}"),
    }
    assert_eq!(fs::read_to_string(fixture.destination.join("main.txt")).unwrap(), "1");
    assert!(!fixture.destination.join(".itmpl.hooks").exists());
    assert!(!fixture.destination.join(".itmpl.toml").exists());
    assert!(!fixture.destination.join("__pycache__").exists());
    assert!(fixture.scratch_is_empty());
}

#[test]
fn test_excluded_files_are_copied_verbatim() {
    let fixture = fixture();
    write(
        &fixture.template.join(".itmpl.toml"),
        "[metadata]\ntemplating_excludes = [\"*.yml\"]\n",
    );
    write(&fixture.template.join(".github/workflows/ci.yml"), "run: ${{ matrix.os }}\n");
    write(&fixture.template.join("README.md"), "{{ project_name }}\n");

    render(&fixture, FnScript::default(), &StaticPrompter::new(true), true).unwrap();

    assert_eq!(
        fs::read_to_string(fixture.destination.join(".github/workflows/ci.yml")).unwrap(),
        "run: ${{ matrix.os }}\n"
    );
    assert_eq!(fs::read_to_string(fixture.destination.join("README.md")).unwrap(), "test-project\n");
}

#[cfg(unix)]
#[test]
fn test_render_bundled_template() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("my-tool");
    let template = Path::new(itmpl::constants::BUNDLED_TEMPLATES_DIR).join("rust-cli");

    itmpl::templating::render_template("my-tool", "rust-cli", &destination, &template, false).unwrap();

    let manifest = fs::read_to_string(destination.join("Cargo.toml")).unwrap();
    assert!(manifest.contains("name = \"my-tool\""));
    assert!(manifest.contains("edition = \"2021\""));
    assert!(fs::read_to_string(destination.join("src/main.rs")).unwrap().contains("Hello from My Tool!"));
    assert!(!destination.join(".itmpl.toml").exists());
    assert!(!destination.join(".itmpl.hooks").exists());
}
