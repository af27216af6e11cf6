use itmpl::error::Error;
use itmpl::renderer::{MiniJinjaRenderer, TemplateRenderer, UndefinedPolicy};
use itmpl::variables::Variables;
use serde_json::json;

fn variables(value: serde_json::Value) -> Variables {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_minijinja_renderer() {
    let renderer = MiniJinjaRenderer::new();
    let context = variables(json!({"name": "test", "value": 42}));

    let result = renderer.render("Hello {{ name }}!", &context, UndefinedPolicy::Strict).unwrap();
    assert_eq!(result, "Hello test!");

    let result = renderer.render("Value: {{ value }}", &context, UndefinedPolicy::Strict).unwrap();
    assert_eq!(result, "Value: 42");
}

#[test]
fn test_keeps_trailing_newline() {
    let renderer = MiniJinjaRenderer::new();
    let context = variables(json!({"name": "test"}));

    let result = renderer.render("{{ name }}\n", &context, UndefinedPolicy::Strict).unwrap();
    assert_eq!(result, "test\n");
}

#[test]
fn test_preserve_leaves_undefined_placeholders() {
    let renderer = MiniJinjaRenderer::new();
    let context = variables(json!({"project_name": "demo"}));

    let result = renderer
        .render("{{ project_name }} by {{ author }}", &context, UndefinedPolicy::Preserve)
        .unwrap();
    assert_eq!(result, "demo by {{ author }}");
}

#[test]
fn test_preserved_placeholder_renders_in_a_later_pass() {
    let renderer = MiniJinjaRenderer::new();
    let first = renderer
        .render("{{ greeting }}, {{ name }}", &variables(json!({"greeting": "Hi"})), UndefinedPolicy::Preserve)
        .unwrap();

    let second = renderer
        .render(&first, &variables(json!({"name": "there"})), UndefinedPolicy::Strict)
        .unwrap();
    assert_eq!(second, "Hi, there");
}

#[test]
fn test_preserve_keeps_builtin_functions() {
    let renderer = MiniJinjaRenderer::new();
    let result = renderer
        .render("{% for i in range(3) %}{{ i }}{% endfor %}", &Variables::new(), UndefinedPolicy::Preserve)
        .unwrap();
    assert_eq!(result, "012");
}

#[test]
fn test_strict_fails_on_undefined() {
    let renderer = MiniJinjaRenderer::new();
    let result = renderer.render("{{ missing }}", &Variables::new(), UndefinedPolicy::Strict);

    assert!(matches!(result, Err(Error::MinijinjaError(_))));
}

#[test]
fn test_syntax_error() {
    let renderer = MiniJinjaRenderer::new();
    let result = renderer.render("{% if %}", &Variables::new(), UndefinedPolicy::Preserve);

    assert!(result.is_err());
}

fn render_preserve(template: &str) -> String {
    MiniJinjaRenderer::new()
        .render(template, &Variables::new(), UndefinedPolicy::Preserve)
        .unwrap()
}

#[test]
fn test_preserve_undefined_is_falsy() {
    assert_eq!(render_preserve("{% if feature %}ENABLED{% endif %}"), "");
    assert_eq!(render_preserve("{% if not feature %}DISABLED{% endif %}"), "DISABLED");
}

#[test]
fn test_preserve_undefined_takes_default() {
    assert_eq!(render_preserve("{{ name | default('fallback') }}"), "fallback");
}

#[test]
fn test_preserve_undefined_is_not_defined() {
    assert_eq!(render_preserve("{% if name is defined %}yes{% else %}no{% endif %}"), "no");
}

#[test]
fn test_preserve_undefined_iterates_as_empty() {
    assert_eq!(render_preserve("{% for x in items %}[{{ x }}]{% endfor %}"), "");
}

#[test]
fn test_preserve_undefined_attribute_chain() {
    assert_eq!(render_preserve("token: ${{ secrets.TOKEN }}"), "token: ${{ secrets.TOKEN }}");
    assert_eq!(render_preserve("{{ a.b['c'] }}"), "{{ a.b['c'] }}");
}

#[test]
fn test_preserve_keeps_whitespace_control() {
    assert_eq!(render_preserve("a \n{{- name }}"), "a{{ name }}");
}

#[test]
fn test_preserve_leaves_raw_sections() {
    assert_eq!(render_preserve("{% raw %}{{ name }}{% endraw %}"), "{{ name }}");
}

#[test]
fn test_preserve_renders_defined_values_normally() {
    let context = variables(json!({"items": ["a", "b"], "feature": true, "user": {"name": "x"}}));
    let result = MiniJinjaRenderer::new()
        .render(
            "{% if feature %}{% for i in items %}{{ i }}{% endfor %}{% endif %} {{ user.name }}",
            &context,
            UndefinedPolicy::Preserve,
        )
        .unwrap();

    assert_eq!(result, "ab x");
}
