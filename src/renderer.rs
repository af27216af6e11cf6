//! Template renderer and rendering functionality for itmpl.
//! Renders file contents and path names with MiniJinja.

use minijinja::{Environment, UndefinedBehavior, Value};

use crate::error::Result;
use crate::variables::Variables;

const TEMPLATE_NAME: &str = "temp";

/// Filter every print block is routed through when undefined values are preserved.
const PLACEHOLDER_FILTER: &str = "itmpl_placeholder";

/// What to do with a placeholder whose variable is not defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedPolicy {
    /// Re-emit the placeholder as literal `{{ expression }}` text
    Preserve,
    /// Fail the render
    Strict,
}

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given variables.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `variables` - Variables available to the template
    /// * `policy` - How undefined variables are handled
    ///
    /// # Returns
    /// * `Result<String>` - Rendered template string
    fn render(&self, template: &str, variables: &Variables, policy: UndefinedPolicy)
        -> Result<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a new renderer that keeps trailing newlines of rendered files.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        MiniJinjaRenderer::new()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a template string using MiniJinja.
    ///
    /// With [`UndefinedPolicy::Preserve`], undefined values behave as undefined
    /// everywhere (they are falsy, iterate as empty, trigger `default` and fail
    /// `is defined`, and attribute lookups on them stay undefined). Only a print
    /// block whose final value is undefined differs: it renders as its own
    /// source, so a later pass can still fill it in.
    ///
    /// # Errors
    /// * `Error::MinijinjaError` if the template has a syntax error, or if
    ///   an undefined variable is used under [`UndefinedPolicy::Strict`]
    fn render(
        &self,
        template: &str,
        variables: &Variables,
        policy: UndefinedPolicy,
    ) -> Result<String> {
        let mut env = self.env.clone();
        match policy {
            UndefinedPolicy::Preserve => {
                env.set_undefined_behavior(UndefinedBehavior::Chainable);
                let (source, placeholders) = wrap_print_blocks(template);
                env.add_filter(PLACEHOLDER_FILTER, move |value: Value, index: usize| {
                    if !value.is_undefined() {
                        return value;
                    }
                    match placeholders.get(index) {
                        Some(placeholder) => Value::from_safe_string(placeholder.clone()),
                        None => value,
                    }
                });
                env.add_template_owned(TEMPLATE_NAME, source)?;
            }
            UndefinedPolicy::Strict => {
                env.set_undefined_behavior(UndefinedBehavior::Strict);
                env.add_template_owned(TEMPLATE_NAME, template.to_owned())?;
            }
        }

        let tmpl = env.get_template(TEMPLATE_NAME)?;
        Ok(tmpl.render(Value::from_serialize(variables))?)
    }
}

/// Routes every `{{ ... }}` block of `source` through [`PLACEHOLDER_FILTER`].
///
/// Returns the rewritten source and, per block, the text it falls back to.
/// Comments, statements and `raw` sections are copied unchanged. Unterminated
/// tags end the scan so the engine reports the syntax error.
fn wrap_print_blocks(source: &str) -> (String, Vec<String>) {
    let bytes = source.as_bytes();
    let mut output = String::with_capacity(source.len());
    let mut placeholders = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        match bytes[i + 1] {
            b'#' => match source[i + 2..].find("#}") {
                Some(offset) => i += offset + 4,
                None => break,
            },
            b'%' => {
                let Some(end) = tag_end(bytes, i + 2, b'%') else { break };
                let statement = trim_markers(&source[i + 2..end]);
                i = end + 2;
                if statement == "raw" {
                    match skip_raw(source, i) {
                        Some(after) => i = after,
                        None => break,
                    }
                }
            }
            b'{' => {
                let Some(end) = tag_end(bytes, i + 2, b'}') else { break };
                let (open, expression, close) = split_print_block(&source[i + 2..end]);
                if !expression.is_empty() {
                    output.push_str(&source[copied..i]);
                    output.push_str(&format!(
                        "{{{{{open} ({expression})|{PLACEHOLDER_FILTER}({}) {close}}}}}",
                        placeholders.len()
                    ));
                    placeholders.push(format!("{{{{ {expression} }}}}"));
                    copied = end + 2;
                }
                i = end + 2;
            }
            _ => i += 1,
        }
    }

    output.push_str(&source[copied..]);
    (output, placeholders)
}

/// Index of the `closer` byte ending the tag whose body starts at `start`.
/// String literals and nested braces inside the tag are skipped.
fn tag_end(bytes: &[u8], start: usize, closer: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut j = start;

    while j < bytes.len() {
        let byte = bytes[j];
        match quote {
            Some(_) if byte == b'\\' => j += 1,
            Some(q) if byte == q => quote = None,
            Some(_) => {}
            None => match byte {
                b'\'' | b'"' => quote = Some(byte),
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                _ if byte == closer && depth == 0 && bytes.get(j + 1) == Some(&b'}') => {
                    return Some(j)
                }
                _ => {}
            },
        }
        j += 1;
    }

    None
}

/// Position right after the `{% endraw %}` closing a raw section that starts at `from`.
fn skip_raw(source: &str, mut from: usize) -> Option<usize> {
    while let Some(offset) = source[from..].find("{%") {
        let start = from + offset + 2;
        let end = tag_end(source.as_bytes(), start, b'%')?;
        if trim_markers(&source[start..end]) == "endraw" {
            return Some(end + 2);
        }
        from = end + 2;
    }
    None
}

fn trim_markers(body: &str) -> &str {
    body.trim_matches(|c| c == '-' || c == '+').trim()
}

/// Splits a print block body into its whitespace control markers and expression.
fn split_print_block(body: &str) -> (&str, &str, &str) {
    let (open, rest) = match body.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", body),
    };
    let (rest, close) = match rest.strip_suffix('-') {
        Some(rest) => (rest, "-"),
        None => (rest, ""),
    };
    (open, rest.trim(), close)
}
