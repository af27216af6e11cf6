//! User interaction handling.

use dialoguer::Confirm;

use crate::error::Result;

/// Trait for asking the operator questions.
pub trait Prompter {
    /// Asks a yes/no question.
    ///
    /// # Arguments
    /// * `skip` - Answer yes without asking
    /// * `prompt` - Question shown to the operator
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool>;
}

/// Terminal prompter built on dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool> {
        if skip {
            return Ok(true);
        }

        let answer = Confirm::new().with_prompt(prompt).default(false).interact()?;
        Ok(answer)
    }
}
