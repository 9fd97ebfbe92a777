//! Operator interaction: picking items and answering prompts.

use std::io;

use dialoguer::{Confirm, Input, MultiSelect, Select};
use holloway::ports::{Fzf, SelectMode, Selector};

/// A selector that can also ask the operator questions.
pub trait Console: Selector {
    /// Reads a line of free text. May be blank.
    fn input(&mut self, prompt: &str) -> io::Result<String>;

    /// Asks a yes/no question, defaulting to no.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// The operator's terminal.
///
/// Selection goes through `fzf` when it is installed, and through a built-in
/// picker otherwise.
#[derive(Debug, Default)]
pub struct Terminal {
    fzf: Fzf,
}

impl Terminal {
    fn pick(items: &[String], mode: SelectMode, prompt: &str) -> io::Result<Vec<String>> {
        let chosen = match mode {
            SelectMode::Multi => MultiSelect::new()
                .with_prompt(prompt)
                .items(items)
                .interact_opt()
                .map_err(io::Error::other)?
                .unwrap_or_default(),
            SelectMode::Single => Select::new()
                .with_prompt(prompt)
                .items(items)
                .default(0)
                .interact_opt()
                .map_err(io::Error::other)?
                .into_iter()
                .collect(),
        };
        Ok(chosen.into_iter().map(|i| items[i].clone()).collect())
    }
}

impl Selector for Terminal {
    fn select(
        &mut self,
        items: &[String],
        mode: SelectMode,
        prompt: &str,
    ) -> io::Result<Vec<String>> {
        match self.fzf.select(items, mode, prompt) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("fzf is not installed, using the built-in picker");
                Self::pick(items, mode, prompt)
            }
            result => result,
        }
    }
}

impl Console for Terminal {
    fn input(&mut self, prompt: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }

    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(io::Error::other)
    }
}
