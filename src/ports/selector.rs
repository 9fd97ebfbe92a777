use std::{
    io::{self, Write},
    process::{Command, Stdio},
};

/// Whether the operator may pick one item or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Exactly one item.
    Single,
    /// Any number of items.
    Multi,
}

/// Picks items from a labelled list.
///
/// An empty result means the operator aborted.
pub trait Selector {
    /// Offers `items` and blocks until the operator chooses.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection could not be presented.
    fn select(
        &mut self,
        items: &[String],
        mode: SelectMode,
        prompt: &str,
    ) -> io::Result<Vec<String>>;
}

/// Interactive selection through the `fzf` fuzzy finder.
#[derive(Debug, Clone)]
pub struct Fzf {
    program: String,
}

impl Default for Fzf {
    fn default() -> Self {
        Self {
            program: "fzf".to_string(),
        }
    }
}

impl Fzf {
    /// Uses the given program in place of `fzf`.
    #[must_use]
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Selector for Fzf {
    fn select(
        &mut self,
        items: &[String],
        mode: SelectMode,
        prompt: &str,
    ) -> io::Result<Vec<String>> {
        let mut command = Command::new(&self.program);
        command.args(["--prompt", prompt, "--height=40%", "--reverse"]);
        if mode == SelectMode::Multi {
            command.arg("-m");
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The finder may quit before reading everything.
            match stdin.write_all(items.join("\n").as_bytes()) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                result => result?,
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            tracing::debug!("{} exited with {}", self.program, output.status);
            return Ok(Vec::new());
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<String> {
        vec!["a.md".to_string(), "b.md".to_string()]
    }

    #[test]
    fn aborted_finder_selects_nothing() {
        let mut fzf = Fzf::with_program("false");
        let chosen = fzf.select(&items(), SelectMode::Multi, "> ").unwrap();
        assert!(chosen.is_empty());
    }

    #[test]
    fn finder_with_no_output_selects_nothing() {
        let mut fzf = Fzf::with_program("true");
        let chosen = fzf.select(&items(), SelectMode::Single, "> ").unwrap();
        assert!(chosen.is_empty());
    }

    #[test]
    fn missing_finder_is_an_error() {
        let mut fzf = Fzf::with_program("definitely-not-fzf-7f3a");
        let error = fzf.select(&items(), SelectMode::Single, "> ").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }
}
