use std::{io, path::Path, process::Command};

/// Opens a document for the operator and blocks until they are done.
pub trait Editor {
    /// Opens the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor could not be launched.
    fn open(&self, path: &Path) -> Result<(), EditorError>;
}

/// Launches an external editor program with the file as its only argument.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    program: String,
}

impl CommandEditor {
    /// An editor that runs `program <path>`.
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// The program that will be launched.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Editor for CommandEditor {
    fn open(&self, path: &Path) -> Result<(), EditorError> {
        let status = Command::new(&self.program)
            .arg(path)
            .status()
            .map_err(|source| EditorError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            tracing::warn!("{} exited with {status}", self.program);
        }
        Ok(())
    }
}

/// Errors raised when opening an editor.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The editor process could not be started.
    #[error("could not launch editor '{program}': {source}")]
    Launch {
        /// The program that failed to start.
        program: String,
        /// The underlying error.
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_a_launch_failure() {
        let editor = CommandEditor::new("definitely-not-an-editor-7f3a");
        let result = editor.open(Path::new("draft.md"));
        assert!(matches!(result, Err(EditorError::Launch { program, .. }) if program == editor.program()));
    }
}
