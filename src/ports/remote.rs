use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use crate::{domain::Remote, storage::file_name};

/// Pushes an archived file to a remote destination.
pub trait RemoteSync {
    /// Copies the file at `path` to `remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy could not be started or did not succeed.
    fn push(&self, path: &Path, remote: &Remote) -> Result<(), SyncError>;
}

/// Copies files with `scp` in batch mode.
#[derive(Debug, Clone)]
pub struct Scp {
    program: String,
}

impl Default for Scp {
    fn default() -> Self {
        Self {
            program: "scp".to_string(),
        }
    }
}

impl Scp {
    /// Uses the given program in place of `scp`.
    ///
    /// The program is called with the same arguments `scp` would be.
    #[must_use]
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl RemoteSync for Scp {
    fn push(&self, path: &Path, remote: &Remote) -> Result<(), SyncError> {
        let destination = remote.destination(&file_name(path));
        tracing::debug!("{} {} {destination}", self.program, path.display());

        let status = Command::new(&self.program)
            .args(["-q", "-B"])
            .arg(path)
            .arg(&destination)
            .status()
            .map_err(|source| SyncError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SyncError::Failed {
                file: path.to_path_buf(),
                status,
            })
        }
    }
}

/// Errors raised while syncing to the remote.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The copy program could not be started.
    #[error("could not launch '{program}': {source}")]
    Launch {
        /// The program that failed to start.
        program: String,
        /// The underlying error.
        source: io::Error,
    },
    /// The copy program ran but reported failure.
    #[error("transfer of {} failed ({status})", file.display())]
    Failed {
        /// The file being pushed.
        file: PathBuf,
        /// The exit status of the copy program.
        status: ExitStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> Remote {
        Remote::new("writer", "backup", "/srv/archive").unwrap()
    }

    #[test]
    fn successful_copy_is_ok() {
        let scp = Scp::with_program("true");
        assert!(scp.push(Path::new("a.md"), &remote()).is_ok());
    }

    #[test]
    fn non_zero_exit_is_a_failed_transfer() {
        let scp = Scp::with_program("false");
        let result = scp.push(Path::new("a.md"), &remote());
        assert!(matches!(
            result,
            Err(SyncError::Failed { file, status }) if file == Path::new("a.md") && !status.success()
        ));
    }

    #[test]
    fn missing_program_is_a_launch_failure() {
        let scp = Scp::with_program("definitely-not-scp-7f3a");
        let result = scp.push(Path::new("a.md"), &remote());
        assert!(matches!(
            result,
            Err(SyncError::Launch { program, .. }) if program == "definitely-not-scp-7f3a"
        ));
    }
}
