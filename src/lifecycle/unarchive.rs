use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    domain::{Document, EXTENSION},
    storage::{Archive, ArchiveGroups, GroupKey, Layers, LoadError, file_name},
};

/// Errors raised while unarchiving.
#[derive(Debug, thiserror::Error)]
pub enum UnarchiveError {
    /// The archive directory does not exist.
    #[error("archive directory does not exist at {}", .0.display())]
    ArchiveMissing(PathBuf),

    /// A file could not be moved, read or removed.
    #[error("filesystem error at {}: {error}", path.display())]
    Filesystem {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A revived document's header could not be read back.
    #[error("could not read {}: {error}", path.display())]
    Load {
        /// The document path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        error: LoadError,
    },
}

/// What happened to one archived document.
#[derive(Debug)]
pub enum ReviveStatus {
    /// Moved into the draft layer and marked alive.
    Revived(PathBuf),
    /// A draft with the same filename exists; the document stays archived.
    Conflict,
    /// The document could not be revived.
    Failed(UnarchiveError),
}

/// The result of reviving one archived document.
#[derive(Debug)]
pub struct ReviveOutcome {
    /// The document filename.
    pub name: String,
    /// What happened to it.
    pub status: ReviveStatus,
}

/// Per-document results of reviving a group.
#[derive(Debug, Default)]
pub struct ReviveReport {
    /// One entry per group member, in group order.
    pub outcomes: Vec<ReviveOutcome>,
}

impl ReviveReport {
    /// The number of documents moved back into the draft layer.
    #[must_use]
    pub fn revived(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ReviveStatus::Revived(_)))
            .count()
    }
}

/// Reverses compiles by moving archived documents back into the draft layer.
pub struct Unarchiver<'a> {
    layers: &'a Layers,
    archive: &'a Archive,
}

impl<'a> Unarchiver<'a> {
    /// An unarchiver over the given layers and archive.
    #[must_use]
    pub const fn new(layers: &'a Layers, archive: &'a Archive) -> Self {
        Self { layers, archive }
    }

    /// Groups the archive by `afterlife` target.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive directory is missing or unreadable.
    pub fn groups(&self) -> Result<ArchiveGroups, UnarchiveError> {
        let directory = self.archive.directory();
        if !directory.is_dir() {
            return Err(UnarchiveError::ArchiveMissing(directory.to_path_buf()));
        }
        self.archive
            .groups()
            .map_err(|error| UnarchiveError::Filesystem {
                path: directory.to_path_buf(),
                error,
            })
    }

    /// Moves each archived document into the draft layer and marks it alive.
    ///
    /// Documents whose filename is already taken in the draft layer are left
    /// in the archive. Failures are recorded per document and do not stop the
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns an error only if the draft layer directory cannot be created.
    pub fn revive(&self, members: &[PathBuf]) -> Result<ReviveReport, UnarchiveError> {
        let drafts = self.layers.drafts();
        drafts
            .ensure_exists()
            .map_err(|error| UnarchiveError::Filesystem {
                path: drafts.directory().to_path_buf(),
                error,
            })?;

        let outcomes = members
            .iter()
            .map(|archived| {
                let name = file_name(archived);
                let destination = drafts.path_of(&name);

                let status = if destination.exists() {
                    tracing::warn!("{name} already exists in {}", drafts.name());
                    ReviveStatus::Conflict
                } else {
                    match revive_one(archived, &destination) {
                        Ok(()) => {
                            tracing::info!("Revived {name}");
                            ReviveStatus::Revived(destination)
                        }
                        Err(error) => ReviveStatus::Failed(error),
                    }
                };

                ReviveOutcome { name, status }
            })
            .collect();

        Ok(ReviveReport { outcomes })
    }

    /// The compiled document a group was folded into, if it still exists.
    ///
    /// The group key is looked up as `<key>.md` in each layer above drafts,
    /// lowest first. The orphan group has no target, and neither does a key
    /// that would resolve outside its layer.
    #[must_use]
    pub fn compiled_target(&self, key: &GroupKey) -> Option<PathBuf> {
        let target = key.target()?;
        if target.contains(['/', '\\']) || target.contains("..") {
            tracing::warn!("Ignoring archive back-link with a path in it: {target}");
            return None;
        }

        let filename = format!("{target}.{EXTENSION}");
        self.layers
            .iter()
            .skip(1)
            .map(|layer| layer.path_of(&filename))
            .find(|path| path.is_file())
    }

    /// Deletes a compiled target.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    pub fn delete_target(&self, path: &Path) -> Result<(), UnarchiveError> {
        fs::remove_file(path).map_err(|error| UnarchiveError::Filesystem {
            path: path.to_path_buf(),
            error,
        })?;
        tracing::info!("Deleted {}", path.display());
        Ok(())
    }
}

fn revive_one(archived: &Path, destination: &Path) -> Result<(), UnarchiveError> {
    move_file(archived, destination).map_err(|error| UnarchiveError::Filesystem {
        path: archived.to_path_buf(),
        error,
    })?;

    let mut document = Document::load(destination).map_err(|error| UnarchiveError::Load {
        path: destination.to_path_buf(),
        error,
    })?;
    document.metadata_mut().revive();
    document
        .save(destination)
        .map_err(|error| UnarchiveError::Filesystem {
            path: destination.to_path_buf(),
            error,
        })
}

/// Renames a file, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
