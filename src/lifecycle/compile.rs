//! Compiling lower-layer documents into a higher-layer document.
//!
//! A compile runs in a fixed order: validate the transition and destination,
//! load every source, write the aggregated target, then for each source in
//! name order retire it, copy it to the archive, push it to the remote and
//! delete it from its layer. Nothing is written until validation has passed.
//! Once the per-source loop starts there is no rollback: the first failure
//! stops the batch and is returned in the [`CompileReport`] alongside the
//! sources that completed.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use non_empty_string::NonEmptyString;
use nonempty::NonEmpty;

use crate::{
    domain::{Document, Link, Remote, sanitize, strip_extension},
    ports::{RemoteSync, SyncError},
    storage::{Archive, Layer, LayerError, Layers, LoadError},
};

/// Everything needed to run one compile without further input.
#[derive(Debug, Clone)]
pub struct CompilePlan {
    /// The name of the layer the sources live in.
    pub source_layer: String,
    /// The name of the layer the target lives in.
    pub target_layer: String,
    /// Filenames of the source documents. Order does not matter; sources are
    /// aggregated in name order.
    pub sources: NonEmpty<String>,
    /// Where the aggregated content goes.
    pub destination: Destination,
}

/// The document a compile writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Append to an existing live document (by filename).
    Append(String),
    /// Create a new document with this title.
    Create(NonEmptyString),
}

impl Destination {
    /// A new target with the given title.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::TitleRequired`] if the title is blank.
    pub fn create(title: &str) -> Result<Self, CompileError> {
        NonEmptyString::new(title.trim().to_string())
            .map(Self::Create)
            .map_err(|_| CompileError::TitleRequired)
    }
}

/// Errors raised by a compile.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The named layer is not configured.
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    /// The source layer does not rank below the target layer.
    #[error("invalid layer transition: {from} -> {to}")]
    InvalidTransition {
        /// The source layer.
        from: String,
        /// The target layer.
        to: String,
    },

    /// Create mode was given a blank or unusable title.
    #[error("a title is required for a new document")]
    TitleRequired,

    /// Append mode names a document that is not live in the target layer.
    #[error("target {0} not found")]
    MissingTarget(String),

    /// Create mode would overwrite an existing document.
    #[error("target {0} already exists")]
    TargetExists(String),

    /// A source or target document could not be read.
    #[error("could not read {}: {error}", path.display())]
    Load {
        /// The document path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        error: LoadError,
    },

    /// A retired source could not be copied into the archive.
    #[error("could not archive {}: {error}", path.display())]
    ArchiveWriteFailed {
        /// The source path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The archived copy could not be pushed to the remote.
    #[error(transparent)]
    SyncFailed(#[from] SyncError),

    /// A filesystem write, create or delete failed.
    #[error("filesystem error at {}: {error}", path.display())]
    FilesystemIo {
        /// The path being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The target layer rejected the document for another reason.
    #[error(transparent)]
    Layer(LayerError),
}

impl CompileError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |error| Self::FilesystemIo {
            path: path.to_path_buf(),
            error,
        }
    }

    fn layer(path: &Path) -> impl FnOnce(LayerError) -> Self + '_ {
        move |error| match error {
            LayerError::AlreadyExists(name) => Self::TargetExists(name),
            LayerError::InvalidName(_) => Self::TitleRequired,
            LayerError::Io(error) => Self::io(path)(error),
            error @ (LayerError::Empty | LayerError::Duplicate(_)) => Self::Layer(error),
        }
    }
}

/// A source that was retired, archived and removed from its layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// The source filename.
    pub name: String,
    /// Where the archived copy lives.
    pub archived: PathBuf,
    /// Whether the archived copy was pushed to the remote.
    pub synced: bool,
}

/// The source at which a compile stopped.
#[derive(Debug)]
pub struct BatchFailure {
    /// The filename of the source being processed.
    pub source: String,
    /// Whether the source was marked dead before the failure.
    pub retired: bool,
    /// The archived copy, if the failure came after archiving.
    pub archived: Option<PathBuf>,
    /// What went wrong.
    pub error: CompileError,
    /// Sources that were never touched, still live in their layer.
    pub untouched: Vec<String>,
}

/// What a compile did.
#[derive(Debug)]
pub struct CompileReport {
    /// The path of the target document.
    pub target: PathBuf,
    /// Whether the target was created rather than appended to.
    pub created: bool,
    /// Sources fully processed, in processing order.
    pub completed: Vec<SourceOutcome>,
    /// The failure that stopped the batch, if any.
    pub halted: Option<BatchFailure>,
}

impl CompileReport {
    /// The filename of the target document.
    #[must_use]
    pub fn target_name(&self) -> String {
        crate::storage::file_name(&self.target)
    }

    /// Whether every source was processed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Totals gathered from the sources of a compile.
#[derive(Debug, Default, PartialEq, Eq)]
struct Aggregate {
    body: String,
    summary: String,
    word_count: u64,
    word_count_goal: u64,
}

impl Aggregate {
    fn of<'d>(documents: impl IntoIterator<Item = &'d Document>) -> Self {
        let mut bodies = Vec::new();
        let mut summaries = Vec::new();
        let mut word_count = 0u64;
        let mut word_count_goal = 0u64;

        for document in documents {
            let metadata = document.metadata();
            word_count = word_count.saturating_add(metadata.word_count);
            word_count_goal = word_count_goal.saturating_add(metadata.word_count_goal);
            if let Some(summary) = metadata.summary.as_deref().filter(|s| !s.is_empty()) {
                summaries.push(summary);
            }
            bodies.push(document.body());
        }

        Self {
            body: bodies.join("\n\n"),
            summary: summaries.join(" "),
            word_count,
            word_count_goal,
        }
    }

    /// Overwrites the totals of a freshly created target.
    fn apply_to_new(&self, target: &mut Document) {
        let metadata = target.metadata_mut();
        metadata.word_count = self.word_count;
        metadata.word_count_goal = self.word_count_goal;
        metadata.summary = Some(self.summary.clone()).filter(|s| !s.is_empty());
    }

    /// Adds the totals and body to an existing target.
    ///
    /// Appending the same sources twice counts them twice.
    fn append_to(&self, target: &mut Document) {
        target.body = if target.body.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n\n{}", target.body, self.body)
        };

        let metadata = target.metadata_mut();
        metadata.word_count = metadata.word_count.saturating_add(self.word_count);
        metadata.word_count_goal = metadata.word_count_goal.saturating_add(self.word_count_goal);

        let summary = format!(
            "{} {}",
            metadata.summary.as_deref().unwrap_or_default(),
            self.summary
        );
        metadata.summary = Some(summary.trim().to_string()).filter(|s| !s.is_empty());
    }
}

/// The resolved target, checked but not yet written.
enum Target {
    Create {
        path: PathBuf,
        document: Document,
    },
    Append {
        path: PathBuf,
        document: Document,
    },
}

/// Runs compiles against a set of layers and an archive.
pub struct Compiler<'a> {
    layers: &'a Layers,
    archive: &'a Archive,
    sync: &'a dyn RemoteSync,
    remote: Option<&'a Remote>,
}

impl<'a> Compiler<'a> {
    /// A compiler that never syncs to a remote.
    #[must_use]
    pub fn new(layers: &'a Layers, archive: &'a Archive, sync: &'a dyn RemoteSync) -> Self {
        Self {
            layers,
            archive,
            sync,
            remote: None,
        }
    }

    /// Pushes archived copies to `remote`, if one is given.
    #[must_use]
    pub const fn with_remote(mut self, remote: Option<&'a Remote>) -> Self {
        self.remote = remote;
        self
    }

    /// Resolves both layers and checks that `source` ranks below `target`.
    ///
    /// Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownLayer`] or
    /// [`CompileError::InvalidTransition`].
    pub fn validate_transition(
        &self,
        source: &str,
        target: &str,
    ) -> Result<(&'a Layer, &'a Layer), CompileError> {
        let layers = self.layers;
        let source_layer = layers
            .get(source)
            .ok_or_else(|| CompileError::UnknownLayer(source.to_string()))?;
        let target_layer = layers
            .get(target)
            .ok_or_else(|| CompileError::UnknownLayer(target.to_string()))?;

        if source_layer.rank() >= target_layer.rank() {
            return Err(CompileError::InvalidTransition {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        Ok((source_layer, target_layer))
    }

    /// Runs a compile.
    ///
    /// # Errors
    ///
    /// Returns an error, with nothing written, if the plan fails validation,
    /// any document cannot be read, or the target cannot be written. Failures
    /// while processing sources are reported in
    /// [`CompileReport::halted`] instead.
    pub fn compile(&self, plan: &CompilePlan) -> Result<CompileReport, CompileError> {
        let (source_layer, target_layer) =
            self.validate_transition(&plan.source_layer, &plan.target_layer)?;

        let mut names: Vec<String> = plan.sources.iter().cloned().collect();
        names.sort();
        names.dedup();

        let target = Self::resolve_target(target_layer, &plan.destination)?;

        let sources = names
            .iter()
            .map(|name| {
                let path = source_layer.path_of(name);
                Document::load(&path)
                    .map(|document| (name.clone(), path.clone(), document))
                    .map_err(|error| CompileError::Load { path, error })
            })
            .collect::<Result<Vec<_>, _>>()?;

        target_layer
            .ensure_exists()
            .map_err(CompileError::io(target_layer.directory()))?;
        self.archive
            .ensure_exists()
            .map_err(CompileError::io(self.archive.directory()))?;

        let aggregate = Aggregate::of(sources.iter().map(|(_, _, document)| document));
        let (target, created) = Self::write_target(target_layer, target, &aggregate)?;
        tracing::info!(
            "{} {} with {} {}",
            if created { "Created" } else { "Appended to" },
            target.display(),
            sources.len(),
            source_layer.name()
        );

        let link = Link::to(&crate::storage::file_name(&target));
        let mut report = CompileReport {
            target,
            created,
            completed: Vec::with_capacity(sources.len()),
            halted: None,
        };

        let mut remaining = sources.into_iter();
        while let Some((name, path, document)) = remaining.next() {
            match self.retire(&name, &path, document, &link) {
                Ok(outcome) => report.completed.push(outcome),
                Err(mut failure) => {
                    tracing::error!("Compile halted at {name}: {}", failure.error);
                    failure.untouched = remaining.map(|(name, _, _)| name).collect();
                    report.halted = Some(failure);
                    break;
                }
            }
        }

        Ok(report)
    }

    fn resolve_target(layer: &Layer, destination: &Destination) -> Result<Target, CompileError> {
        match destination {
            Destination::Create(title) => {
                let title = title.as_str().trim();
                let filename = sanitize(title);
                if title.is_empty() || strip_extension(&filename).is_empty() {
                    return Err(CompileError::TitleRequired);
                }
                if layer.contains(&filename) {
                    return Err(CompileError::TargetExists(filename));
                }

                let (filename, document) = layer
                    .new_document(title, String::new())
                    .map_err(CompileError::layer(&layer.path_of(&filename)))?;
                Ok(Target::Create {
                    path: layer.path_of(&filename),
                    document,
                })
            }
            Destination::Append(filename) => {
                let path = layer.path_of(filename);
                let document = match Document::load(&path) {
                    Ok(document) if !document.is_dead() => document,
                    Ok(_) | Err(LoadError::NotFound) => {
                        return Err(CompileError::MissingTarget(filename.clone()));
                    }
                    Err(error) => return Err(CompileError::Load { path, error }),
                };
                Ok(Target::Append { path, document })
            }
        }
    }

    fn write_target(
        layer: &Layer,
        target: Target,
        aggregate: &Aggregate,
    ) -> Result<(PathBuf, bool), CompileError> {
        match target {
            Target::Create { path, mut document } => {
                document.body.clone_from(&aggregate.body);
                aggregate.apply_to_new(&mut document);
                layer
                    .write_new(&path, &document)
                    .map_err(CompileError::layer(&path))?;
                Ok((path, true))
            }
            Target::Append { path, mut document } => {
                aggregate.append_to(&mut document);
                document.save(&path).map_err(CompileError::io(&path))?;
                Ok((path, false))
            }
        }
    }

    /// Retires one source, archives it, pushes it and removes it from its
    /// layer, in that order.
    fn retire(
        &self,
        name: &str,
        path: &Path,
        mut document: Document,
        link: &Link,
    ) -> Result<SourceOutcome, BatchFailure> {
        let fail = |retired, archived, error| BatchFailure {
            source: name.to_string(),
            retired,
            archived,
            error,
            untouched: Vec::new(),
        };

        document.metadata_mut().retire(link);
        document
            .save(path)
            .map_err(|error| fail(false, None, CompileError::io(path)(error)))?;
        tracing::info!("Retired {name} into {link}");

        let archived = self.archive.store(path).map_err(|error| {
            fail(
                true,
                None,
                CompileError::ArchiveWriteFailed {
                    path: path.to_path_buf(),
                    error,
                },
            )
        })?;
        tracing::info!("Archived {name}");

        let synced = match self.remote {
            Some(remote) => {
                self.sync
                    .push(&archived, remote)
                    .map_err(|error| fail(true, Some(archived.clone()), error.into()))?;
                tracing::info!("Pushed {name} to {}", remote.host);
                true
            }
            None => false,
        };

        fs::remove_file(path)
            .map_err(|error| fail(true, Some(archived.clone()), CompileError::io(path)(error)))?;
        tracing::info!("Removed {name} from its layer");

        Ok(SourceOutcome {
            name: name.to_string(),
            archived,
            synced,
        })
    }
}
