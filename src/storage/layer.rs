//! The ordered hierarchy of layers.
//!
//! Each [`Layer`] is bound to a directory holding one markdown file per
//! document. [`Layers`] keeps them in rank order, lowest (drafts) first.

use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{
    domain::{Config, Document, Metadata, sanitize, strip_extension},
    storage::{document_paths, file_name, markdown::MarkdownDocument},
};

/// A named rank in the hierarchy, bound to a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    name: String,
    tag: String,
    rank: usize,
    directory: PathBuf,
}

impl Layer {
    /// Creates a layer at the given rank.
    #[must_use]
    pub fn new(name: &str, tag: &str, rank: usize, directory: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            rank,
            directory,
        }
    }

    /// The layer name (e.g. `scenes`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag written to the `type` field of new documents (e.g. `scene`).
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Position in the hierarchy; 0 is the lowest.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// The directory holding this layer's documents.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The path of the document with the given filename.
    #[must_use]
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.directory.join(filename)
    }

    /// Whether a file with the given name exists in the layer, dead or alive.
    #[must_use]
    pub fn contains(&self, filename: &str) -> bool {
        self.path_of(filename).is_file()
    }

    /// Creates the layer directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.directory)
    }

    /// Lists the filenames of live documents, sorted case-insensitively.
    ///
    /// Dead documents are skipped, as are files whose header cannot be read.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer directory cannot be read.
    pub fn live_documents(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();

        for path in document_paths(&self.directory)? {
            match MarkdownDocument::load(&path).map(Document::from) {
                Ok(document) if document.is_dead() => {
                    tracing::debug!("Skipping dead document {}", path.display());
                }
                Ok(_) => names.push(file_name(&path)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable document {}: {e}", path.display());
                }
            }
        }

        names.sort_by_cached_key(|name| name.to_lowercase());
        Ok(names)
    }

    /// Builds a new live document for this layer without touching the disk.
    ///
    /// Returns the sanitized filename and the document. If sanitizing the title
    /// changed it, the title is kept as an alias.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::InvalidName`] if the title has no characters that
    /// survive sanitization.
    pub fn new_document(&self, title: &str, body: String) -> Result<(String, Document), LayerError> {
        let filename = sanitize(title);
        if strip_extension(&filename).is_empty() {
            return Err(LayerError::InvalidName(title.to_string()));
        }

        let mut metadata = Metadata::for_layer(&self.tag);
        if title != filename && title != strip_extension(&filename) {
            metadata.aliases.push(title.to_string());
        }

        Ok((filename, Document::new(metadata, body)))
    }

    /// Creates a new document in this layer.
    ///
    /// The layer directory is created if needed. An existing file is never
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is unusable, a document with the same
    /// filename already exists, or the file cannot be written.
    pub fn create(&self, title: &str, body: String) -> Result<(PathBuf, Document), LayerError> {
        let (filename, document) = self.new_document(title, body)?;
        let path = self.path_of(&filename);
        self.write_new(&path, &document)?;
        tracing::info!("Created {} in {}", filename, self.name);
        Ok((path, document))
    }

    /// Writes a document to a path that must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::AlreadyExists`] if the path is taken.
    pub fn write_new(&self, path: &Path, document: &Document) -> Result<(), LayerError> {
        self.ensure_exists()?;

        // `create_new` refuses to clobber an existing file.
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => file.flush()?,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LayerError::AlreadyExists(file_name(path)));
            }
            Err(e) => return Err(e.into()),
        }

        document.save(path)?;
        Ok(())
    }
}

/// Errors raised by the layer registry.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// No layers are configured.
    #[error("no layers configured")]
    Empty,
    /// Two layers share a name.
    #[error("layer '{0}' is configured more than once")]
    Duplicate(String),
    /// A document with this filename already exists in the layer.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// The title sanitizes to an empty name.
    #[error("'{0}' does not contain any usable characters for a filename")]
    InvalidName(String),
    /// A filesystem operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The layers, held in a fixed total order by rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layers {
    layers: Vec<Layer>,
}

impl Layers {
    /// Builds the registry from layers given lowest rank first.
    ///
    /// Ranks are reassigned from the order given.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no layers or two share a name.
    pub fn new(layers: Vec<Layer>) -> Result<Self, LayerError> {
        if layers.is_empty() {
            return Err(LayerError::Empty);
        }

        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.name.clone()) {
                return Err(LayerError::Duplicate(layer.name.clone()));
            }
        }

        let layers = layers
            .into_iter()
            .enumerate()
            .map(|(rank, layer)| Layer { rank, ..layer })
            .collect();

        Ok(Self { layers })
    }

    /// Builds the registry described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured layers are empty or duplicated.
    pub fn from_config(config: &Config) -> Result<Self, LayerError> {
        Self::new(
            config
                .layers()
                .iter()
                .enumerate()
                .map(|(rank, layer)| {
                    Layer::new(
                        &layer.name,
                        layer.tag(),
                        rank,
                        config.layer_directory(layer),
                    )
                })
                .collect(),
        )
    }

    /// Looks up a layer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// The lowest layer, where drafts are written and revived.
    #[must_use]
    pub fn drafts(&self) -> &Layer {
        &self.layers[0]
    }

    /// All layers, lowest rank first.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// All layer names, lowest rank first.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(Layer::name).collect()
    }
}
