use std::{collections::BTreeSet, path::Path};

#[doc(hidden)]
pub use crate::storage::markdown::LoadError;
use crate::{domain::Link, storage::markdown::MarkdownDocument};

/// A document is a unit of writing: a header of metadata and a free-form body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) metadata: Metadata,
    pub(crate) body: String,
}

/// The header fields of a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    /// Alternate names or titles.
    pub aliases: Vec<String>,
    /// Raw `afterlife` text. Kept private so it only changes together with
    /// `is_dead`.
    pub(crate) afterlife: String,
    pub(crate) is_dead: bool,
    /// Layer tags the document belongs to.
    pub tags: BTreeSet<String>,
    /// A short summary, if any.
    pub summary: Option<String>,
    /// Number of whitespace-delimited tokens in the body.
    pub word_count: u64,
    /// Target word count.
    pub word_count_goal: u64,
    /// Header keys this tool does not interpret; preserved on save.
    pub(crate) extra: serde_yaml::Mapping,
}

impl Metadata {
    /// Metadata for a new, live document tagged with the given layer tag.
    #[must_use]
    pub fn for_layer(tag: &str) -> Self {
        Self {
            tags: BTreeSet::from([tag.to_string()]),
            ..Self::default()
        }
    }

    /// Whether the document has been consumed by a compile.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// The raw `afterlife` text, empty when the document is not retired.
    #[must_use]
    pub fn afterlife(&self) -> &str {
        &self.afterlife
    }

    /// The document this one was compiled into, if the `afterlife` text
    /// holds a parseable link.
    #[must_use]
    pub fn afterlife_link(&self) -> Option<Link> {
        Link::parse(&self.afterlife)
    }

    /// Marks the document as consumed by a compile into `target`.
    pub fn retire(&mut self, target: &Link) {
        self.is_dead = true;
        self.afterlife = target.to_string();
    }

    /// Returns the document to the living.
    ///
    /// `afterlife` is set to the empty string rather than removed.
    pub fn revive(&mut self) {
        self.is_dead = false;
        self.afterlife.clear();
    }
}

impl Document {
    /// Creates a live document with the given metadata and body.
    ///
    /// The word count is derived from the body.
    #[must_use]
    pub fn new(mut metadata: Metadata, body: String) -> Self {
        metadata.word_count = word_count(&body);
        Self { metadata, body }
    }

    /// The document body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The header metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable access to the header metadata.
    pub const fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Replaces the body and recomputes the word count.
    pub fn set_body(&mut self, body: String) {
        self.metadata.word_count = word_count(&body);
        self.body = body;
    }

    /// Recomputes the word count from the current body.
    ///
    /// Returns the new count.
    pub fn refresh_word_count(&mut self) -> u64 {
        self.metadata.word_count = word_count(&self.body);
        self.metadata.word_count
    }

    /// Whether the document has been consumed by a compile.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.metadata.is_dead
    }

    /// Reads a document from the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its header is malformed.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Ok(MarkdownDocument::load(path)?.into())
    }

    /// Writes the document to the given path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        MarkdownDocument::from(self.clone()).save(path)
    }
}

/// Counts the whitespace-delimited tokens in `text`.
#[must_use]
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
