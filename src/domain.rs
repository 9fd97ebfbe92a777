//! Domain models for the writing workflow.
//!
//! This module contains the core domain types: documents and their metadata,
//! the `afterlife` back-link, filename sanitisation and configuration.

/// Documents and their header metadata.
pub mod document;
pub use document::{Document, Metadata, word_count};

mod config;
pub use config::{Config, LayerConfig, Remote};

/// The `[[target]]` back-link stored in a retired document's header.
pub mod link;
pub use link::Link;

mod name;
pub use name::{EXTENSION, sanitize, strip_extension};
