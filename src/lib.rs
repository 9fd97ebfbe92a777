//! Layered Plain-Text Writing
//!
//! Documents are markdown files with a YAML header, stored in one directory per
//! layer (draft, scene, chapter, ...). Lower-layer documents are compiled into
//! higher-layer documents and archived; archived documents can be revived.

pub mod domain;
pub use domain::{Config, Document, Link, Metadata, Remote, sanitize};

/// Filesystem storage for layers and the archive.
pub mod storage;
pub use storage::{Archive, ArchiveGroups, GroupKey, Layer, Layers, LoadError};

/// The compile and unarchive workflows.
pub mod lifecycle;
pub use lifecycle::{
    CompileError, CompilePlan, CompileReport, Compiler, Destination, UnarchiveError, Unarchiver,
};

/// Interfaces to external collaborators (selection, editor, remote sync).
pub mod ports;
