//! The external collaborators the workflows depend on.
//!
//! Each is a small trait with a process-backed implementation. The compile and
//! unarchive engines only see the traits, so tests substitute in-memory fakes.

mod editor;
mod remote;
mod selector;

pub use editor::{CommandEditor, Editor, EditorError};
pub use remote::{RemoteSync, Scp, SyncError};
pub use selector::{Fzf, SelectMode, Selector};
