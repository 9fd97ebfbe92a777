use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use crate::{
    domain::{Config, Document},
    storage::{document_paths, file_name},
};

/// A flat directory of retired documents, kept under their original filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    directory: PathBuf,
}

impl Archive {
    /// Opens the archive at the given directory.
    #[must_use]
    pub const fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    /// Opens the archive described by the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.archive_directory())
    }

    /// The archive directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The archived path for a document with the given filename.
    #[must_use]
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.directory.join(filename)
    }

    /// Creates the archive directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.directory)
    }

    /// Copies a document into the archive under its original filename.
    ///
    /// An archived copy with the same name is replaced. Returns the archived
    /// path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be copied.
    pub fn store(&self, source: &Path) -> io::Result<PathBuf> {
        let destination = self.path_of(&file_name(source));
        fs::copy(source, &destination)?;
        tracing::debug!(
            "Copied {} to {}",
            source.display(),
            destination.display()
        );
        Ok(destination)
    }

    /// Groups every archived document by the target its `afterlife` link
    /// names.
    ///
    /// Documents that cannot be read, or whose link cannot be parsed, fall
    /// into [`GroupKey::Orphans`]. Grouping is computed afresh on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive directory cannot be read.
    pub fn groups(&self) -> io::Result<ArchiveGroups> {
        let mut groups: BTreeMap<GroupKey, Vec<PathBuf>> = BTreeMap::new();

        for path in document_paths(&self.directory)? {
            let key = match Document::load(&path) {
                Ok(document) => document
                    .metadata()
                    .afterlife_link()
                    .map_or(GroupKey::Orphans, |link| {
                        GroupKey::Target(link.target().to_string())
                    }),
                Err(e) => {
                    tracing::warn!("Unreadable archived document {}: {e}", path.display());
                    GroupKey::Orphans
                }
            };
            groups.entry(key).or_default().push(path);
        }

        Ok(ArchiveGroups(groups))
    }
}

/// The key an archived document is grouped under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// Documents compiled into the named target.
    Target(String),
    /// Documents with no parseable `afterlife` link.
    Orphans,
}

impl GroupKey {
    /// The target base name, unless this is the orphan group.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Target(name) => Some(name),
            Self::Orphans => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(name) => f.write_str(name),
            Self::Orphans => f.write_str("ORPHANS"),
        }
    }
}

/// Archived documents partitioned by [`GroupKey`].
///
/// Targets are ordered by name with the orphan group last; members are ordered
/// by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveGroups(BTreeMap<GroupKey, Vec<PathBuf>>);

impl ArchiveGroups {
    /// Whether the archive holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The members of a group.
    #[must_use]
    pub fn get(&self, key: &GroupKey) -> Option<&[PathBuf]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Iterates over the groups in order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[PathBuf])> {
        self.0.iter().map(|(key, paths)| (key, paths.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{Link, Metadata};

    fn archived(archive: &Archive, filename: &str, afterlife: Option<&str>) -> PathBuf {
        let mut document = Document::new(Metadata::for_layer("draft"), "words".to_string());
        if let Some(target) = afterlife {
            document.metadata_mut().retire(&Link::to(target));
        }
        let path = archive.path_of(filename);
        document.save(&path).unwrap();
        path
    }

    #[test]
    fn groups_by_afterlife_target() {
        let tmp = TempDir::new().unwrap();
        let archive = Archive::new(tmp.path().to_path_buf());

        let a = archived(&archive, "a.md", Some("chapter-one"));
        let b = archived(&archive, "b.md", Some("chapter-one"));
        let c = archived(&archive, "c.md", Some("scene-two"));
        let d = archived(&archive, "d.md", None);
        fs::write(archive.path_of("e.md"), "--- broken").unwrap();

        let groups = archive.groups().unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups.get(&GroupKey::Target("chapter-one".into())).unwrap(),
            [a, b]
        );
        assert_eq!(
            groups.get(&GroupKey::Target("scene-two".into())).unwrap(),
            [c]
        );
        assert_eq!(
            groups.get(&GroupKey::Orphans).unwrap(),
            [d, archive.path_of("e.md")]
        );
    }

    #[test]
    fn orphans_sort_last() {
        let tmp = TempDir::new().unwrap();
        let archive = Archive::new(tmp.path().to_path_buf());
        archived(&archive, "a.md", None);
        archived(&archive, "b.md", Some("zebra"));

        let keys: Vec<_> = archive
            .groups()
            .unwrap()
            .iter()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(keys, ["zebra", "ORPHANS"]);
    }

    #[test]
    fn store_copies_without_removing_the_source() {
        let tmp = TempDir::new().unwrap();
        let archive = Archive::new(tmp.path().join("archives"));
        archive.ensure_exists().unwrap();
        let source = tmp.path().join("draft.md");
        fs::write(&source, "---\n---\n\nhello").unwrap();

        let stored = archive.store(&source).unwrap();

        assert_eq!(stored, archive.path_of("draft.md"));
        assert_eq!(fs::read(&stored).unwrap(), fs::read(&source).unwrap());
        assert!(source.exists());
    }

    #[test]
    fn store_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let archive = Archive::new(tmp.path().join("absent"));
        let source = tmp.path().join("draft.md");
        fs::write(&source, "x").unwrap();

        assert!(archive.store(&source).is_err());
    }
}
