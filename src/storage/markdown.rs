use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{Document, Metadata, word_count};

/// The line that opens and closes the header block.
const MARKER: &str = "---";

/// A document serialized in markdown format with YAML frontmatter.
#[derive(Debug, Clone)]
pub struct MarkdownDocument {
    frontmatter: FrontMatter,
    body: String,
}

impl MarkdownDocument {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let frontmatter = serde_yaml::to_string(&self.frontmatter)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writer.write_all(format!("{MARKER}\n{frontmatter}{MARKER}\n\n{}", self.body).as_bytes())
    }

    /// Parses a document from its full text.
    ///
    /// The text must contain exactly two marker lines, the first of which opens
    /// the file. The body is everything after the second marker, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::HeaderCountMismatch`] if the marker lines are
    /// missing, misplaced or more than two, and
    /// [`LoadError::HeaderParseFailure`] if the header is not valid YAML.
    pub fn parse(content: &str) -> Result<Self, LoadError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let lines: Vec<&str> = content.lines().collect();

        let markers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim_end() == MARKER)
            .map(|(index, _)| index)
            .collect();

        let &[open, close] = markers.as_slice() else {
            return Err(LoadError::HeaderCountMismatch(markers.len()));
        };
        if open != 0 {
            return Err(LoadError::HeaderCountMismatch(markers.len()));
        }

        let header = lines[open + 1..close].join("\n");
        let body = lines[close + 1..].join("\n").trim().to_string();

        let frontmatter = if header.trim().is_empty() {
            FrontMatter::default()
        } else {
            serde_yaml::from_str(&header)?
        };

        Ok(Self { frontmatter, body })
    }

    /// Reads a document from the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let mut file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Self::parse(&content)
    }

    /// Writes the document to a specific file path.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()
    }
}

/// Errors that can occur when loading a document from markdown.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document file was not found.
    #[error("document not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to read document: {0}")]
    Io(#[from] io::Error),
    /// The file does not hold exactly one header delimited by two marker
    /// lines.
    #[error("expected exactly two '---' lines delimiting one header, found {0}")]
    HeaderCountMismatch(usize),
    /// The YAML header could not be parsed.
    #[error("failed to parse header: {0}")]
    HeaderParseFailure(#[from] serde_yaml::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
struct FrontMatter {
    #[serde(default, deserialize_with = "null_as_default")]
    aliases: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    afterlife: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_dead: bool,
    #[serde(rename = "type", default, deserialize_with = "tag_set")]
    tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "lenient_summary")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    word_count_goal: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    word_count: u64,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a scalar as text; anything else reads as empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(&serde_yaml::Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_summary<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(&serde_yaml::Value::deserialize(deserializer)?).filter(|s| !s.is_empty()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Bool(b) => b,
        serde_yaml::Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Reads a count; negative, non-numeric or missing values read as zero.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(count_from_value(&serde_yaml::Value::deserialize(deserializer)?))
}

/// Accepts either a list of tags or a single tag.
fn tag_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(&other).into_iter().collect(),
    })
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from_value(value: &serde_yaml::Value) -> u64 {
    match value {
        serde_yaml::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        serde_yaml::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

impl From<Document> for MarkdownDocument {
    fn from(document: Document) -> Self {
        let Document {
            metadata:
                Metadata {
                    aliases,
                    afterlife,
                    is_dead,
                    tags,
                    summary,
                    word_count: _,
                    word_count_goal,
                    extra,
                },
            body,
        } = document;

        Self {
            frontmatter: FrontMatter {
                aliases,
                afterlife,
                is_dead,
                tags,
                summary,
                word_count_goal,
                // Always written from the body, whatever the header said.
                word_count: word_count(&body),
                extra,
            },
            body,
        }
    }
}

impl From<MarkdownDocument> for Document {
    fn from(document: MarkdownDocument) -> Self {
        let MarkdownDocument {
            frontmatter:
                FrontMatter {
                    aliases,
                    afterlife,
                    is_dead,
                    tags,
                    summary,
                    word_count_goal,
                    word_count,
                    extra,
                },
            body,
        } = document;

        Self {
            metadata: Metadata {
                aliases,
                afterlife,
                is_dead,
                tags,
                summary,
                word_count,
                word_count_goal,
                extra,
            },
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::Link;

    #[test]
    fn markdown_round_trip() {
        let input = r"---
aliases:
- Scene One
afterlife: ''
is_dead: false
type:
- scene
summary: The storm breaks.
word_count_goal: 1000
word_count: 4
---

It was a night.";

        let document = MarkdownDocument::parse(input).unwrap();

        let mut bytes: Vec<u8> = vec![];
        document.write(&mut bytes).unwrap();

        let actual = String::from_utf8(bytes).unwrap();
        assert_eq!(input, &actual);
    }

    #[test]
    fn reads_legacy_headers() {
        let content = r#"---
aliases: []
afterlife: '"[[chapter-one]]"'
is_dead: true
type: [draft]
summary:
word_count_goal: '500'
word_count: lots
---

Body text here
"#;

        let document: Document = MarkdownDocument::parse(content).unwrap().into();

        assert!(document.is_dead());
        assert_eq!(
            document.metadata().afterlife_link(),
            Some(Link::to("chapter-one"))
        );
        assert_eq!(document.metadata().summary, None);
        assert_eq!(document.metadata().word_count_goal, 500);
        assert_eq!(document.metadata().word_count, 0);
        assert!(document.metadata().tags.contains("draft"));
        assert_eq!(document.body(), "Body text here");
    }

    #[test]
    fn null_fields_read_as_empty() {
        let content = "---\naliases:\nafterlife:\nis_dead:\ntype:\n---\n";
        let document: Document = MarkdownDocument::parse(content).unwrap().into();

        assert!(document.metadata().aliases.is_empty());
        assert_eq!(document.metadata().afterlife(), "");
        assert!(!document.is_dead());
        assert!(document.metadata().tags.is_empty());
        assert_eq!(document.body(), "");
    }

    #[test]
    fn unknown_fields_survive_a_save() {
        let content = "---\nis_dead: false\nmood: grim\nword_count: 1\n---\n\nword";
        let document: Document = MarkdownDocument::parse(content).unwrap().into();

        let mut bytes = vec![];
        MarkdownDocument::from(document).write(&mut bytes).unwrap();
        let written = String::from_utf8(bytes).unwrap();

        assert!(written.contains("mood: grim"));
    }

    #[test]
    fn missing_header_is_a_count_mismatch() {
        let result = MarkdownDocument::parse("just words");
        assert!(matches!(result, Err(LoadError::HeaderCountMismatch(0))));
    }

    #[test]
    fn unterminated_header_is_a_count_mismatch() {
        let result = MarkdownDocument::parse("---\nis_dead: false\nno closing marker");
        assert!(matches!(result, Err(LoadError::HeaderCountMismatch(1))));
    }

    #[test]
    fn marker_in_body_is_a_count_mismatch() {
        let result = MarkdownDocument::parse("---\nis_dead: false\n---\n\nabove\n---\nbelow");
        assert!(matches!(result, Err(LoadError::HeaderCountMismatch(3))));
    }

    #[test]
    fn header_must_open_the_file() {
        let result = MarkdownDocument::parse("preamble\n---\nis_dead: false\n---\nbody");
        assert!(matches!(result, Err(LoadError::HeaderCountMismatch(2))));
    }

    #[test]
    fn invalid_yaml() {
        let result = MarkdownDocument::parse("---\ninvalid: yaml: structure:\n---\nbody");
        assert!(matches!(result, Err(LoadError::HeaderParseFailure(_))));
    }

    #[test]
    fn save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("scene.md");

        let mut metadata = Metadata::for_layer("scene");
        metadata.aliases.push("The Scene".to_string());
        metadata.summary = Some("short".to_string());
        let document = Document::new(metadata, "one two three".to_string());

        document.save(&path).unwrap();
        let loaded = Document::load(&path).unwrap();

        assert_eq!(loaded, document);
    }

    #[test]
    fn load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Document::load(&temp_dir.path().join("missing.md"));
        assert!(matches!(result, Err(LoadError::NotFound)));
    }
}
