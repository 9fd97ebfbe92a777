use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for the writing workflow.
///
/// Holds the data root, the ordered layer hierarchy, the archive location,
/// the editor and the optional remote sync destination. It is read once at
/// startup and handed to each component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The root under which layer and archive directories live by default.
    pub home: PathBuf,

    /// The layers, lowest rank first.
    ///
    /// The first layer is the draft layer: new drafts are created there and
    /// unarchived documents are revived into it.
    layers: Vec<LayerConfig>,

    /// Override for the archive directory.
    archive: Option<PathBuf>,

    /// The program used to open documents.
    pub editor: Option<String>,

    /// Word count goal given to new drafts when none is supplied.
    pub default_word_count_goal: u64,

    /// Where archived documents are copied to, if anywhere.
    pub remote: Option<Remote>,
}

/// A single layer in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// The layer name, used on the command line (e.g. `scenes`).
    pub name: String,

    /// The tag written to the `type` field of documents created in the layer
    /// (e.g. `scene`). Defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Override for the layer directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl LayerConfig {
    /// A layer with an explicit tag and the default directory.
    #[must_use]
    pub fn new(name: &str, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: Some(tag.to_string()),
            directory: None,
        }
    }

    /// The tag written to documents in this layer.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.name)
    }
}

/// A remote destination for archived documents, addressed as
/// `user@host:path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    /// The remote login.
    pub user: String,
    /// The remote host name or address.
    pub host: String,
    /// The directory on the remote host.
    pub path: String,
}

impl Remote {
    /// Builds a remote from its parts, returning `None` if any part is empty.
    #[must_use]
    pub fn new(user: &str, host: &str, path: &str) -> Option<Self> {
        if user.is_empty() || host.is_empty() || path.is_empty() {
            return None;
        }
        Some(Self {
            user: user.to_string(),
            host: host.to_string(),
            path: path.to_string(),
        })
    }

    /// The `scp` destination for a file with the given name.
    #[must_use]
    pub fn destination(&self, file_name: &str) -> String {
        format!(
            "{}@{}:{}/{file_name}",
            self.user,
            self.host,
            self.path.trim_end_matches('/')
        )
    }

    /// Loads a remote from a legacy `secrets.json` file.
    ///
    /// The file holds `REMOTE_USER`, `REMOTE_IP` and `REMOTE_PATH` keys.
    /// Missing or empty keys mean no remote is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load_secrets(path: &Path) -> Result<Option<Self>, String> {
        #[derive(Deserialize)]
        struct Secrets {
            #[serde(rename = "REMOTE_USER", default)]
            user: String,
            #[serde(rename = "REMOTE_IP", default)]
            host: String,
            #[serde(rename = "REMOTE_PATH", default)]
            path: String,
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read secrets file: {e}"))?;
        let secrets: Secrets = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse secrets file: {e}"))?;
        Ok(Self::new(&secrets.user, &secrets.host, &secrets.path))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_home(PathBuf::from("."))
    }
}

impl Config {
    /// The default configuration rooted at `home`.
    #[must_use]
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            home,
            layers: default_layers(),
            archive: None,
            editor: None,
            default_word_count_goal: default_word_count_goal(),
            remote: None,
        }
    }

    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The configured layers, lowest rank first.
    #[must_use]
    pub fn layers(&self) -> &[LayerConfig] {
        &self.layers
    }

    /// The directory backing the given layer.
    #[must_use]
    pub fn layer_directory(&self, layer: &LayerConfig) -> PathBuf {
        layer
            .directory
            .clone()
            .unwrap_or_else(|| self.writing_root().join(&layer.name))
    }

    /// The directory holding retired documents.
    #[must_use]
    pub fn archive_directory(&self) -> PathBuf {
        self.archive
            .clone()
            .unwrap_or_else(|| self.writing_root().join("archives"))
    }

    fn writing_root(&self) -> PathBuf {
        self.home.join("writing")
    }
}

fn default_layers() -> Vec<LayerConfig> {
    vec![
        LayerConfig::new("drafts", "draft"),
        LayerConfig::new("scenes", "scene"),
        LayerConfig::new("chapters", "chapter"),
    ]
}

const fn default_word_count_goal() -> u64 {
    500
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_home")]
        home: PathBuf,

        #[serde(default = "default_layers")]
        layers: Vec<LayerConfig>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        archive: Option<PathBuf>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        editor: Option<String>,

        #[serde(default = "default_word_count_goal")]
        default_word_count_goal: u64,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote: Option<Remote>,
    },
}

fn default_home() -> PathBuf {
    PathBuf::from(".")
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                home,
                layers,
                archive,
                editor,
                default_word_count_goal,
                remote,
            } => Self {
                home,
                layers,
                archive,
                editor,
                default_word_count_goal,
                // A partially filled table counts as no remote.
                remote: remote.and_then(|r| Remote::new(&r.user, &r.host, &r.path)),
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            home: config.home,
            layers: config.layers,
            archive: config.archive,
            editor: config.editor,
            default_word_count_goal: config.default_word_count_goal,
            remote: config.remote,
        }
    }
}
