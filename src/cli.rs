use std::{
    env,
    path::{Path, PathBuf},
};

mod compile;
mod console;
mod draft;
mod terminal;
mod unarchive;

use clap::ArgAction;
use console::Terminal;
use holloway::{
    Archive, Config, Layers, Remote,
    ports::{CommandEditor, Scp},
};

const APP_NAME: &str = "holloway-deck";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let workspace = Workspace::load(self.config)?;
        self.command.run(&workspace)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Create a draft, or open it if it already exists
    Draft(draft::Command),

    /// Fold documents from a lower layer into a document in a higher layer
    ///
    /// With no arguments both layers are picked interactively.
    Compile(compile::Command),

    /// Move archived documents back into the draft layer
    Unarchive(unarchive::Command),
}

impl Command {
    fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        let mut terminal = Terminal::default();
        let editor = workspace.editor();

        match self {
            Self::Draft(command) => command.run(workspace, &editor),
            Self::Compile(command) => {
                command.run(workspace, &mut terminal, &editor, &Scp::default())
            }
            Self::Unarchive(command) => command.run(workspace, &mut terminal),
        }
    }
}

/// The configuration and stores every command works against, resolved once at
/// startup.
#[derive(Debug)]
pub struct Workspace {
    config: Config,
    layers: Layers,
    archive: Archive,
}

impl Workspace {
    /// Builds the stores described by `config`.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let layers = Layers::from_config(&config)?;
        let archive = Archive::from_config(&config);
        Ok(Self {
            config,
            layers,
            archive,
        })
    }

    /// Reads the configuration from `path`, or from the default location, and
    /// fills in anything the environment provides.
    fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        tracing::debug!("Using configuration at {}", path.display());

        let mut config = if path.exists() {
            Config::load(&path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            Config::default()
        };

        config.home = resolve_home(&config.home, var("HOLLOWAY_HOME"), default_data_home());

        if config.remote.is_none() {
            let secrets = path.with_file_name("secrets.json");
            if secrets.exists() {
                config.remote =
                    Remote::load_secrets(&secrets).map_err(|e| anyhow::anyhow!("{e}"))?;
            }
        }

        Self::new(config)
    }

    /// The editor to open documents with.
    fn editor(&self) -> CommandEditor {
        let program = self
            .config
            .editor
            .clone()
            .or_else(|| env::var("VISUAL").ok().filter(|v| !v.is_empty()))
            .or_else(|| env::var("EDITOR").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "nvim".to_string());
        CommandEditor::new(&program)
    }
}

/// Picks the data root.
///
/// `$HOLLOWAY_HOME` wins. Otherwise an absolute `home` from the configuration
/// is used as is, and a relative one is taken relative to the default data
/// directory.
fn resolve_home(configured: &Path, env_home: Option<PathBuf>, data_home: PathBuf) -> PathBuf {
    if let Some(home) = env_home {
        return home;
    }
    if configured.is_absolute() {
        configured.to_path_buf()
    } else if configured == Path::new(".") {
        data_home
    } else {
        data_home.join(configured)
    }
}

fn default_config_path() -> PathBuf {
    var("HOLLOWAY_CONFIG_DIR")
        .or_else(|| var("XDG_CONFIG_HOME").map(|dir| dir.join(APP_NAME)))
        .unwrap_or_else(|| user_home().join(".config").join(APP_NAME))
        .join("config.toml")
}

fn default_data_home() -> PathBuf {
    var("HOLLOWAY_DATA_HOME")
        .or_else(|| var("XDG_DATA_HOME").map(|dir| dir.join(APP_NAME)))
        .unwrap_or_else(|| user_home().join(".local").join("share").join(APP_NAME))
}

fn user_home() -> PathBuf {
    var("HOME").unwrap_or_else(|| PathBuf::from("."))
}

/// A non-empty environment variable, as a path.
fn var(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn environment_home_wins() {
        let home = resolve_home(
            Path::new("/srv/writing"),
            Some(PathBuf::from("/env/home")),
            PathBuf::from("/data"),
        );
        assert_eq!(home, PathBuf::from("/env/home"));
    }

    #[test]
    fn configured_home_is_resolved_against_data_home() {
        let data = PathBuf::from("/data");
        assert_eq!(
            resolve_home(Path::new("/srv/writing"), None, data.clone()),
            PathBuf::from("/srv/writing")
        );
        assert_eq!(resolve_home(Path::new("."), None, data.clone()), data);
        assert_eq!(
            resolve_home(Path::new("novel"), None, data),
            PathBuf::from("/data/novel")
        );
    }

    #[test]
    fn secrets_fill_in_a_missing_remote() {
        let tmp = tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        let mut config = Config::with_home(tmp.path().join("home"));
        config.save(&config_path).unwrap();
        std::fs::write(
            tmp.path().join("secrets.json"),
            r#"{"REMOTE_USER": "me", "REMOTE_IP": "10.0.0.2", "REMOTE_PATH": "/backup"}"#,
        )
        .unwrap();

        let workspace = Workspace::load(Some(config_path.clone())).unwrap();
        let remote = workspace.config.remote.as_ref().unwrap();
        assert_eq!(remote.destination("a.md"), "me@10.0.0.2:/backup/a.md");

        config.remote = Remote::new("you", "example.org", "/srv");
        config.save(&config_path).unwrap();
        let workspace = Workspace::load(Some(config_path)).unwrap();
        assert_eq!(workspace.config.remote.unwrap().user, "you");
    }

    #[test]
    fn configured_editor_is_preferred() {
        let tmp = tempdir().unwrap();
        let mut config = Config::with_home(tmp.path().to_path_buf());
        config.editor = Some("hx".to_string());

        let workspace = Workspace::new(config).unwrap();
        assert_eq!(workspace.editor().program(), "hx");
    }
}
