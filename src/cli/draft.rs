use std::path::{Path, PathBuf};

use holloway::{Document, Layer, ports::Editor, sanitize, storage::file_name};
use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The draft name (defaults to today's date)
    name: Option<String>,

    /// Word count goal for a new draft
    goal: Option<String>,
}

impl Command {
    #[instrument(skip(workspace, editor))]
    pub fn run(self, workspace: &Workspace, editor: &dyn Editor) -> anyhow::Result<()> {
        let drafts = workspace.layers.drafts();
        let (name, goal) = self.resolve()?;
        let goal = goal.unwrap_or(workspace.config.default_word_count_goal);

        let path = prepare(drafts, &name, goal)?;
        editor.open(&path)?;

        match refresh_word_count(&path) {
            Ok(count) => println!(
                "{}",
                format!("SUCCESS: {} has {count} words", file_name(&path)).success()
            ),
            // The draft itself is fine; only the count is stale.
            Err(e) => eprintln!(
                "{}",
                format!("FAILURE: could not update word count: {e}").failure()
            ),
        }
        Ok(())
    }

    /// The draft name, falling back to today's date, and the parsed goal.
    fn resolve(self) -> anyhow::Result<(String, Option<u64>)> {
        let goal = self
            .goal
            .map(|goal| {
                goal.parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("word count goal must be a number, got '{goal}'"))
            })
            .transpose()?;
        let name = self
            .name
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

        Ok((name, goal))
    }
}

/// Makes sure a draft exists for `name`, creating it if it is missing or
/// empty, and returns its path.
fn prepare(drafts: &Layer, name: &str, goal: u64) -> anyhow::Result<PathBuf> {
    let path = drafts.path_of(&sanitize(name));
    let has_content = std::fs::metadata(&path).is_ok_and(|meta| meta.len() > 0);
    if has_content {
        tracing::debug!("Opening existing draft {}", path.display());
        return Ok(path);
    }

    let (_, mut document) = drafts.new_document(name, String::new())?;
    document.metadata_mut().word_count_goal = goal;
    drafts.ensure_exists()?;
    document.save(&path)?;
    tracing::info!("Created draft {}", path.display());
    Ok(path)
}

fn refresh_word_count(path: &Path) -> anyhow::Result<u64> {
    let mut document = Document::load(path)?;
    let count = document.refresh_word_count();
    document.save(path)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, fs};

    use holloway::{Config, ports::EditorError};
    use tempfile::tempdir;
    use test_case::test_case;

    use super::*;

    /// Writes a fixed body into whatever it opens.
    #[derive(Default)]
    struct Typist {
        body: &'static str,
        opened: RefCell<Vec<PathBuf>>,
    }

    impl Editor for Typist {
        fn open(&self, path: &Path) -> Result<(), EditorError> {
            self.opened.borrow_mut().push(path.to_path_buf());
            let mut document = Document::load(path).unwrap();
            document.set_body(self.body.to_string());
            document.save(path).unwrap();
            Ok(())
        }
    }

    fn command(name: Option<&str>, goal: Option<&str>) -> Command {
        Command {
            name: name.map(str::to_string),
            goal: goal.map(str::to_string),
        }
    }

    #[test_case(Some("Morning Pages"), None => ("Morning Pages".to_string(), None); "name only")]
    #[test_case(None, None => (chrono::Local::now().format("%Y-%m-%d").to_string(), None); "no arguments")]
    #[test_case(Some("2024"), None => ("2024".to_string(), None); "numeric name alone")]
    #[test_case(Some("notes"), Some("300") => ("notes".to_string(), Some(300)); "name and goal")]
    #[test_case(Some("2024"), Some("10") => ("2024".to_string(), Some(10)); "numeric name with goal")]
    fn positionals_are_resolved(name: Option<&str>, goal: Option<&str>) -> (String, Option<u64>) {
        command(name, goal).resolve().unwrap()
    }

    #[test]
    fn non_numeric_goal_is_rejected() {
        assert!(command(Some("notes"), Some("lots")).resolve().is_err());
    }

    #[test]
    fn missing_draft_is_created_with_defaults() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::new(Config::with_home(tmp.path().to_path_buf())).unwrap();
        let editor = Typist {
            body: "three little words",
            ..Typist::default()
        };

        command(Some("Morning Pages"), Some("750"))
            .run(&workspace, &editor)
            .unwrap();

        let path = workspace.layers.drafts().path_of("morning-pages.md");
        assert_eq!(editor.opened.borrow().as_slice(), [path.clone()]);

        let document = Document::load(&path).unwrap();
        let metadata = document.metadata();
        assert_eq!(metadata.aliases, ["Morning Pages"]);
        assert!(metadata.tags.contains("draft"));
        assert!(!document.is_dead());
        assert_eq!(metadata.word_count_goal, 750);
        assert_eq!(metadata.word_count, 3);
    }

    #[test]
    fn existing_draft_is_opened_untouched() {
        let tmp = tempdir().unwrap();
        let mut config = Config::with_home(tmp.path().to_path_buf());
        config.default_word_count_goal = 42;
        let workspace = Workspace::new(config).unwrap();
        let drafts = workspace.layers.drafts();
        let (path, _) = drafts.create("notes", "old words".to_string()).unwrap();

        let editor = Typist {
            body: "one two three four",
            ..Typist::default()
        };
        command(Some("notes"), Some("999"))
            .run(&workspace, &editor)
            .unwrap();

        let document = Document::load(&path).unwrap();
        assert_eq!(document.body(), "one two three four");
        assert_eq!(document.metadata().word_count, 4);
        assert_eq!(document.metadata().word_count_goal, 0);
    }

    #[test]
    fn empty_file_is_replaced_by_a_new_draft() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::new(Config::with_home(tmp.path().to_path_buf())).unwrap();
        let drafts = workspace.layers.drafts();
        drafts.ensure_exists().unwrap();
        fs::write(drafts.path_of("blank.md"), "").unwrap();

        let path = prepare(drafts, "blank", 500).unwrap();

        let document = Document::load(&path).unwrap();
        assert_eq!(document.metadata().word_count_goal, 500);
        assert!(document.metadata().aliases.is_empty());
    }

    #[test]
    fn broken_draft_does_not_fail_the_command() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::new(Config::with_home(tmp.path().to_path_buf())).unwrap();
        let drafts = workspace.layers.drafts();
        drafts.ensure_exists().unwrap();
        fs::write(drafts.path_of("broken.md"), "no header at all").unwrap();

        struct Nothing;
        impl Editor for Nothing {
            fn open(&self, _path: &Path) -> Result<(), EditorError> {
                Ok(())
            }
        }

        command(Some("broken"), None).run(&workspace, &Nothing).unwrap();
        assert_eq!(
            fs::read_to_string(drafts.path_of("broken.md")).unwrap(),
            "no header at all"
        );
    }
}
