use holloway::{
    GroupKey, Unarchiver,
    lifecycle::{ReviveReport, ReviveStatus},
    ports::SelectMode,
    storage::file_name,
};
use tracing::instrument;

use super::{Workspace, console::Console, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {}

impl Command {
    #[instrument(skip(workspace, console))]
    pub fn run(self, workspace: &Workspace, console: &mut impl Console) -> anyhow::Result<()> {
        let unarchiver = Unarchiver::new(&workspace.layers, &workspace.archive);

        let groups = unarchiver.groups()?;
        if groups.is_empty() {
            println!("{}", "The archive is empty.".dim());
            return Ok(());
        }

        let labelled: Vec<(String, &GroupKey)> = groups
            .iter()
            .map(|(key, members)| (format!("{key} ({} drafts)", members.len()), key))
            .collect();
        let labels: Vec<String> = labelled.iter().map(|(label, _)| label.clone()).collect();

        let chosen = console.select(&labels, SelectMode::Multi, "unarchive > ")?;
        if chosen.is_empty() {
            println!("{}", "Nothing selected.".dim());
            return Ok(());
        }

        let mut failed = 0;
        for (_, key) in labelled.iter().filter(|(label, _)| chosen.contains(label)) {
            let members = groups.get(key).unwrap_or_default();
            let report = unarchiver.revive(members)?;
            failed += print_report(&report);

            let Some(target) = unarchiver.compiled_target(key) else {
                if let Some(name) = key.target() {
                    println!(
                        "{}",
                        format!("INFO: no compiled document named {name} was found").info()
                    );
                }
                continue;
            };

            let name = file_name(&target);
            if console.confirm(&format!("delete compiled {name}?"))? {
                unarchiver.delete_target(&target)?;
                println!("{}", format!("SUCCESS: Deleted {name}").success());
            }
        }

        if failed > 0 {
            anyhow::bail!("{failed} archived documents could not be revived");
        }
        Ok(())
    }
}

/// Prints one line per group member and returns the number that failed.
fn print_report(report: &ReviveReport) -> usize {
    let mut failed = 0;
    for outcome in &report.outcomes {
        match &outcome.status {
            ReviveStatus::Revived(path) => println!(
                "{}",
                format!("SUCCESS: Revived {} to {}", outcome.name, path.display()).success()
            ),
            ReviveStatus::Conflict => eprintln!(
                "{}",
                format!(
                    "{} already exists in the draft layer; left in the archive",
                    outcome.name
                )
                .warning()
            ),
            ReviveStatus::Failed(error) => {
                failed += 1;
                eprintln!(
                    "{}",
                    format!("FAILURE: {}: {error}", outcome.name).failure()
                );
            }
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use holloway::{Config, Document, Link, Metadata, UnarchiveError};
    use tempfile::TempDir;

    use super::*;
    use crate::cli::console::fake::Scripted;

    struct Fixture {
        _tmp: TempDir,
        workspace: Workspace,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let workspace = Workspace::new(Config::with_home(tmp.path().to_path_buf())).unwrap();
            workspace.archive.ensure_exists().unwrap();
            Self {
                _tmp: tmp,
                workspace,
            }
        }

        fn archived(&self, name: &str, target: &str) -> PathBuf {
            let mut document = Document::new(Metadata::for_layer("draft"), "words".to_string());
            document.metadata_mut().retire(&Link::to(target));
            let path = self.workspace.archive.path_of(name);
            document.save(&path).unwrap();
            path
        }
    }

    #[test]
    fn revives_selected_groups_and_offers_deletion() {
        let fixture = Fixture::new();
        fixture.archived("a.md", "the-heist.md");
        fixture.archived("b.md", "the-heist.md");
        fixture.archived("c.md", "elsewhere.md");
        let scenes = fixture.workspace.layers.get("scenes").unwrap();
        let (target, _) = scenes.create("The Heist", String::new()).unwrap();

        let mut console = Scripted::default()
            .then_select(&["the-heist (2 drafts)"])
            .then_answer(true);
        Command {}
            .run(&fixture.workspace, &mut console)
            .unwrap();

        assert_eq!(
            console.offered[0].1,
            ["elsewhere (1 drafts)", "the-heist (2 drafts)"]
        );
        assert_eq!(console.questions, ["delete compiled the-heist.md?"]);
        assert!(!target.exists());

        let drafts = fixture.workspace.layers.drafts();
        assert_eq!(drafts.live_documents().unwrap(), ["a.md", "b.md"]);
        assert!(fixture.workspace.archive.path_of("c.md").exists());
    }

    #[test]
    fn declining_keeps_the_compiled_target() {
        let fixture = Fixture::new();
        fixture.archived("a.md", "ch");
        let chapters = fixture.workspace.layers.get("chapters").unwrap();
        let (target, _) = chapters.create("ch", String::new()).unwrap();

        let mut console = Scripted::default()
            .then_select(&["ch (1 drafts)"])
            .then_answer(false);
        Command {}
            .run(&fixture.workspace, &mut console)
            .unwrap();

        assert!(target.exists());
        assert!(fixture.workspace.layers.drafts().contains("a.md"));
    }

    #[test]
    fn empty_selection_is_a_no_op() {
        let fixture = Fixture::new();
        let archived = fixture.archived("a.md", "ch");
        let mut console = Scripted::default();

        Command {}
            .run(&fixture.workspace, &mut console)
            .unwrap();

        assert!(archived.exists());
        assert!(console.questions.is_empty());
    }

    #[test]
    fn missing_archive_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(Config::with_home(tmp.path().to_path_buf())).unwrap();

        let error = Command {}
            .run(&workspace, &mut Scripted::default())
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<UnarchiveError>(),
            Some(UnarchiveError::ArchiveMissing(_))
        ));
    }
}
