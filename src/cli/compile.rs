use holloway::{
    CompilePlan, CompileReport, Compiler, Destination, Layer,
    ports::{Editor, RemoteSync, SelectMode},
};
use nonempty::NonEmpty;
use tracing::instrument;

use super::{Workspace, console::Console, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The layer to take documents from
    #[arg(requires = "target")]
    source: Option<String>,

    /// The layer to compile into
    target: Option<String>,

    /// Don't offer to open the compiled document
    #[arg(long)]
    no_open: bool,
}

impl Command {
    #[instrument(skip(workspace, console, editor, sync))]
    pub fn run(
        self,
        workspace: &Workspace,
        console: &mut impl Console,
        editor: &dyn Editor,
        sync: &dyn RemoteSync,
    ) -> anyhow::Result<()> {
        let compiler = Compiler::new(&workspace.layers, &workspace.archive, sync)
            .with_remote(workspace.config.remote.as_ref());

        let Some((source, target)) = self.choose_layers(workspace, console)? else {
            println!("{}", "Nothing selected.".dim());
            return Ok(());
        };
        let (source_layer, target_layer) = compiler.validate_transition(&source, &target)?;

        source_layer.ensure_exists()?;
        let candidates = source_layer.live_documents()?;
        if candidates.is_empty() {
            anyhow::bail!("No live documents in {}", source_layer.name());
        }

        let prompt = format!("{} > ", source_layer.name());
        let selected = console.select(&candidates, SelectMode::Multi, &prompt)?;
        let Some(sources) = NonEmpty::from_vec(selected) else {
            println!("{}", "Nothing selected.".dim());
            return Ok(());
        };

        let Some(destination) = choose_destination(target_layer, console)? else {
            println!("{}", "Nothing selected.".dim());
            return Ok(());
        };

        let plan = CompilePlan {
            source_layer: source,
            target_layer: target,
            sources,
            destination,
        };
        let report = compiler.compile(&plan)?;
        print_report(&report, source_layer)?;

        if !self.no_open && console.confirm(&format!("open {}?", report.target_name()))? {
            editor.open(&report.target)?;
        }
        Ok(())
    }

    /// The source and target layer names, from the arguments or the operator.
    fn choose_layers(
        &self,
        workspace: &Workspace,
        console: &mut impl Console,
    ) -> anyhow::Result<Option<(String, String)>> {
        if let (Some(source), Some(target)) = (&self.source, &self.target) {
            return Ok(Some((source.clone(), target.clone())));
        }

        let layers = &workspace.layers;
        let names: Vec<String> = layers.names().into_iter().map(str::to_string).collect();
        let Some(source) = pick_one(console, &names, "from > ")? else {
            return Ok(None);
        };

        let above: Vec<String> = layers
            .iter()
            .skip_while(|layer| layer.name() != source)
            .skip(1)
            .map(|layer| layer.name().to_string())
            .collect();
        if above.is_empty() {
            anyhow::bail!("{source} is the highest layer; there is nothing to compile into");
        }

        Ok(pick_one(console, &above, "into > ")?.map(|target| (source, target)))
    }
}

/// Lets the operator pick an existing target or start a new one.
fn choose_destination(
    layer: &Layer,
    console: &mut impl Console,
) -> anyhow::Result<Option<Destination>> {
    layer.ensure_exists()?;

    let create = format!("[CREATE NEW {}]", layer.name().to_uppercase());
    let mut items = vec![create.clone()];
    items.extend(layer.live_documents()?);

    let Some(choice) = pick_one(console, &items, &format!("{} > ", layer.name()))? else {
        return Ok(None);
    };

    if choice == create {
        let title = console.input(&format!("Title of the new {}", layer.tag()))?;
        Ok(Some(Destination::create(&title)?))
    } else {
        Ok(Some(Destination::Append(choice)))
    }
}

fn pick_one(
    console: &mut impl Console,
    items: &[String],
    prompt: &str,
) -> anyhow::Result<Option<String>> {
    Ok(console
        .select(items, SelectMode::Single, prompt)?
        .into_iter()
        .next())
}

/// Prints what the compile did, failing if it stopped part way.
fn print_report(report: &CompileReport, source_layer: &Layer) -> anyhow::Result<()> {
    let verb = if report.created { "Created" } else { "Appended to" };
    println!(
        "{}",
        format!("SUCCESS: {verb} {}", report.target.display()).success()
    );

    for outcome in &report.completed {
        let synced = if outcome.synced { " and synced" } else { "" };
        println!(
            "{}",
            format!("SUCCESS: Archived {}{synced}", outcome.name).success()
        );
    }

    let Some(failure) = &report.halted else {
        return Ok(());
    };

    eprintln!(
        "{}",
        format!("FAILURE: {}: {}", failure.source, failure.error).failure()
    );
    if failure.retired {
        eprintln!(
            "{}",
            format!(
                "{} is marked dead but is still in {}",
                failure.source,
                source_layer.name()
            )
            .warning()
        );
    }
    if let Some(archived) = &failure.archived {
        eprintln!(
            "{}",
            format!("INFO: archived copy at {}", archived.display()).info()
        );
    }
    if !failure.untouched.is_empty() {
        eprintln!(
            "{}",
            format!("INFO: not processed: {}", failure.untouched.join(", ")).info()
        );
    }

    anyhow::bail!("Compile stopped at {}", failure.source)
}
