//! `deck`: draft, compile and unarchive documents in a layered writing tree.

use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
