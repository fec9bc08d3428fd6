use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dpos_indexer::{
    block::raw::RawBlock,
    constants::VERSION,
    handler,
    state::store::StateStore,
    store::IndexerStore,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dpos-indexer", author, version = VERSION, about, long_about = Some("Delegated proof-of-stake chain indexer"))]
struct Cli {
    #[command(subcommand)]
    command: IndexerCommand,
    /// Log level: 0 warn, 1 info, 2 debug, 3 trace
    #[arg(short, long, global = true, default_value_t = 1)]
    verbosity: usize,
}

#[derive(Subcommand, Debug)]
enum IndexerCommand {
    /// Apply raw block files onto the indexed chain, in level order
    Sync {
        /// Directory of raw block JSON files
        #[arg(long)]
        blocks_dir: PathBuf,
        /// Directory of the indexer database
        #[arg(long)]
        database_dir: PathBuf,
    },
    /// Revert indexed blocks down to a target level
    Rollback {
        /// Directory of the indexer database
        #[arg(long)]
        database_dir: PathBuf,
        /// Level to rewind the chain cursor to
        #[arg(long)]
        to_level: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    stderrlog::new()
        .verbosity(cli.verbosity + 1)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    match cli.command {
        IndexerCommand::Sync {
            blocks_dir,
            database_dir,
        } => sync(&blocks_dir, &database_dir),
        IndexerCommand::Rollback {
            database_dir,
            to_level,
        } => rollback(&database_dir, to_level),
    }
}

fn sync(blocks_dir: &std::path::Path, database_dir: &std::path::Path) -> anyhow::Result<()> {
    let store = IndexerStore::new(database_dir)?;
    let mut blocks = vec![];
    for entry in std::fs::read_dir(blocks_dir)
        .with_context(|| format!("reading blocks dir {}", blocks_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            let bytes = std::fs::read(&path)?;
            blocks.push(RawBlock::from_slice(&bytes)?);
        }
    }
    blocks.sort_by_key(|b| b.level);

    let cursor = store.get_app_state()?.map(|s| s.level).unwrap_or(0);
    let pending = blocks.iter().filter(|b| b.level > cursor).count();
    info!("syncing {pending} blocks from level {cursor}");

    for block in blocks.iter().filter(|b| b.level > cursor) {
        handler::apply_block(&store, block)?;
    }
    Ok(())
}

fn rollback(database_dir: &std::path::Path, to_level: u32) -> anyhow::Result<()> {
    let store = IndexerStore::new(database_dir)?;
    let cursor = store.get_app_state()?.map(|s| s.level).unwrap_or(0);
    if to_level > cursor {
        bail!("cannot roll back to {to_level}, chain cursor is at {cursor}");
    }
    info!("rolling back from {cursor} to {to_level}");

    for _ in to_level..cursor {
        handler::revert_last_block(&store)?;
    }
    Ok(())
}
