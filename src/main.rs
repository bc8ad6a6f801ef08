use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use eav_migrate::{EavMigration, LogProgress, MigrationConfig, SnapshotManager, TableMapper};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eav-migrate")]
#[command(about = "Migrates an EAV attribute taxonomy into an evolved schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four stages from a source store into a destination store
    Run {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        destination: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to save the migrated store; defaults to the destination file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Restore every backed-up table of a destination store
    Rollback {
        #[arg(long)]
        destination: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Drop the backups kept by a confirmed run
    DeleteBackups {
        #[arg(long)]
        destination: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the tables a run would touch, in order
    Plan {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            source,
            destination,
            config,
            output,
        } => run(&source, &destination, config.as_deref(), output.as_deref()),
        Command::Rollback { destination, config } => rollback(&destination, config.as_deref()),
        Command::DeleteBackups { destination, config } => delete_backups(&destination, config.as_deref()),
        Command::Plan { config } => plan(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<MigrationConfig> {
    match path {
        Some(path) => MigrationConfig::load(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display())),
        None => Ok(MigrationConfig::new()),
    }
}

fn run(source: &Path, destination: &Path, config: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let source_store = SnapshotManager::new(source)
        .load()
        .with_context(|| format!("Failed to load source store '{}'", source.display()))?;
    let mut destination_store = SnapshotManager::new(destination)
        .load()
        .with_context(|| format!("Failed to load destination store '{}'", destination.display()))?;

    let mut progress = LogProgress::new();
    let outcome = EavMigration::new(&source_store, &mut destination_store, &config)
        .with_progress(&mut progress)
        .perform();
    let outcome = match outcome {
        Ok(outcome) => outcome,
        // Nothing is saved, so the destination file keeps its original contents.
        Err(e) => bail!("Migration failed after {} steps, destination left unchanged: {}", progress.current(), e),
    };

    for table in &outcome.report.tables {
        println!(
            "{:<32} source={:<6} merged={:<6} kept={:<6} written={:<6} dropped={}",
            table.table,
            table.source_rows,
            table.merged_rows,
            table.carried_rows,
            table.written_rows,
            table.dropped.len()
        );
    }

    let output = output.unwrap_or(destination);
    SnapshotManager::new(output)
        .save(&destination_store)
        .with_context(|| format!("Failed to save migrated store to '{}'", output.display()))?;
    println!("Saved migrated store: {}", output.display());
    Ok(())
}

fn rollback(destination: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let manager = SnapshotManager::new(destination);
    let mut store = manager
        .load()
        .with_context(|| format!("Failed to load destination store '{}'", destination.display()))?;
    let source = eav_migrate::InMemoryStore::new();

    EavMigration::new(&source, &mut store, &config)
        .rollback()
        .context("Rollback failed")?;
    manager
        .save(&store)
        .with_context(|| format!("Failed to save '{}'", destination.display()))?;
    println!("Rolled back: {}", destination.display());
    Ok(())
}

fn delete_backups(destination: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let manager = SnapshotManager::new(destination);
    let mut store = manager
        .load()
        .with_context(|| format!("Failed to load destination store '{}'", destination.display()))?;
    let source = eav_migrate::InMemoryStore::new();

    EavMigration::new(&source, &mut store, &config)
        .delete_backups()
        .context("Failed to delete backups")?;
    manager
        .save(&store)
        .with_context(|| format!("Failed to save '{}'", destination.display()))?;
    println!("Backups deleted: {}", destination.display());
    Ok(())
}

fn plan(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    config.validate().context("Invalid configuration")?;

    for (step, table) in config.source_tables().into_iter().enumerate() {
        let destination = config.destination_table(table);
        if destination == table {
            println!("{:>2}. {}", step + 1, table);
        } else {
            println!("{:>2}. {} -> {}", step + 1, table, destination);
        }
    }
    Ok(())
}
