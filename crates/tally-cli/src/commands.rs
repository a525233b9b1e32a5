use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use tally_ledger::{Ledger, NewTransaction, Operation, SumView};
use tally_store::FileLedgerStore;
use tracing::debug;

use crate::cli::*;
use crate::config::TallyConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = TallyConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let store_config = config.store_config();
    debug!(path = %store_config.path.display(), "opening ledger store");
    let store = Arc::new(
        FileLedgerStore::open(&store_config)
            .with_context(|| format!("opening ledger at {}", store_config.path.display()))?,
    );
    let ledger = Ledger::new(store.clone(), config.ledger);
    let format = cli.format;

    match cli.command {
        Command::Put(args) => cmd_put(&ledger, args, format).await,
        Command::Show(args) => cmd_show(&ledger, args, format).await,
        Command::Sum(args) => cmd_sum(&ledger, args, format).await,
        Command::Types(args) => cmd_types(&ledger, args, format).await,
        Command::Health => cmd_health(&ledger, format).await,
        Command::Purge(args) => cmd_purge(&ledger, args, format).await,
        Command::Compact => cmd_compact(&store, format),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_put(ledger: &Ledger, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let input = NewTransaction::new(args.amount, args.category, args.parent);
    let id = ledger
        .insert(&args.id, input, ledger.deadline(Operation::Insert))
        .await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "status": "ok", "id": id })),
        OutputFormat::Text => {
            println!("{} Recorded transaction {}", "✓".green().bold(), id.to_string().yellow());
            Ok(())
        }
    }
}

async fn cmd_show(ledger: &Ledger, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let detail = ledger
        .detail(&args.id, ledger.deadline(Operation::Detail))
        .await?;
    match format {
        OutputFormat::Json => print_json(&detail),
        OutputFormat::Text => {
            println!("Transaction {}", args.id.yellow().bold());
            println!("  Amount: {}", detail.amount);
            println!("  Type:   {}", detail.category.cyan());
            match detail.parent_id {
                Some(parent) => println!("  Parent: {}", parent.to_string().yellow()),
                None => println!("  Parent: {}", "none".dimmed()),
            }
            Ok(())
        }
    }
}

async fn cmd_sum(ledger: &Ledger, args: SumArgs, format: OutputFormat) -> anyhow::Result<()> {
    let deadline = ledger.deadline(Operation::Sum);
    if !args.report {
        let sum = ledger.sum(&args.id, deadline).await?;
        return match format {
            OutputFormat::Json => print_json(&SumView { sum }),
            OutputFormat::Text => {
                println!("{}", sum);
                Ok(())
            }
        };
    }

    let report = ledger.rollup(&args.id, deadline).await?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!("Rollup of {}: {}", report.root.to_string().yellow().bold(), report.total.to_string().bold());
            println!("  Descendants: {}", report.descendant_count());
            let included: Vec<String> = report.included.iter().map(ToString::to_string).collect();
            println!("  Included: {}", included.join(", "));
            if report.hit_cycle() {
                let cycles: Vec<String> = report.cycle_nodes.iter().map(ToString::to_string).collect();
                println!("  {} cycle nodes skipped: {}", "!".yellow().bold(), cycles.join(", ").yellow());
            }
            Ok(())
        }
    }
}

async fn cmd_types(ledger: &Ledger, args: TypesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ids = ledger
        .ids_by_category(&args.category, ledger.deadline(Operation::ListByCategory))
        .await?;
    match format {
        OutputFormat::Json => print_json(&ids),
        OutputFormat::Text => {
            if ids.is_empty() {
                println!("No transactions of type {}.", args.category.cyan());
            }
            for id in ids {
                println!("{}", id);
            }
            Ok(())
        }
    }
}

async fn cmd_health(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let health = ledger.health().await;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "status": health }))?,
        OutputFormat::Text if health.is_healthy() => println!("{} healthy", "✓".green().bold()),
        OutputFormat::Text => println!("{} unhealthy", "✗".red().bold()),
    }
    anyhow::ensure!(health.is_healthy(), "ledger store is unhealthy");
    Ok(())
}

async fn cmd_purge(ledger: &Ledger, args: PurgeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let removed = ledger
        .purge(&args.id, &args.category, ledger.deadline(Operation::Purge))
        .await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "removed": removed })),
        OutputFormat::Text => {
            println!("{} Removed {} transaction(s)", "✓".green(), removed.to_string().bold());
            Ok(())
        }
    }
}

fn cmd_compact(store: &FileLedgerStore, format: OutputFormat) -> anyhow::Result<()> {
    let kept = store.compact()?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "kept": kept })),
        OutputFormat::Text => {
            println!("{} Compacted log: {} record(s) kept", "✓".green(), kept.to_string().bold());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tally_ledger::LedgerError;

    fn cli(dir: &std::path::Path, args: &[&str]) -> Cli {
        let data_dir = dir.to_string_lossy().into_owned();
        let mut argv = vec!["tally", "--data-dir", data_dir.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn put_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        run_command(cli(dir.path(), &["put", "1", "-a", "10", "-t", "ANIMALS"])).await.unwrap();
        run_command(cli(dir.path(), &["put", "2", "-a", "100", "-t", "ANIMALS", "-p", "1"])).await.unwrap();

        run_command(cli(dir.path(), &["show", "1"])).await.unwrap();
        run_command(cli(dir.path(), &["sum", "1", "--report"])).await.unwrap();
        run_command(cli(dir.path(), &["types", "ANIMALS", "--format", "json"])).await.unwrap();
        run_command(cli(dir.path(), &["health"])).await.unwrap();

        let store = FileLedgerStore::open(&tally_store::FileStoreConfig::in_dir(dir.path())).unwrap();
        let ledger = Ledger::new(Arc::new(store), Default::default());
        assert_eq!(ledger.sum("1", ledger.deadline(Operation::Sum)).await.unwrap(), 110.0);
    }

    #[tokio::test]
    async fn ledger_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        run_command(cli(dir.path(), &["put", "1", "-a", "10", "-t", "A"])).await.unwrap();

        let err = run_command(cli(dir.path(), &["put", "1", "-a", "10", "-t", "A"]))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::DuplicateKey(_))));

        let err = run_command(cli(dir.path(), &["put", "2", "-a", "-1", "-t", "A"]))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::InvalidArgument(_))));

        let err = run_command(cli(dir.path(), &["show", "9"])).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::NotFound(_))));
    }

    #[tokio::test]
    async fn purge_and_compact() {
        let dir = tempfile::tempdir().unwrap();
        run_command(cli(dir.path(), &["put", "1", "-a", "1", "-t", "A"])).await.unwrap();
        run_command(cli(dir.path(), &["put", "2", "-a", "2", "-t", "B"])).await.unwrap();
        run_command(cli(dir.path(), &["purge", "1", "--type", "B"])).await.unwrap();
        run_command(cli(dir.path(), &["compact", "--format", "json"])).await.unwrap();

        let err = run_command(cli(dir.path(), &["sum", "2"])).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::NotFound(_))));
    }
}
