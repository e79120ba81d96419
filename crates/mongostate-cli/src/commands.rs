//! Subcommand implementations

use crate::{Cli, Command, ConnectionArgs};
use anyhow::Context as _;
use bson::Bson;
use mongostate_core::{Index, MongostateError};
use mongostate_index::{IndexManager, MongoBackend, normalize};
use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

/// Exit code for `read --compare` when the index has drifted
pub(crate) const DRIFT_EXIT_CODE: u8 = 2;

pub(crate) async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let timeout = cli.connection.timeout_secs;

    match cli.command {
        Command::Plan { file } => {
            let index = load_index(&file)?;
            println!("{}", serde_json::to_string_pretty(&plan(&index)?)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Create { file } => {
            let index = load_index(&file)?;
            let manager = connect(&cli.connection).await?;
            let created = with_timeout(timeout, "create", manager.create(&index)).await?;
            tracing::info!(index = %created.identity, "created");
            print_index(&created)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Read { id, compare } => {
            let declared = compare.as_deref().map(load_index).transpose()?;
            let manager = connect(&cli.connection).await?;
            match with_timeout(timeout, "read", manager.read(&id)).await {
                Ok(observed) => {
                    print_index(&observed)?;
                    match declared {
                        Some(declared) => Ok(report_drift(&observed, &declared)),
                        None => Ok(ExitCode::SUCCESS),
                    }
                }
                Err(e) if e.is_not_found() => {
                    println!("Index {} not found; treat as deleted", id);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Delete { id } => {
            let manager = connect(&cli.connection).await?;
            with_timeout(timeout, "delete", manager.delete(&id)).await?;
            println!("Index {} deleted", id);
            Ok(ExitCode::SUCCESS)
        }
        Command::Replace { file } => {
            let index = load_index(&file)?;
            let manager = connect(&cli.connection).await?;
            let replaced = with_timeout(timeout, "replace", manager.replace(&index)).await?;
            tracing::info!(index = %replaced.identity, "replaced");
            print_index(&replaced)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Read and parse a declared index file
pub(crate) fn load_index(path: &Path) -> anyhow::Result<Index> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index configuration from {:?}", path))?;
    let index = Index::from_json_str(&content)
        .with_context(|| format!("Failed to load index configuration from {:?}", path))?;
    Ok(index)
}

/// The createIndexes command for a declared index, as relaxed extended JSON
pub(crate) fn plan(index: &Index) -> mongostate_core::Result<serde_json::Value> {
    let command = normalize(index)?;
    tracing::info!(index = %index.identity, kind = %command.kind(), "plan ready");
    let document = command.to_command(&index.identity.collection, &index.identity.name);
    Ok(Bson::Document(document).into_relaxed_extjson())
}

/// Print drifted attributes to stderr and pick the exit code
pub(crate) fn report_drift(observed: &Index, declared: &Index) -> ExitCode {
    let drifted = observed.drift(declared);
    if drifted.is_empty() {
        eprintln!("No drift for index {}", observed.identity);
        return ExitCode::SUCCESS;
    }

    eprintln!("Index {} has drifted:", observed.identity);
    for attribute in &drifted {
        eprintln!("  - {}", attribute);
    }
    ExitCode::from(DRIFT_EXIT_CODE)
}

fn print_index(index: &Index) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(index)?);
    Ok(())
}

async fn connect(args: &ConnectionArgs) -> anyhow::Result<IndexManager<MongoBackend>> {
    let config = args.to_client_config();
    let backend = with_timeout(
        args.timeout_secs,
        "connect",
        MongoBackend::connect(&config),
    )
    .await?;
    Ok(IndexManager::new(backend))
}

/// Bound an operation by the configured timeout
pub(crate) async fn with_timeout<T>(
    seconds: u32,
    operation: &str,
    future: impl Future<Output = mongostate_core::Result<T>>,
) -> mongostate_core::Result<T> {
    tokio::time::timeout(Duration::from_secs(u64::from(seconds)), future)
        .await
        .map_err(|_| {
            MongostateError::Timeout(format!("{} did not finish within {}s", operation, seconds))
        })?
}
