use anyhow::{Context, Result, anyhow};
use bindstore::core::{RecordKey, RecordValue, Table, find_mixed_table};
use bindstore::store::wire;
use bindstore::{DataServiceConfig, FileBackend, RemoteStore, VERSION_FIELD};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bindstore-tool")]
#[command(about = "Operator tooling for bindstore master records")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a master record kept by a file backend.
    Inspect {
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        store: String,
        #[arg(long)]
        key: String,
        /// Print the whole document instead of a per-sub-record summary.
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
    /// Check that a JSON document never mixes numeric and named keys.
    Check {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the effective service configuration.
    Config {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect {
            root,
            store,
            key,
            raw,
        } => inspect(&root, &store, &key, raw).await,
        Command::Check { file } => check(&file).await,
        Command::Config { file } => print_config(file.as_deref()).await,
    }
}

async fn inspect(root: &Path, store_name: &str, key: &str, raw: bool) -> Result<()> {
    let store = FileBackend::new(root)
        .store(store_name)
        .map_err(|err| anyhow!("{}", err))?;
    let record = store
        .get_record(key)
        .await
        .with_context(|| format!("Failed to read '{}' from store '{}'", key, store_name))?
        .ok_or_else(|| anyhow!("No record stored under '{}' in '{}'", key, store_name))?;

    if raw {
        let json = wire::table_to_json(&record)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let master = record
        .get_table(key)
        .ok_or_else(|| anyhow!("Record '{}' has no master entry", key))?;
    println!("{} / {} ({} sub-records)", store_name, key, master.len());
    for (sub_key, value) in master.iter() {
        let Some(sub_record) = value.as_table() else {
            println!("  {:<24} <{}>", sub_key.to_string(), value.type_name());
            continue;
        };
        let version = match sub_record.get(VERSION_FIELD) {
            Some(RecordValue::String(tag)) => tag.clone(),
            Some(RecordValue::Number(n)) => n.to_string(),
            _ => "-".to_string(),
        };
        println!(
            "  {:<24} version={:<8} fields={}",
            sub_key.to_string(),
            version,
            sub_record.len()
        );
    }
    Ok(())
}

async fn check(file: &Path) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read '{}'", file.display()))?;
    let document: JsonValue = serde_json::from_slice(&bytes)
        .with_context(|| format!("'{}' is not valid JSON", file.display()))?;

    let RecordValue::Table(table) = numeric_keys_as_indices(document) else {
        return Err(anyhow!("'{}' must contain a JSON object or array", file.display()));
    };

    match find_mixed_table(&table) {
        None => {
            println!("OK: {}", file.display());
            Ok(())
        }
        Some(violation) => Err(anyhow!(
            "mixed numeric and named keys at {}",
            violation.path_string()
        )),
    }
}

// Object keys that look like non-negative integers are what a store would
// treat as array slots, so they are checked as index keys.
fn numeric_keys_as_indices(value: JsonValue) -> RecordValue {
    match value {
        JsonValue::Object(map) => {
            let mut table = Table::new();
            for (key, child) in map {
                let key = match key.parse::<u64>() {
                    Ok(idx) => RecordKey::Index(idx),
                    Err(_) => RecordKey::Name(key),
                };
                table.insert(key, numeric_keys_as_indices(child));
            }
            RecordValue::Table(table)
        }
        JsonValue::Array(items) => {
            RecordValue::Table(Table::list(items.into_iter().map(numeric_keys_as_indices)))
        }
        other => wire::value_from_json(other),
    }
}

async fn print_config(file: Option<&Path>) -> Result<()> {
    let config = match file {
        Some(path) => DataServiceConfig::load(path)
            .await
            .map_err(|err| anyhow!("{}", err))?,
        None => DataServiceConfig::default(),
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("saving allowed: {}", config.saving_allowed());
    println!("autosave interval: {:?}", config.autosave_interval());
    Ok(())
}
