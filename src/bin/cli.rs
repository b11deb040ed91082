//! Binary entry point for the dynafdw planning CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use dynafdw::{
    logging::init_logging,
    provider::memory::MemoryStorageClient,
    query::Record,
    Counters, ForeignTable, TableDefinition,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "dynafdw",
    version,
    about = "Plan and run foreign-table fetches against a key/document store",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "DYNAFDW_LOG",
        default_value = "warn",
        help = "Tracing filter directive (e.g. info, dynafdw=debug)"
    )]
    log_level: String,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plan trace for the table's qualifiers
    Explain {
        #[arg(value_name = "TABLE", help = "TOML table description")]
        table: PathBuf,
        #[arg(long, help = "Include key-condition predicates and segment details")]
        verbose: bool,
    },
    /// Execute the fetch against an in-memory copy of the table
    Run {
        #[arg(value_name = "TABLE", help = "TOML table description")]
        table: PathBuf,
        #[arg(long, value_name = "FILE", help = "JSON array of items to serve")]
        data: PathBuf,
        #[arg(long, value_name = "N", help = "Maximum items per page")]
        page_size: Option<usize>,
        #[arg(long, value_name = "N", help = "Stop after N records")]
        limit: Option<usize>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct ExplainReport {
    provider: String,
    score: f64,
    lines: Vec<String>,
}

#[derive(Serialize)]
struct RunReport {
    provider: String,
    rows: usize,
    counters: Counters,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Explain { table, verbose } => {
            let definition = load_definition(&table)?;
            let (options, topology) = definition.bind()?;
            let client = Arc::new(MemoryStorageClient::for_topology(&topology));
            let table = ForeignTable::new(options, topology, client);
            let plan = table.plan(&definition.qualifiers);
            let report = ExplainReport {
                provider: plan.provider.kind().to_string(),
                score: plan.score,
                lines: table.explain(&definition.qualifiers, verbose),
            };
            emit(cli.format, &report, || {
                for line in &report.lines {
                    println!("{line}");
                }
            })?;
        }
        Command::Run {
            table,
            data,
            page_size,
            limit,
        } => {
            let definition = load_definition(&table)?;
            let (options, topology) = definition.bind()?;
            let items: Vec<Record> = serde_json::from_str(&fs::read_to_string(&data)?)?;
            let mut client = MemoryStorageClient::for_topology(&topology).with_items(items);
            if let Some(page_size) = page_size {
                client = client.with_page_size(page_size);
            }
            let table = ForeignTable::new(options, topology, Arc::new(client));

            let mut stream = table.execute(&definition.qualifiers)?;
            let mut rows = 0;
            while limit.map_or(true, |limit| rows < limit) {
                let Some(record) = stream.next() else {
                    break;
                };
                println!("{}", serde_json::to_string(&record?)?);
                rows += 1;
            }
            stream.cancel();
            let report = RunReport {
                provider: stream.kind().to_string(),
                rows,
                counters: stream.counters(),
            };
            emit(cli.format, &report, || {
                println!(
                    "-- {} rows via {}; pages={} records={} scanned={}",
                    report.rows,
                    report.provider,
                    report.counters.page_count,
                    report.counters.returned_count,
                    report.counters.scanned_count
                );
            })?;
        }
    }
    Ok(())
}

fn load_definition(path: &Path) -> Result<TableDefinition, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    Ok(TableDefinition::from_toml(&text)?)
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
