//! Ragic Extract - command line entry point
//!
//! Pulls one table out of a Ragic database, normalizes it and writes it to
//! CSV or JSON (or prints a preview).
//!
//! Usage:
//! ```bash
//! export RAGIC_URL=https://www.ragic.com
//! export RAGIC_NAMESPACE=your_account
//! export RAGIC_API_KEY=your_api_key
//! ragic-extract PB Donations --where 'Amount>10' --order-by Name --all -o donations.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use ragic_extract::config::{ConnectionConfig, ConnectionOverrides, DEFAULT_STRUCTURE_PATH};
use ragic_extract::ragic::{
    export, fetch_all, ColumnPolicy, Condition, Direction, ExportFormat, Ordering, PageOptions,
    QueryOptions, RagicClient, Schema,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Extract a table from a Ragic database
#[derive(Parser, Debug)]
#[command(name = "ragic-extract", version, about)]
struct Args {
    /// Tab name as declared in the structure file
    #[arg(required_unless_present = "list")]
    tab: Option<String>,

    /// Table name as declared in the structure file
    #[arg(required_unless_present = "list")]
    table: Option<String>,

    /// Filter condition `<column><op><value>`, op one of = >= <= > < ~ (repeatable)
    #[arg(short = 'w', long = "where", value_name = "CONDITION")]
    conditions: Vec<Condition>,

    /// Column to sort by
    #[arg(long)]
    order_by: Option<String>,

    /// Sort direction (asc, desc)
    #[arg(long, default_value = "asc")]
    direction: Direction,

    /// Include subtable data
    #[arg(long)]
    subtables: bool,

    /// Request the full record instead of the listing view
    #[arg(long)]
    no_listing: bool,

    /// Offset of the first record
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Records per request
    #[arg(short = 'l', long, default_value_t = 100)]
    limit: usize,

    /// Keep requesting pages until the backend returns none
    #[arg(long)]
    all: bool,

    /// Stop after this many pages (with --all)
    #[arg(long)]
    max_pages: Option<usize>,

    /// Pause between page requests in milliseconds (with --all)
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Emit every declared column, even ones no record carries
    #[arg(long)]
    declared_columns: bool,

    /// Output file (.csv or .json); prints a preview when omitted
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format, overrides the file extension
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Print the tabs and tables declared in the structure file and exit
    #[arg(long)]
    list: bool,

    /// Structure file path
    #[arg(short = 's', long, default_value = DEFAULT_STRUCTURE_PATH, env = "RAGIC_STRUCTURE")]
    structure: PathBuf,

    /// Ragic server URL
    #[arg(long, env = "RAGIC_URL")]
    url: Option<String>,

    /// Ragic account namespace
    #[arg(long, env = "RAGIC_NAMESPACE")]
    namespace: Option<String>,

    /// Ragic API key
    #[arg(long, env = "RAGIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Ragic API version
    #[arg(long)]
    api_version: Option<u32>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "RAGIC_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    // Listing only reads the structure file, no connection settings needed
    if args.list {
        let schema = Schema::load(&args.structure).with_context(|| {
            format!("Failed to load structure file {}", args.structure.display())
        })?;
        for line in describe_structure(&schema) {
            println!("{}", line);
        }
        return Ok(());
    }

    let config = ConnectionConfig::resolve(ConnectionOverrides {
        base_url: args.url.clone(),
        namespace: args.namespace.clone(),
        api_key: args.api_key.clone(),
        version: args.api_version,
        structure_path: Some(args.structure.clone()),
        timeout: args.timeout_secs.map(Duration::from_secs),
    })
    .context("Failed to resolve connection settings")?;

    tracing::info!(
        base_url = %config.base_url,
        namespace = %config.namespace,
        api_key = %config.masked_api_key(),
        version = config.version,
        "Connection settings"
    );

    let client = RagicClient::new(&config).with_context(|| {
        format!(
            "Failed to load structure file {}",
            config.structure_path.display()
        )
    })?;

    run(&client, &args).await
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("ragic_extract={level}")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn describe_structure(schema: &Schema) -> Vec<String> {
    let mut lines = Vec::new();
    for (tab_name, tab) in schema.tabs.iter() {
        lines.push(format!("{} ({})", tab_name, tab.identifier));
        for (table_name, table) in tab.tables.iter() {
            lines.push(format!(
                "  {} ({}) - {} columns",
                table_name,
                table.identifier,
                table.columns.len()
            ));
        }
    }
    lines
}

async fn run(client: &RagicClient, args: &Args) -> Result<()> {
    let (Some(tab), Some(table)) = (args.tab.as_deref(), args.table.as_deref()) else {
        bail!("Both TAB and TABLE are required");
    };

    let options = QueryOptions {
        include_subtables: args.subtables,
        listing: !args.no_listing,
        ordering: args
            .order_by
            .as_ref()
            .map(|column| Ordering::new(column.clone(), args.direction)),
    };
    let conditions = (!args.conditions.is_empty()).then_some(args.conditions.as_slice());

    let query = client
        .define_query(tab, table, conditions, &options)
        .with_context(|| format!("Failed to build query for {}/{}", tab, table))?;

    let policy = if args.declared_columns {
        ColumnPolicy::Declared
    } else {
        ColumnPolicy::Observed
    };

    let result = if args.all {
        let page_options = PageOptions {
            page_size: args.limit,
            start_offset: args.offset,
            max_pages: args.max_pages,
            delay: (args.delay_ms > 0).then(|| Duration::from_millis(args.delay_ms)),
            policy,
        };
        fetch_all(client, &query, &page_options).await?
    } else {
        client
            .fetch_dataframe(&query, args.offset, args.limit, policy)
            .await?
    };

    let Some(mut df) = result else {
        println!("No data found.");
        return Ok(());
    };

    println!("✓ {} rows × {} columns", df.height(), df.width());

    match &args.output {
        Some(path) => {
            export::write(&mut df, path, args.format)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Written to {}", path.display());
        }
        None => println!("{}", df),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_list_needs_only_structure_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"tabs:\n  PB:\n    identifier: pb\n    tables:\n      Donations:\n        identifier: 3\n        columns:\n          Amount: { fieldId: 1001, type: number }\n",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "ragic-extract",
            "--list",
            "--structure",
            file.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(args.list);
        assert!(args.tab.is_none());

        let schema = Schema::load(&args.structure).unwrap();
        assert_eq!(
            describe_structure(&schema),
            vec!["PB (pb)", "  Donations (3) - 1 columns"]
        );
    }
}
