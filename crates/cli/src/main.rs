mod filter;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::TryStreamExt;
use tablemap::storage::DynamoDbTableStore;
use tablemap::{KeyFilter, TableConfig, TableContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::filter::FilterArgs;

/// tablemap - Inspect rows of a partitioned DynamoDB table
#[derive(Debug, Parser)]
#[command(name = "tablemap")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
struct Global {
    /// Custom endpoint URL (for local DynamoDB)
    #[arg(long, global = true, env = "TABLEMAP_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Rows requested per page
    #[arg(long, global = true, env = "TABLEMAP_PAGE_SIZE")]
    page_size: Option<usize>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Print one row
    Get {
        /// Table name
        #[arg(long, short = 't')]
        table: String,

        /// Partition key
        #[arg(long, short = 'p')]
        partition: String,

        /// Row key
        #[arg(long, short = 'r')]
        row: String,
    },

    /// Print every row matching the key filter, one JSON document per line
    Query {
        /// Table name
        #[arg(long, short = 't')]
        table: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Delete every row matching the key filter
    Delete {
        /// Table name
        #[arg(long, short = 't')]
        table: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Count matching rows without deleting them
        #[arg(long)]
        dry_run: bool,
    },
}

impl Global {
    fn apply(&self, mut config: TableConfig) -> TableConfig {
        if let Some(endpoint_url) = &self.endpoint_url {
            config.endpoint_url = Some(endpoint_url.clone());
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size.max(1);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablemap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli
        .global
        .apply(TableConfig::from_env().context("Failed to load configuration")?);
    tracing::info!(target_store = %config.target_display(), "Using table store");

    let store = DynamoDbTableStore::from_config(&config).await;
    let ctx = TableContext::from_config(Arc::new(store), &config);

    match cli.command {
        Commands::Get {
            table,
            partition,
            row,
        } => {
            let record = ctx
                .get_dynamic(&table, &partition, &row)
                .await
                .with_context(|| format!("Failed to read ({partition}, {row}) from {table}"))?;
            print_json(&record, cli.global.pretty)?;
        }
        Commands::Query {
            table,
            filter,
            limit,
        } => {
            let filter = filter.to_filter();
            let mut rows = ctx.query_dynamic(&table, filter.clone());
            let mut printed = 0;

            while limit.is_none_or(|limit| printed < limit) {
                let Some(record) = rows
                    .try_next()
                    .await
                    .with_context(|| format!("Failed to query {table} where {filter}"))?
                else {
                    break;
                };
                print_json(&record, cli.global.pretty)?;
                printed += 1;
            }

            tracing::info!(table = %table, rows = printed, "Query finished");
        }
        Commands::Delete {
            table,
            filter,
            dry_run,
        } => {
            let filter = filter.to_filter();
            delete_matching(&ctx, &table, &filter, dry_run).await?;
        }
    }

    Ok(())
}

async fn delete_matching(
    ctx: &TableContext,
    table: &str,
    filter: &KeyFilter,
    dry_run: bool,
) -> Result<()> {
    let matched = ctx
        .delete_collection(table, filter)
        .await
        .with_context(|| format!("Failed to resolve rows of {table} where {filter}"))?;

    if dry_run {
        println!("{matched} rows would be deleted");
        return Ok(());
    }

    let summary = ctx
        .commit()
        .await
        .with_context(|| format!("Failed to delete rows of {table} where {filter}"))?;
    println!("{} rows deleted", summary.committed);
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    Ok(())
}
