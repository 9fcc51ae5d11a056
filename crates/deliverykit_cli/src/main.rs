//! DeliveryKit CLI
//!
//! Command-line access to a content-delivery stack.
//!
//! # Commands
//!
//! - `query` - Compile a query and print its wire parameters, or run it
//! - `entry` - Fetch a single entry
//! - `sync` - Run a sync from scratch, a date or a token

mod commands;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use deliverykit_client::Region;
use tracing_subscriber::EnvFilter;

/// DeliveryKit command-line client.
#[derive(Parser)]
#[command(name = "deliverykit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Stack API key
    #[arg(global = true, long, env = "DELIVERYKIT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Delivery token
    #[arg(global = true, long, env = "DELIVERYKIT_DELIVERY_TOKEN", hide_env_values = true)]
    pub delivery_token: Option<String>,

    /// Publishing environment
    #[arg(global = true, long, env = "DELIVERYKIT_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Hosting region (us, eu, azure-na, azure-eu, gcp-na)
    #[arg(global = true, long, env = "DELIVERYKIT_REGION", default_value = "us")]
    pub region: Region,

    /// Host override
    #[arg(global = true, long, env = "DELIVERYKIT_HOST")]
    pub host: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query against a content type, optionally running it
    Query(commands::query::QueryArgs),

    /// Fetch one entry
    Entry {
        /// Content type UID
        content_type: String,

        /// Entry UID
        uid: String,

        /// Locale to fetch
        #[arg(long)]
        locale: Option<String>,

        /// Reference fields to resolve
        #[arg(long)]
        include: Vec<String>,
    },

    /// Run a sync (a fresh full sync unless a token or date is given)
    Sync {
        /// Resume from a sync token
        #[arg(long, conflicts_with_all = ["pagination_token", "from"])]
        token: Option<String>,

        /// Continue a batch from a pagination token
        #[arg(long, conflicts_with = "from")]
        pagination_token: Option<String>,

        /// Sync changes after this RFC 3339 time
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Narrow a fresh sync to one content type
        #[arg(long)]
        content_type: Option<String>,

        /// Narrow a fresh sync to one locale
        #[arg(long)]
        locale: Option<String>,

        /// Follow pagination tokens until the batch is drained
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query(args) => {
            commands::query::run(&cli.global, &args).await?;
        }
        Commands::Entry {
            content_type,
            uid,
            locale,
            include,
        } => {
            commands::entry::run(&cli.global, &content_type, &uid, locale, &include).await?;
        }
        Commands::Sync {
            token,
            pagination_token,
            from,
            content_type,
            locale,
            all,
        } => {
            let request =
                commands::sync::build_request(token, pagination_token, from, content_type, locale);
            commands::sync::run(&cli.global, &request, all).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_command() {
        let cli = Cli::try_parse_from([
            "deliverykit",
            "--region",
            "eu",
            "query",
            "product",
            "--where",
            "title=Women",
            "--limit",
            "0",
        ])
        .unwrap();
        assert_eq!(cli.global.region, Region::Eu);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.content_type, "product");
                assert_eq!(args.limit, Some(0));
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn sync_token_conflicts_with_date() {
        let result = Cli::try_parse_from([
            "deliverykit",
            "sync",
            "--token",
            "abc",
            "--from",
            "2024-01-01T00:00:00Z",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_region_is_rejected() {
        let result = Cli::try_parse_from(["deliverykit", "--region", "mars", "sync"]);
        assert!(result.is_err());
    }
}
