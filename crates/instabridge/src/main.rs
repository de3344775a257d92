// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instabridge - Instagram DM bridge for CRM tenants.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secrecy::SecretString;

/// Instabridge - Instagram DM bridge for CRM tenants.
#[derive(Parser, Debug)]
#[command(name = "instabridge", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync recent conversation history for one or all linked accounts.
    Sync {
        /// Internal account ID. All accounts when omitted.
        #[arg(long)]
        account: Option<String>,
        /// Override `sync.hours_back`.
        #[arg(long)]
        hours_back: Option<u32>,
    },
    /// Link an Instagram account using a long-lived access token.
    Link {
        #[arg(long)]
        account: String,
        #[arg(long, env = "INSTABRIDGE_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Store the messages of a webhook body read from a file or stdin.
    IngestWebhook {
        /// Path to the JSON body. Reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Send a text DM from an account to a customer.
    Send {
        #[arg(long)]
        account: String,
        /// Instagram-scoped ID of the customer.
        #[arg(long)]
        to: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// List stored conversations of an account, newest first.
    Conversations {
        #[arg(long)]
        account: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => instabridge_config::load_and_validate_path(path),
        None => instabridge_config::load_and_validate(),
    };
    let config = match config {
        Ok(config) => config,
        Err(errors) => {
            instabridge_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);
    instabridge_sync::metrics::register_metrics();

    let bridge = match commands::Bridge::open(config).await {
        Ok(bridge) => bridge,
        Err(e) => {
            eprintln!("instabridge: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Sync {
            account,
            hours_back,
        } => bridge.run_sync(account.as_deref(), hours_back, cli.json).await,
        Commands::Link { account, token } => {
            bridge
                .run_link(&account, SecretString::from(token), cli.json)
                .await
        }
        Commands::IngestWebhook { file } => bridge.run_ingest(file.as_deref(), cli.json).await,
        Commands::Send {
            account,
            to,
            text,
            idempotency_key,
        } => {
            bridge
                .run_send(&account, &to, &text, idempotency_key.as_deref(), cli.json)
                .await
        }
        Commands::Conversations { account, limit } => {
            bridge.run_conversations(&account, limit, cli.json).await
        }
    };

    bridge.close().await;
    if let Err(e) = result {
        eprintln!("instabridge: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("instabridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
