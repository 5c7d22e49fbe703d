//! # spade
//!
//! Command-line client for the spade poker platform: account management,
//! table browsing, live table sessions, and the card-scanner sidecar.

#![deny(unsafe_code)]

mod adapters;
mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spade_api::{ApiClient, AuthStore, NewTable};
use spade_settings::{SpadeSettings, load_settings};

/// Spade poker client.
#[derive(Parser, Debug)]
#[command(name = "spade", about = "Spade poker client", version)]
struct Cli {
    /// REST API base URL (overrides settings and `SPADE_API_URL`).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Realtime WebSocket URL (overrides settings and `SPADE_REALTIME_URL`).
    #[arg(long, global = true)]
    realtime_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new account.
    Register {
        /// Desired login name.
        username: String,
        /// Account password.
        #[arg(long)]
        password: String,
        /// Contact email.
        #[arg(long)]
        email: Option<String>,
    },
    /// Log in and persist the session.
    Login {
        /// Login name.
        username: String,
        /// Account password.
        #[arg(long)]
        password: String,
    },
    /// Drop the persisted session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// List tables.
    Tables {
        /// Include private tables, not just public ones.
        #[arg(long)]
        all: bool,
    },
    /// Create a table.
    CreateTable {
        /// Display name.
        name: String,
        /// Small blind amount.
        #[arg(long, default_value = "5")]
        small_blind: i64,
        /// Big blind amount.
        #[arg(long, default_value = "10")]
        big_blind: i64,
        /// Seat cap.
        #[arg(long, default_value = "6")]
        max_players: u32,
        /// Make the table invite-only.
        #[arg(long)]
        private: bool,
    },
    /// Delete a table you own.
    DeleteTable {
        /// Table id.
        id: i64,
    },
    /// Join a table and stream its events until ctrl-c.
    Join {
        /// Table id.
        table_id: i64,
        /// Chips to bring to the table.
        #[arg(long)]
        buy_in: i64,
    },
    /// Leave the table you are seated at.
    Leave,
    /// Stream a table's events without taking a seat.
    Watch {
        /// Table id; defaults to the table you are seated at.
        table_id: Option<i64>,
    },
    /// Submit an image to the card scanner.
    Scan {
        /// Path to the image file.
        image: PathBuf,
        /// How many cards the scanner should look for.
        #[arg(long, default_value = "2")]
        cards: u32,
    },
    /// Save the scanner camera's current view to a file.
    Snapshot {
        /// Table id the camera is pointed at.
        table_id: i64,
        /// Where to write the image.
        #[arg(long, default_value = "frame.jpg")]
        output: PathBuf,
    },
    /// Re-run the scanner's camera calibration.
    Calibrate {
        /// Table id the camera is pointed at.
        table_id: i64,
    },
}

fn resolve_settings(cli: &Cli) -> SpadeSettings {
    let mut settings = load_settings().unwrap_or_default();
    if let Some(url) = &cli.api_url {
        settings.api.base_url.clone_from(url);
    }
    if let Some(url) = &cli.realtime_url {
        settings.realtime.url.clone_from(url);
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spade=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli);

    let store = Arc::new(AuthStore::open_default());
    let api = ApiClient::new(&settings.api, store)?;

    match cli.command {
        Command::Register {
            username,
            password,
            email,
        } => commands::register(&api, username, password, email).await,
        Command::Login { username, password } => commands::login(&api, username, password).await,
        Command::Logout => commands::logout(&api),
        Command::Whoami => commands::whoami(&api).await,
        Command::Tables { all } => commands::tables(&api, all).await,
        Command::CreateTable {
            name,
            small_blind,
            big_blind,
            max_players,
            private,
        } => {
            commands::create_table(
                &api,
                NewTable {
                    name,
                    small_blind,
                    big_blind,
                    max_players,
                    private,
                },
            )
            .await
        }
        Command::DeleteTable { id } => commands::delete_table(&api, id).await,
        Command::Join { table_id, buy_in } => {
            commands::join(api, &settings, table_id, buy_in).await
        }
        Command::Leave => commands::leave(&api).await,
        Command::Watch { table_id } => commands::watch(api, &settings, table_id).await,
        Command::Scan { image, cards } => commands::scan(&settings.scanner, &image, cards).await,
        Command::Snapshot { table_id, output } => {
            commands::snapshot(&settings.scanner, table_id, &output).await
        }
        Command::Calibrate { table_id } => commands::calibrate(&settings.scanner, table_id).await,
    }
}
