//! One function per CLI subcommand.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use tracing::debug;

use spade_api::{ApiClient, Credentials, NewTable, Registration, Table, User};
use spade_core::{TableId, Topic};
use spade_realtime::{ScannerChannel, TableTransport};
use spade_session::{JoinOutcome, SessionController, UiEvent};
use spade_settings::{ScannerSettings, SpadeSettings};

use crate::adapters::{RealtimeChannel, RestSeatApi};

// ── Account ─────────────────────────────────────────────────────────

pub async fn register(
    api: &ApiClient,
    username: String,
    password: String,
    email: Option<String>,
) -> Result<()> {
    let user = api
        .register(&Registration {
            username,
            password,
            email,
        })
        .await?;
    println!("Registered {}. Log in with `spade login`.", user.username);
    Ok(())
}

pub async fn login(api: &ApiClient, username: String, password: String) -> Result<()> {
    let user = api.login(&Credentials { username, password }).await?;
    println!(
        "Logged in as {} ({} chips)",
        user.username,
        user.chips.unwrap_or(0)
    );
    Ok(())
}

pub fn logout(api: &ApiClient) -> Result<()> {
    api.logout()?;
    println!("Logged out");
    Ok(())
}

pub async fn whoami(api: &ApiClient) -> Result<()> {
    let user = api.current_user().await.context("not logged in")?;
    print_user(&user);
    Ok(())
}

// ── Tables ──────────────────────────────────────────────────────────

pub async fn tables(api: &ApiClient, all: bool) -> Result<()> {
    let tables = if all {
        api.tables().await?
    } else {
        api.public_tables().await?
    };
    if tables.is_empty() {
        println!("No tables");
        return Ok(());
    }
    for table in &tables {
        print_table_line(table);
    }
    Ok(())
}

pub async fn create_table(api: &ApiClient, new_table: NewTable) -> Result<()> {
    let table = api.create_table(&new_table).await?;
    println!("Created table {} (id {})", table.name, table.id);
    Ok(())
}

pub async fn delete_table(api: &ApiClient, id: i64) -> Result<()> {
    api.delete_table(TableId::new(id)).await?;
    println!("Deleted table {id}");
    Ok(())
}

pub async fn leave(api: &ApiClient) -> Result<()> {
    let status = api.current_table().await?;
    let Some(table_id) = status.seated_at() else {
        println!("Not seated at any table");
        return Ok(());
    };
    api.leave_table(table_id).await?;
    println!("Left table {table_id}");
    Ok(())
}

// ── Live session ────────────────────────────────────────────────────

/// Join a table, stream its events to stdout, and leave on ctrl-c.
pub async fn join(
    api: ApiClient,
    settings: &SpadeSettings,
    table_id: i64,
    buy_in: i64,
) -> Result<()> {
    let user = api.current_user().await.context("not logged in")?;

    let channel = RealtimeChannel::new(TableTransport::new(&settings.realtime));
    let seat = RestSeatApi::new(api);
    let (controller, mut events) = SessionController::new(
        seat,
        Arc::clone(&channel) as Arc<dyn spade_session::TableChannel>,
        user.username,
        settings.ui.status_clear_ms,
    );

    match controller.join(TableId::new(table_id), buy_in).await? {
        JoinOutcome::Joined(table) => {
            println!("Joined {} (table {})", table.name, table.id);
        }
        JoinOutcome::InsufficientBalance {
            required,
            available,
        } => {
            bail!("insufficient balance: buy-in is {required}, you have {available}");
        }
        JoinOutcome::AlreadySeated(id) => {
            bail!("already seated at table {id}; leave it first");
        }
        JoinOutcome::Superseded => return Ok(()),
    }

    println!("Streaming table events; press ctrl-c to leave.");
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => print_event(&event),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("ctrl-c received, leaving table");
                break;
            }
        }
    }

    controller.leave().await?;
    channel.shutdown().await;
    println!("Left table {table_id}");
    Ok(())
}

/// Stream a table's events to stdout without taking a seat.
pub async fn watch(api: ApiClient, settings: &SpadeSettings, table_id: Option<i64>) -> Result<()> {
    let table_id = match table_id {
        Some(id) => TableId::new(id),
        None => api
            .current_table()
            .await?
            .seated_at()
            .context("not seated at any table; pass a table id")?,
    };

    let transport = TableTransport::new(&settings.realtime);
    transport.connect().await?;
    let registry = transport.registry();

    let (tx, mut messages) = tokio::sync::mpsc::unbounded_channel();
    let subscription = registry.subscribe(
        &Topic::table(table_id),
        Arc::new(move |msg| {
            let _ = tx.send(msg);
        }),
    )?;

    println!("Watching table {table_id}; press ctrl-c to stop.");
    loop {
        tokio::select! {
            msg = messages.recv() => {
                match msg {
                    Some(msg) => match serde_json::to_string(&msg) {
                        Ok(json) => println!("{json}"),
                        Err(e) => debug!("unprintable table message: {e}"),
                    },
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    registry.unsubscribe(&subscription);
    transport.disconnect().await;
    Ok(())
}

// ── Scanner ─────────────────────────────────────────────────────────

/// Submit an image to the card scanner and print what it sees.
pub async fn scan(
    settings: &ScannerSettings,
    image: &Path,
    cards: u32,
) -> Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("failed to read {}", image.display()))?;

    let channel = ScannerChannel::new(settings);
    channel.connect().await?;
    let result = channel.submit_frame(&bytes, cards).await;
    channel.disconnect().await;

    let result = result?;
    if result.found {
        println!("Detected: {}", result.predictions.join(" "));
    } else {
        println!("No cards detected");
    }
    Ok(())
}

/// Fetch the scanner camera's current view and write it to a file.
pub async fn snapshot(settings: &ScannerSettings, table_id: i64, output: &Path) -> Result<()> {
    let channel = ScannerChannel::new(settings);
    channel.connect().await?;
    let frame = channel.calibration_frame(TableId::new(table_id)).await;
    channel.disconnect().await;

    let frame = frame?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&frame.image)
        .context("scanner returned invalid image data")?;
    std::fs::write(output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

/// Re-run the scanner's camera calibration.
pub async fn calibrate(settings: &ScannerSettings, table_id: i64) -> Result<()> {
    let channel = ScannerChannel::new(settings);
    channel.connect().await?;
    let result = channel.recalibrate(TableId::new(table_id)).await;
    channel.disconnect().await;

    let result = result?;
    if result.success {
        println!("Calibration succeeded");
    } else {
        bail!(
            "calibration failed: {}",
            result.message.unwrap_or_else(|| "no detail given".into())
        );
    }
    Ok(())
}

// ── Output helpers ──────────────────────────────────────────────────

fn print_user(user: &User) {
    println!("{}", user.username);
    if let Some(email) = &user.email {
        println!("  email: {email}");
    }
    if let Some(chips) = user.chips {
        println!("  chips: {chips}");
    }
    match user.current_table_id {
        Some(id) => println!("  seated at table {id}"),
        None => println!("  not seated"),
    }
}

fn print_table_line(table: &Table) {
    let blinds = match (table.small_blind, table.big_blind) {
        (Some(small), Some(big)) => format!("{small}/{big}"),
        _ => "-".to_owned(),
    };
    let seats = match table.max_players {
        Some(max) => format!("{}/{max}", table.players.len()),
        None => format!("{}", table.players.len()),
    };
    let visibility = if table.private { " (private)" } else { "" };
    println!(
        "{:>5}  {:<24} blinds {:<9} seats {}{visibility}",
        table.id, table.name, blinds, seats
    );
}

fn print_event(event: &UiEvent) {
    match event {
        UiEvent::Status { text } => println!("* {text}"),
        UiEvent::Table(msg) => match serde_json::to_string(msg) {
            Ok(json) => println!("{json}"),
            Err(e) => debug!("unprintable table message: {e}"),
        },
        UiEvent::ConnectionLost => println!("* connection lost"),
        // Presence rides in on the status banner; the rest are join/leave
        // bookkeeping already reported by the command itself.
        _ => {}
    }
}
