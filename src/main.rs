// src/main.rs - Demo wiring: stdin chat lines into the warning tracker

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, RwLock};

use chatwarden::prelude::*;
use chatwarden::types::{NewUserWarning, Person};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables and initialize logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting chatwarden v{}", chatwarden::VERSION);

    let config_path = env::var("CHATWARDEN_CONFIG").unwrap_or_else(|_| "chatwarden.toml".to_string());
    let config = AppConfig::load(&config_path)?;

    let store = Arc::new(MemoryStore::new());
    let filters = Arc::new(WordFilters::new(store.clone()));
    filters.import().await?;

    if filters.state().await.is_empty() {
        seed_demo_filters(&filters, config.general.owner).await?;
    }

    let shared_config = Arc::new(RwLock::new(config.clone()));

    // No live RCON or Discord transport here; enforcement and
    // notifications go to the log.
    let handler = EscalationHandler::new(
        Arc::new(LogActions),
        Arc::new(LogNotifier),
        store.clone(),
        shared_config,
    );

    let (tracker, handle) = WarningTracker::new(
        filters.clone(),
        config.filters.clone(),
        Box::new(handler),
        Arc::new(NoopMetrics),
        WarningTracker::DEFAULT_QUEUE_DEPTH,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let tracker_task = tokio::spawn(tracker.run(shutdown_rx));

    info!("Reading chat lines from stdin as '<steam_id> <message>'");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if config.filters.enabled => {
                        handle_line(&line, &filters, &store, &handle).await;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    shutdown_tx.send(()).ok();
    tracker_task.await?;

    Ok(())
}

/// Parse a demo chat line, match it and queue any warning.
async fn handle_line(
    line: &str,
    filters: &Arc<WordFilters>,
    store: &Arc<MemoryStore>,
    handle: &TrackerHandle,
) {
    let Some((raw_id, body)) = line.split_once(' ') else {
        warn!("Ignoring malformed line, expected '<steam_id> <message>'");
        return;
    };

    let Ok(raw) = raw_id.parse::<u64>() else {
        warn!("Ignoring line with non-numeric steam id");
        return;
    };

    let steam_id = SteamId::new(raw);
    let persona_name = format!("player-{}", raw % 1000);

    store
        .put_person(Person {
            steam_id,
            persona_name: persona_name.clone(),
            avatar: String::new(),
        })
        .await;

    if let Some((matched, filter)) = filters.match_message(body).await {
        let message = PlayerMessage {
            steam_id,
            persona_name,
            server_name: "demo".to_string(),
            body: body.to_string(),
            team: false,
            created_on: Utc::now(),
        };

        handle.queue(NewUserWarning::from_match(message, matched, filter));
    }
}

async fn seed_demo_filters(filters: &Arc<WordFilters>, owner: SteamId) -> Result<()> {
    info!("No persisted filters, seeding demo set");

    for (pattern, is_regex, weight, action) in [
        ("heck", false, 1, FilterAction::Warn),
        ("darn", false, 3, FilterAction::Kick),
        ("^gosh+$", true, 5, FilterAction::Mute),
    ] {
        filters
            .create(
                owner,
                FilterOpts {
                    pattern: pattern.to_string(),
                    is_regex,
                    is_enabled: true,
                    action,
                    duration: "30m".to_string(),
                    weight,
                },
            )
            .await?;
    }

    Ok(())
}
