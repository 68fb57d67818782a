// src/handlers/mod.rs - Escalation strategies invoked by the warning tracker

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::actions::{warning_embed, ModerationActions, NotificationPayload, Notifier};
use crate::config::AppConfig;
use crate::durations::parse_duration;
use crate::store::FilterStore;
use crate::tracker::WarningHandler;
use crate::types::{BanOrigin, BanRecord, BanType, FilterAction, NewUserWarning};

const WARN_NOTICE: &str = "[WARN] Please refrain from using slurs/toxicity (see: rules & MOTD). \
Further offenses will result in mutes/bans";

/// Production outcome handler: private in-game notices for plain warnings,
/// kick/mute/ban enforcement plus an operator notification once the limit
/// is exceeded.
pub struct EscalationHandler {
    actions: Arc<dyn ModerationActions>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn FilterStore>,
    config: Arc<RwLock<AppConfig>>,
}

impl EscalationHandler {
    pub fn new(
        actions: Arc<dyn ModerationActions>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn FilterStore>,
        config: Arc<RwLock<AppConfig>>,
    ) -> Self {
        Self {
            actions,
            notifier,
            store,
            config,
        }
    }
}

#[async_trait]
impl WarningHandler for EscalationHandler {
    async fn on_warning(&self, warning: &NewUserWarning) -> Result<()> {
        self.actions
            .psay(warning.warning.steam_id, WARN_NOTICE)
            .await
            .context("failed to deliver warning notice")
    }

    async fn on_exceeded(&self, warning: &NewUserWarning) -> Result<()> {
        let config = self.config.read().await.clone();
        let filter = &warning.warning.matched_filter;
        let target = warning.warning.steam_id;

        // Apply the enforcement configured on the filter that crossed the
        // threshold. Side effects applied here are never rolled back if a
        // later step fails.
        let ban = match filter.action {
            FilterAction::Mute | FilterAction::Ban => {
                let duration =
                    parse_duration(&filter.duration).context("invalid filter duration")?;

                let ban_type = if filter.action == FilterAction::Mute {
                    BanType::NoComm
                } else {
                    BanType::Banned
                };

                let record = BanRecord {
                    target_id: target,
                    source_id: config.general.owner,
                    reason: warning.warning.warn_reason,
                    note: "Automatic warning ban".to_string(),
                    ban_type,
                    origin: BanOrigin::System,
                    valid_until: Utc::now() + duration,
                    created_on: Utc::now(),
                };

                self.actions
                    .ban_steam(&record)
                    .await
                    .context("failed to apply warning ban")?;

                Some(record)
            }
            FilterAction::Kick => {
                self.actions
                    .kick(target, warning.warning.warn_reason)
                    .await
                    .context("failed to apply warning kick")?;

                None
            }
            FilterAction::Warn => None,
        };

        let person = self
            .store
            .get_person_by_steam_id(target)
            .await
            .context("failed to resolve target profile")?;

        // The embed is always built so dry-run auditing can inspect it;
        // delivery is gated on the ping flag.
        let embed = warning_embed(warning, ban.as_ref(), &person);

        if !config.filters.ping_discord {
            debug!(
                "Ping disabled, suppressing warning notification for {}",
                target
            );
            return Ok(());
        }

        self.notifier
            .send(NotificationPayload {
                channel_id: config.discord.log_channel_id.clone(),
                embed,
            })
            .await;

        Ok(())
    }
}
