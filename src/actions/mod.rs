// src/actions/mod.rs - Moderation action and notification seams

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use crate::durations::{fmt_duration, fmt_time_short, is_permanent};
use crate::types::{BanRecord, NewUserWarning, Person, Reason, SteamId};

/// Embed colour used for warning notifications.
pub const COLOUR_WARN: u32 = 0xe67e22;

/// Live enforcement capabilities against game servers. The deployment
/// wires this to the RCON layer; the core only issues calls.
#[async_trait]
pub trait ModerationActions: Send + Sync {
    /// Kick a player from whatever server they are connected to.
    async fn kick(&self, target: SteamId, reason: Reason) -> Result<()>;

    /// Create and enforce a ban or mute.
    async fn ban_steam(&self, ban: &BanRecord) -> Result<()>;

    /// Deliver an in-game private message to a player.
    async fn psay(&self, target: SteamId, message: &str) -> Result<()>;

    /// Broadcast to a server's chat.
    async fn say(&self, server_name: &str, message: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich message describing a warning escalation, shaped for an
/// operator-facing channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningEmbed {
    pub title: String,
    pub description: String,
    pub colour: u32,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub channel_id: String,
    pub embed: WarningEmbed,
}

/// Asynchronous operator notification sink. Delivery failures are the
/// sink's problem and never surface back to the tracker.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: NotificationPayload);
}

/// Build the operator notification for an exceeded warning.
pub fn warning_embed(
    warning: &NewUserWarning,
    ban: Option<&BanRecord>,
    person: &Person,
) -> WarningEmbed {
    let field = |name: &str, value: String, inline: bool| EmbedField {
        name: name.to_string(),
        value,
        inline,
    };

    let mut fields = vec![
        field(
            "Filter ID",
            warning.warning.matched_filter.filter_id.to_string(),
            true,
        ),
        field("Matched", warning.warning.matched.clone(), true),
        field("Server", warning.message.server_name.clone(), true),
        field(
            "Pattern",
            warning.warning.matched_filter.pattern.clone(),
            true,
        ),
        field("SteamID", warning.warning.steam_id.to_string(), true),
        field("Name", person.persona_name.clone(), true),
    ];

    if let Some(ban) = ban {
        let (expires_in, expires_at) = if is_permanent(ban.valid_until) {
            ("Permanent".to_string(), "Permanent".to_string())
        } else {
            (fmt_duration(ban.valid_until), fmt_time_short(ban.valid_until))
        };

        fields.push(field("Expires In", expires_in, true));
        fields.push(field("Expires At", expires_at, true));
    }

    WarningEmbed {
        title: "Language Warning".to_string(),
        description: warning.warning.message.clone(),
        colour: COLOUR_WARN,
        fields,
    }
}

/// Log-only enforcement, used when no live RCON transport is wired up.
pub struct LogActions;

#[async_trait]
impl ModerationActions for LogActions {
    async fn kick(&self, target: SteamId, reason: Reason) -> Result<()> {
        info!("Would kick {} ({})", target, reason);
        Ok(())
    }

    async fn ban_steam(&self, ban: &BanRecord) -> Result<()> {
        info!(
            "Would apply {:?} to {} until {}",
            ban.ban_type, ban.target_id, ban.valid_until
        );
        Ok(())
    }

    async fn psay(&self, target: SteamId, message: &str) -> Result<()> {
        info!("Would psay {}: {}", target, message);
        Ok(())
    }

    async fn say(&self, server_name: &str, message: &str) -> Result<()> {
        info!("Would say on {}: {}", server_name, message);
        Ok(())
    }
}

/// Log-only notification sink.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, payload: NotificationPayload) {
        info!(
            "Notification for channel {}: {} ({} fields)",
            payload.channel_id,
            payload.embed.title,
            payload.embed.fields.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BanOrigin, BanType, FilterAction, FilterMatch, PlayerMessage};
    use chrono::{Duration, Utc};

    fn sample_warning() -> NewUserWarning {
        let message = PlayerMessage {
            steam_id: SteamId::new(76561198044497130),
            persona_name: "offender".to_string(),
            server_name: "pub-1".to_string(),
            body: "you heck".to_string(),
            team: false,
            created_on: Utc::now(),
        };

        NewUserWarning::from_match(
            message,
            "heck".to_string(),
            FilterMatch {
                filter_id: 7,
                pattern: "heck".to_string(),
                is_enabled: true,
                action: FilterAction::Ban,
                duration: "1d".to_string(),
                weight: 3,
            },
        )
    }

    fn sample_person() -> Person {
        Person {
            steam_id: SteamId::new(76561198044497130),
            persona_name: "Offender".to_string(),
            avatar: String::new(),
        }
    }

    fn sample_ban(valid_until: chrono::DateTime<Utc>) -> BanRecord {
        BanRecord {
            target_id: SteamId::new(76561198044497130),
            source_id: SteamId::new(76561198044497131),
            reason: Reason::Language,
            note: "Automatic warning ban".to_string(),
            ban_type: BanType::Banned,
            origin: BanOrigin::System,
            valid_until,
            created_on: Utc::now(),
        }
    }

    #[test]
    fn test_embed_fields_without_ban() {
        let embed = warning_embed(&sample_warning(), None, &sample_person());

        assert_eq!(embed.title, "Language Warning");
        assert_eq!(embed.description, "you heck");

        let names: Vec<&str> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Filter ID", "Matched", "Server", "Pattern", "SteamID", "Name"]
        );
    }

    #[test]
    fn test_embed_timed_ban_expiry() {
        let ban = sample_ban(Utc::now() + Duration::days(1));
        let embed = warning_embed(&sample_warning(), Some(&ban), &sample_person());

        let expires_in = embed
            .fields
            .iter()
            .find(|f| f.name == "Expires In")
            .unwrap();
        assert_ne!(expires_in.value, "Permanent");
    }

    #[test]
    fn test_embed_permanent_ban_expiry() {
        let ban = sample_ban(Utc::now() + Duration::days(365 * 10));
        let embed = warning_embed(&sample_warning(), Some(&ban), &sample_person());

        let expires_in = embed
            .fields
            .iter()
            .find(|f| f.name == "Expires In")
            .unwrap();
        assert_eq!(expires_in.value, "Permanent");

        let expires_at = embed
            .fields
            .iter()
            .find(|f| f.name == "Expires At")
            .unwrap();
        assert_eq!(expires_at.value, "Permanent");
    }
}
