// src/types/mod.rs - Core data model for filters, warnings and moderation records

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Lowest 64bit steam account id. Anything at or below this is not a real
/// player account.
const STEAM_ID_BASE: u64 = 76_561_197_960_265_728;

/// Stable 64bit player identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SteamId(u64);

impl SteamId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// A steam id is valid when it sits above the 64bit account base.
    pub fn valid(&self) -> bool {
        self.0 > STEAM_ID_BASE
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Serialized as a string so frontend javascript does not need BigInt.
impl Serialize for SteamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SteamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value
            .parse::<u64>()
            .map(SteamId)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid regex format")]
    InvalidRegex,
    #[error("invalid pattern")]
    InvalidPattern,
    #[error("invalid weight value")]
    InvalidWeight,
}

/// Enforcement applied once a user accumulates too much weight from
/// filter matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    Warn,
    Kick,
    Mute,
    Ban,
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterAction::Warn => write!(f, "warn"),
            FilterAction::Kick => write!(f, "kick"),
            FilterAction::Mute => write!(f, "mute"),
            FilterAction::Ban => write!(f, "ban"),
        }
    }
}

/// A configured moderation rule, either a literal word or a regex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub filter_id: i64,
    pub author_id: SteamId,
    pub pattern: String,
    pub is_regex: bool,
    pub is_enabled: bool,
    pub action: FilterAction,
    /// Duration string for mute/ban actions. "0" or empty means permanent.
    pub duration: String,
    pub weight: u32,
    pub trigger_count: u64,
    #[serde(skip)]
    pub regex: Option<Regex>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl Filter {
    pub fn new(
        author: SteamId,
        pattern: String,
        is_regex: bool,
        action: FilterAction,
        duration: String,
        weight: u32,
    ) -> Result<Self, FilterError> {
        let now = Utc::now();

        let mut filter = Filter {
            filter_id: 0,
            author_id: author,
            pattern,
            is_regex,
            is_enabled: true,
            action,
            duration,
            weight,
            trigger_count: 0,
            regex: None,
            created_on: now,
            updated_on: now,
        };

        filter.compile()?;

        Ok(filter)
    }

    /// Compile the regex for regex filters. Must be called after loading a
    /// filter from storage since the compiled form is never persisted.
    pub fn compile(&mut self) -> Result<(), FilterError> {
        if self.is_regex {
            self.regex = Some(Regex::new(&self.pattern).map_err(|_| FilterError::InvalidRegex)?);
        } else {
            self.regex = None;
        }

        Ok(())
    }

    /// Check a single lowercased token against this filter's pattern.
    pub fn matches(&self, token: &str) -> bool {
        if self.is_regex {
            return self
                .regex
                .as_ref()
                .map(|re| re.is_match(token))
                .unwrap_or(false);
        }

        self.pattern.eq_ignore_ascii_case(token)
    }

    /// Capture the fields needed at escalation time. Warnings keep this
    /// snapshot instead of a live reference so that editing or deleting a
    /// filter never changes warnings already sitting in the ledger.
    pub fn snapshot(&self) -> FilterMatch {
        FilterMatch {
            filter_id: self.filter_id,
            pattern: self.pattern.clone(),
            is_enabled: self.is_enabled,
            action: self.action,
            duration: self.duration.clone(),
            weight: self.weight,
        }
    }
}

/// Decision-time snapshot of the filter that matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterMatch {
    pub filter_id: i64,
    pub pattern: String,
    pub is_enabled: bool,
    pub action: FilterAction,
    pub duration: String,
    pub weight: u32,
}

/// Why a warning or ban was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Language,
    Cheating,
    Racism,
    Harassment,
    Exploiting,
    WarningsExceeded,
    Spam,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Language => write!(f, "Language"),
            Reason::Cheating => write!(f, "Cheating"),
            Reason::Racism => write!(f, "Racism"),
            Reason::Harassment => write!(f, "Harassment"),
            Reason::Exploiting => write!(f, "Exploiting"),
            Reason::WarningsExceeded => write!(f, "Warnings exceeded"),
            Reason::Spam => write!(f, "Spam"),
        }
    }
}

/// An inbound chat line with its server context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMessage {
    pub steam_id: SteamId,
    pub persona_name: String,
    pub server_name: String,
    pub body: String,
    pub team: bool,
    pub created_on: DateTime<Utc>,
}

/// One accumulated violation in a user's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWarning {
    pub warn_reason: Reason,
    /// The offending chat text.
    pub message: String,
    /// The token that triggered the filter.
    pub matched: String,
    pub matched_filter: FilterMatch,
    pub server_name: String,
    pub steam_id: SteamId,
    pub persona_name: String,
    /// Running weight sum at the time this entry was appended.
    pub current_total: u32,
    pub created_on: DateTime<Utc>,
}

/// Event queued to the warning tracker when a chat line matches a filter.
#[derive(Debug, Clone)]
pub struct NewUserWarning {
    pub message: PlayerMessage,
    pub warning: UserWarning,
}

impl NewUserWarning {
    pub fn from_match(message: PlayerMessage, matched: String, filter: FilterMatch) -> Self {
        let warning = UserWarning {
            warn_reason: Reason::Language,
            message: message.body.clone(),
            matched,
            matched_filter: filter,
            server_name: message.server_name.clone(),
            steam_id: message.steam_id,
            persona_name: message.persona_name.clone(),
            current_total: 0,
            created_on: Utc::now(),
        };

        Self { message, warning }
    }
}

/// Communication state a ban places the player in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BanType {
    /// Player may join but cannot use voice or text chat.
    NoComm,
    /// Player cannot join the server at all.
    Banned,
}

/// Where a ban or action originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BanOrigin {
    /// Automatic ban triggered by the service itself.
    System,
    Bot,
    Web,
    InGame,
}

/// A ban or mute to be applied and persisted through the moderation
/// actions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    pub target_id: SteamId,
    pub source_id: SteamId,
    pub reason: Reason,
    pub note: String,
    pub ban_type: BanType,
    pub origin: BanOrigin,
    pub valid_until: DateTime<Utc>,
    pub created_on: DateTime<Utc>,
}

/// Player profile fields needed when building notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub steam_id: SteamId,
    pub persona_name: String,
    pub avatar: String,
}
