// Core data structures for the bums runner

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Display identity derived from a credential's `user=` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub id: i64,
    pub first_name: String,
}

/// One configured account: the raw Telegram init data plus its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCredential {
    init_data: String,
    identity: Option<AccountIdentity>,
}

impl AccountCredential {
    /// Wrap a raw init-data line, deriving the display identity when possible
    pub fn new(init_data: impl Into<String>) -> Self {
        let init_data = init_data.into();
        let identity = parse_identity(&init_data);
        Self {
            init_data,
            identity,
        }
    }

    /// Raw init data sent on login
    pub fn init_data(&self) -> &str {
        &self.init_data
    }

    /// Identity if the `user=` field could be decoded
    pub fn identity(&self) -> Option<&AccountIdentity> {
        self.identity.as_ref()
    }

    /// Name used in logs
    pub fn display_name(&self) -> &str {
        self.identity
            .as_ref()
            .map(|i| i.first_name.as_str())
            .unwrap_or("unknown")
    }
}

fn parse_identity(init_data: &str) -> Option<AccountIdentity> {
    let user = url::form_urlencoded::parse(init_data.as_bytes())
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.into_owned())?;

    serde_json::from_str(&user).ok()
}

/// Outbound proxy bound to an account by list position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyBinding {
    uri: String,
}

impl ProxyBinding {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Host part of the proxy, without credentials
    pub fn display_host(&self) -> String {
        if let Ok(parsed) = url::Url::parse(&self.uri) {
            if let Some(host) = parsed.host_str() {
                return match parsed.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
            }
        }

        match self.uri.split_once('@') {
            Some((_, host)) if !host.is_empty() => host.to_string(),
            _ => "Unknown Proxy".to_string(),
        }
    }
}

impl fmt::Display for ProxyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_host())
    }
}

/// Balance and energy snapshot returned by the game-info endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameInfo {
    pub coin: i64,
    pub energy_surplus: i64,
    pub collect_seq_no: i64,
}

/// Ephemeral per-run state for one account
///
/// Created after login and dropped when the pipeline invocation ends.
#[derive(Debug)]
pub struct Session {
    token: String,
    game: Option<GameInfo>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            game: None,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn game(&self) -> Option<&GameInfo> {
        self.game.as_ref()
    }

    pub fn set_game(&mut self, game: GameInfo) {
        self.game = Some(game);
    }

    /// Record the effect of an energy collection cycle
    pub fn record_collection(&mut self, collected: u64, next_seq_no: i64) {
        if let Some(game) = self.game.as_mut() {
            game.energy_surplus = (game.energy_surplus - collected as i64).max(0);
            game.collect_seq_no = next_seq_no;
        }
    }
}

/// Purchasable upgrade ("mine") from the upgrade catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpgradeOption {
    #[serde(rename = "mineId", deserialize_with = "de_i64")]
    pub id: i64,
    #[serde(rename = "nextLevelCost", deserialize_with = "de_i64")]
    pub cost: i64,
    #[serde(rename = "nextPerHourReward", deserialize_with = "de_i64")]
    pub hourly_yield: i64,
    #[serde(rename = "status", deserialize_with = "de_eligible")]
    pub eligible: bool,
}

/// Task from the task list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskItem {
    #[serde(deserialize_with = "de_i64")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isFinish", default, deserialize_with = "de_flag")]
    pub finished: bool,
    #[serde(rename = "classifyName", default)]
    pub category: String,
    #[serde(rename = "rewardParty", default, deserialize_with = "de_display")]
    pub reward: String,
}

/// One day of the sign-in calendar
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignDay {
    #[serde(default, deserialize_with = "de_i64")]
    pub days: i64,
    #[serde(default, deserialize_with = "de_display")]
    pub normal: String,
    #[serde(deserialize_with = "de_i64")]
    pub status: i64,
}

impl SignDay {
    /// Status code the API uses for a claimable day
    pub const AVAILABLE: i64 = 0;

    pub fn is_available(&self) -> bool {
        self.status == Self::AVAILABLE
    }
}

/// Current gang affiliation
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct GangMembership {
    #[serde(rename = "gangId", default, deserialize_with = "de_opt_display")]
    pub gang_id: Option<String>,
    #[serde(default, deserialize_with = "de_display")]
    pub name: String,
}

impl GangMembership {
    pub fn is_affiliated(&self) -> bool {
        self.gang_id
            .as_deref()
            .is_some_and(|id| !id.is_empty() && id != "0")
    }
}

// ============================================================================
// Lenient field decoding (the API mixes numbers and numeric strings)
// ============================================================================

pub(crate) fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null => Some(0),
        _ => None,
    }
}

fn de_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    lenient_i64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected integer, got {value}")))
}

fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    de_i64(deserializer).map(|v| v != 0)
}

fn de_eligible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    de_i64(deserializer).map(|v| v == 1)
}

fn value_to_display(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn de_display<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_display(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn de_opt_display<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(value_to_display(Value::deserialize(deserializer)?))
}
