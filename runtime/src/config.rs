//! Runtime configuration and persisted settings.
//!
//! Process-level values (data directory, port, API key fallback) resolve
//! with precedence CLI flag > environment > default. User-facing settings
//! live in the `settings` table and are read through [`Settings`].

use rankscope::CheckerConfig;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "RANKSCOPE_DATA_DIR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_API_KEY: &str = "SERANKING_API_KEY";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DB_FILE: &str = "domains.db";

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub bind: String,
    /// Paid-metrics key from the environment, used when settings carry none.
    pub env_api_key: Option<String>,
}

impl RuntimeConfig {
    /// Resolve from CLI values and the process environment.
    pub fn resolve(data_dir: Option<PathBuf>, port: Option<u16>, bind: Option<String>) -> Self {
        Self::resolve_with(data_dir, port, bind, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        data_dir: Option<PathBuf>,
        port: Option<u16>,
        bind: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let data_dir = data_dir
            .or_else(|| env(ENV_DATA_DIR).filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(default_data_dir);

        let port = port
            .or_else(|| env(ENV_PORT).and_then(|v| v.trim().parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        Self {
            data_dir,
            port,
            bind: bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            env_api_key: env(ENV_API_KEY).filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    /// Create the data directory if needed.
    pub fn ensure_data_dir(&self) -> anyhow::Result<&Path> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            anyhow::anyhow!(
                "cannot create data directory {}: {e}",
                self.data_dir.display()
            )
        })?;
        Ok(&self.data_dir)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rankscope")
}

// ── Settings ────────────────────────────────────────────────────────────────

/// SMTP provider presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpProvider {
    #[default]
    Gmail,
    Outlook,
    Yahoo,
    Custom,
    Resend,
}

/// User settings stored as key/value rows.
///
/// Every known field is parsed leniently: booleans and ports may be stored
/// as strings, and a value of the wrong type reads as unset. A bad row can
/// therefore never fail a settings read. Keys this type does not know are
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub seranking_api_key: Option<String>,
    /// Comma-separated report recipients.
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub auto_email_after_check: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub automation: bool,
    /// Cron expression, five or six fields.
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub email_reports: bool,
    #[serde(
        deserialize_with = "lenient_provider",
        skip_serializing_if = "Option::is_none"
    )]
    pub smtp_provider: Option<SmtpProvider>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub smtp_email: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub smtp_password: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(deserialize_with = "lenient_port", skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub resend_api_key: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub resend_from_email: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub slack_webhook: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub discord_webhook: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Build settings from the stored key/value map.
    pub fn from_map(map: Map<String, Value>) -> anyhow::Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| anyhow::anyhow!("invalid stored settings: {e}"))
    }

    /// Reject posted values that cannot be stored for a known key: text
    /// settings must be strings and a given port must be a valid one.
    pub fn check_update(updates: &Map<String, Value>) -> Result<(), String> {
        for (key, value) in updates {
            let valid = match (key.as_str(), value) {
                (_, Value::Null) => true,
                (key, value) if TEXT_KEYS.contains(&key) => value.is_string(),
                ("smtpPort", Value::String(s)) if s.trim().is_empty() => true,
                ("smtpPort", value) => lenient_port(value.clone()).is_ok_and(|p| p.is_some()),
                _ => true,
            };
            if !valid {
                return Err(format!("Invalid value for {key}"));
            }
        }
        Ok(())
    }

    /// A non-blank string setting.
    fn text(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Report recipients: split on commas, trimmed, empties dropped.
    pub fn recipients(&self) -> Vec<String> {
        parse_recipients(self.email.as_deref().unwrap_or(""))
    }

    pub fn api_key(&self) -> Option<&str> {
        Self::text(&self.seranking_api_key)
    }

    pub fn cron_schedule(&self) -> Option<&str> {
        Self::text(&self.schedule)
    }

    /// Whether a check should be followed by an automatic report.
    pub fn wants_auto_report(&self) -> bool {
        self.auto_email_after_check && !self.recipients().is_empty()
    }

    /// Checker configuration for these settings. A stored API key wins over
    /// the environment key.
    pub fn checker_config(&self, env_api_key: Option<&str>) -> CheckerConfig {
        let key = self.api_key().or(env_api_key).map(str::to_string);
        CheckerConfig::default().with_api_key(key)
    }

    pub fn slack_webhook(&self) -> Option<&str> {
        Self::text(&self.slack_webhook)
    }

    pub fn discord_webhook(&self) -> Option<&str> {
        Self::text(&self.discord_webhook)
    }

    pub fn webhook_url(&self) -> Option<&str> {
        Self::text(&self.webhook_url)
    }
}

/// Settings keys holding free text.
const TEXT_KEYS: &[&str] = &[
    "serankingApiKey",
    "email",
    "schedule",
    "smtpEmail",
    "smtpPassword",
    "smtpHost",
    "resendApiKey",
    "resendFromEmail",
    "slackWebhook",
    "discordWebhook",
    "webhookUrl",
];

/// Split a comma-separated address list.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Lenient field parsing ───────────────────────────────────────────────────

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim(), "true" | "1" | "on" | "yes"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

pub(crate) fn lenient_port<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn lenient_provider<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<SmtpProvider>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => {
            serde_json::from_value(Value::String(s.trim().to_ascii_lowercase())).ok()
        }
        _ => None,
    })
}
