//! Slack, Discord and generic JSON webhooks.

use chrono::{DateTime, Utc};
use rankscope::DomainResult;
use serde_json::{json, Value};

use super::report::{backlinks_label, rating_label, REPORT_TITLE};
use super::NotifyError;

/// Results listed in a Slack message.
pub const SLACK_LIMIT: usize = 5;
/// Results listed as Discord embed fields.
pub const DISCORD_LIMIT: usize = 10;
pub const DISCORD_COLOR: u32 = 0x0099ff;

/// Slack incoming-webhook payload: a header block and a summary section.
pub fn slack_payload(results: &[DomainResult]) -> Value {
    let lines: Vec<String> = results
        .iter()
        .take(SLACK_LIMIT)
        .map(|r| format!("• {}: DR {}", r.domain, rating_label(r)))
        .collect();

    json!({
        "text": REPORT_TITLE,
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": format!("📊 {REPORT_TITLE}") }
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*Checked {} domains*\n{}", results.len(), lines.join("\n"))
                }
            }
        ]
    })
}

/// Discord webhook payload with one embed.
pub fn discord_payload(results: &[DomainResult], now: DateTime<Utc>) -> Value {
    let fields: Vec<Value> = results
        .iter()
        .take(DISCORD_LIMIT)
        .map(|r| {
            json!({
                "name": r.domain,
                "value": format!("DR: {} | Backlinks: {}", rating_label(r), backlinks_label(r)),
                "inline": true
            })
        })
        .collect();

    json!({
        "embeds": [{
            "title": format!("📊 {REPORT_TITLE}"),
            "color": DISCORD_COLOR,
            "fields": fields,
            "timestamp": now.to_rfc3339()
        }]
    })
}

/// Generic webhook payload carrying the full results.
pub fn generic_payload(results: &[DomainResult], now: DateTime<Utc>) -> Value {
    json!({
        "type": "domain_report",
        "timestamp": now.to_rfc3339(),
        "results": results
    })
}

/// Check that a webhook target is an absolute http(s) URL.
pub fn validate_webhook_url(raw: &str) -> Result<url::Url, NotifyError> {
    let parsed =
        url::Url::parse(raw).map_err(|e| NotifyError::InvalidWebhook(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NotifyError::InvalidWebhook(format!(
            "{raw}: unsupported scheme {other}"
        ))),
    }
}

/// POST a JSON payload, treating non-2xx responses as failures.
pub async fn post_json(
    client: &reqwest::Client,
    channel: &'static str,
    url: &str,
    payload: &Value,
) -> Result<(), NotifyError> {
    let target = validate_webhook_url(url)?;
    client
        .post(target)
        .json(payload)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| NotifyError::Delivery {
            channel,
            reason: e.to_string(),
        })?;
    Ok(())
}
