//! Report delivery: email and webhooks.
//!
//! [`Notifier::dispatch_report`] fans a batch of results out to every
//! configured channel. A failing channel is logged and does not stop the
//! others.

pub mod email;
pub mod report;
pub mod webhook;

use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use rankscope::DomainResult;
use tracing::{debug, error, info};

use crate::config::Settings;
use email::{build_mailer, test_message, EmailConfig, EmailMessage, RESEND_API_BASE};
use report::{report_html, report_subject};

/// Delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("No email recipients configured")]
    NoRecipients,

    #[error("{0}")]
    MissingCredentials(&'static str),

    #[error("Invalid email address {0}")]
    InvalidAddress(String),

    #[error("Invalid webhook URL {0}")]
    InvalidWebhook(String),

    #[error("{channel} delivery failed: {reason}")]
    Delivery {
        channel: &'static str,
        reason: String,
    },
}

impl NotifyError {
    /// Whether the caller supplied bad or incomplete input, as opposed to
    /// a delivery failure.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, NotifyError::Delivery { .. })
    }
}

/// Outcome of one channel in a dispatch.
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: &'static str,
    pub result: Result<(), NotifyError>,
}

/// Sends reports over email and webhooks.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    resend_base: String,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl Notifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            resend_base: RESEND_API_BASE.to_string(),
        }
    }

    /// Point Resend requests at a different host.
    pub fn with_resend_base(mut self, base: impl Into<String>) -> Self {
        self.resend_base = base.into();
        self
    }

    /// Email the HTML report to `recipients`.
    pub async fn send_report_email(
        &self,
        results: &[DomainResult],
        config: &EmailConfig,
        recipients: Vec<String>,
    ) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        let mailer = build_mailer(config, &self.client, &self.resend_base)?;
        mailer.send(&report_message(results, recipients)).await
    }

    /// Send the settings confirmation email. Returns a user-facing summary.
    pub async fn send_test_email(
        &self,
        config: &EmailConfig,
        recipients: Vec<String>,
    ) -> Result<String, NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        let count = recipients.len();
        let mailer = build_mailer(config, &self.client, &self.resend_base)?;
        mailer.send(&test_message(config, recipients)).await?;

        Ok(match mailer.transport_name() {
            "resend" => format!("Test email sent via Resend to {count} recipient(s)!"),
            _ => format!("Test email sent to {count} recipient(s)!"),
        })
    }

    /// Deliver a report to every configured channel.
    ///
    /// Email is attempted when recipients and credentials are set; each
    /// webhook when its URL is set. Returns one outcome per attempted channel.
    pub async fn dispatch_report(
        &self,
        results: &[DomainResult],
        settings: &Settings,
    ) -> Vec<ChannelOutcome> {
        let now = Utc::now();
        let mut sends: Vec<(&'static str, BoxFuture<'_, Result<(), NotifyError>>)> = Vec::new();

        let recipients = settings.recipients();
        if !recipients.is_empty() {
            let config = EmailConfig::from_settings(settings);
            match build_mailer(&config, &self.client, &self.resend_base) {
                Ok(mailer) => sends.push((
                    "email",
                    Box::pin(async move { mailer.send(&report_message(results, recipients)).await }),
                )),
                Err(NotifyError::MissingCredentials(reason)) => {
                    debug!("email report skipped: {reason}");
                }
                Err(e) => sends.push(("email", Box::pin(async move { Err::<(), _>(e) }))),
            }
        }
        if let Some(url) = settings.slack_webhook() {
            let payload = webhook::slack_payload(results);
            sends.push((
                "slack",
                Box::pin(async move { webhook::post_json(&self.client, "slack", url, &payload).await }),
            ));
        }
        if let Some(url) = settings.discord_webhook() {
            let payload = webhook::discord_payload(results, now);
            sends.push((
                "discord",
                Box::pin(async move {
                    webhook::post_json(&self.client, "discord", url, &payload).await
                }),
            ));
        }
        if let Some(url) = settings.webhook_url() {
            let payload = webhook::generic_payload(results, now);
            sends.push((
                "webhook",
                Box::pin(async move {
                    webhook::post_json(&self.client, "webhook", url, &payload).await
                }),
            ));
        }

        let (channels, pending): (Vec<_>, Vec<_>) = sends.into_iter().unzip();
        let outcomes: Vec<ChannelOutcome> = channels
            .into_iter()
            .zip(join_all(pending).await)
            .map(|(channel, result)| ChannelOutcome { channel, result })
            .collect();

        for outcome in &outcomes {
            match &outcome.result {
                Ok(()) => info!(channel = outcome.channel, results = results.len(), "report sent"),
                Err(e) => error!(channel = outcome.channel, error = %e, "report delivery failed"),
            }
        }
        outcomes
    }
}

fn report_message(results: &[DomainResult], recipients: Vec<String>) -> EmailMessage {
    EmailMessage {
        to: recipients,
        subject: report_subject(Utc::now().date_naive()),
        html: report_html(results),
    }
}
