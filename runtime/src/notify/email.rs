//! Email delivery over SMTP (lettre) or the Resend HTTP API.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::json;

use super::NotifyError;
use crate::config::{lenient_port, lenient_provider, Settings, SmtpProvider};

pub const RESEND_API_BASE: &str = "https://api.resend.com";
pub const RESEND_DEFAULT_FROM: &str = "onboarding@resend.dev";
pub const RESEND_SENDER_NAME: &str = "Domain Reports";
pub const TEST_SUBJECT: &str = "Domain Rating Checker - Test Email";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// A rendered HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Email credentials, taken from stored settings or an ad-hoc test request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailConfig {
    #[serde(deserialize_with = "lenient_provider")]
    pub smtp_provider: Option<SmtpProvider>,
    pub smtp_email: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_host: Option<String>,
    #[serde(deserialize_with = "lenient_port")]
    pub smtp_port: Option<u16>,
    pub resend_api_key: Option<String>,
    pub resend_from_email: Option<String>,
}

impl EmailConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            smtp_provider: settings.smtp_provider,
            smtp_email: settings.smtp_email.clone(),
            smtp_password: settings.smtp_password.clone(),
            smtp_host: settings.smtp_host.clone(),
            smtp_port: settings.smtp_port,
            resend_api_key: settings.resend_api_key.clone(),
            resend_from_email: settings.resend_from_email.clone(),
        }
    }

    pub fn provider(&self) -> SmtpProvider {
        self.smtp_provider.unwrap_or_default()
    }

    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Something that can deliver an [`EmailMessage`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Short transport name for messages and logs.
    fn transport_name(&self) -> &'static str;

    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Build the mailer the configuration asks for.
pub fn build_mailer(
    config: &EmailConfig,
    client: &reqwest::Client,
    resend_base: &str,
) -> Result<Box<dyn Mailer>, NotifyError> {
    if config.provider() == SmtpProvider::Resend {
        let key = EmailConfig::field(&config.resend_api_key)
            .ok_or(NotifyError::MissingCredentials("Resend API key not configured"))?;
        let from = EmailConfig::field(&config.resend_from_email).unwrap_or(RESEND_DEFAULT_FROM);
        return Ok(Box::new(ResendMailer {
            client: client.clone(),
            api_key: key.to_string(),
            from: format!("{RESEND_SENDER_NAME} <{from}>"),
            base_url: resend_base.trim_end_matches('/').to_string(),
        }));
    }

    Ok(Box::new(SmtpMailer::new(config)?))
}

// ── SMTP ────────────────────────────────────────────────────────────────────

/// SMTP delivery through a provider preset or a custom STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let (Some(user), Some(pass)) = (
            EmailConfig::field(&config.smtp_email),
            EmailConfig::field(&config.smtp_password),
        ) else {
            return Err(NotifyError::MissingCredentials(
                "Email credentials not configured",
            ));
        };

        let smtp_err = |e: lettre::transport::smtp::Error| NotifyError::Delivery {
            channel: "email",
            reason: format!("SMTP relay error: {e}"),
        };
        let builder = match config.provider() {
            SmtpProvider::Gmail | SmtpProvider::Resend => {
                AsyncSmtpTransport::<Tokio1Executor>::relay("smtp.gmail.com").map_err(smtp_err)?
            }
            SmtpProvider::Outlook => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay("smtp-mail.outlook.com")
                    .map_err(smtp_err)?
            }
            SmtpProvider::Yahoo => {
                AsyncSmtpTransport::<Tokio1Executor>::relay("smtp.mail.yahoo.com")
                    .map_err(smtp_err)?
            }
            SmtpProvider::Custom => {
                let host = EmailConfig::field(&config.smtp_host).ok_or(
                    NotifyError::MissingCredentials("SMTP host not configured"),
                )?;
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(smtp_err)?
                    .port(config.smtp_port.unwrap_or(DEFAULT_SMTP_PORT))
            }
        };

        let transport = builder
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();

        Ok(Self {
            transport,
            from: parse_mailbox(user)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn transport_name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if message.to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);
        for to in &message.to {
            builder = builder.to(parse_mailbox(to)?);
        }
        let email = builder
            .body(message.html.clone())
            .map_err(|e| NotifyError::Delivery {
                channel: "email",
                reason: format!("failed to build email: {e}"),
            })?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery {
                channel: "email",
                reason: format!("SMTP send failed: {e}"),
            })?;
        Ok(())
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.parse()
        .map_err(|e| NotifyError::InvalidAddress(format!("{addr}: {e}")))
}

// ── Resend ──────────────────────────────────────────────────────────────────

/// Delivery through Resend's `POST /emails` endpoint.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ResendError {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl Mailer for ResendMailer {
    fn transport_name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if message.to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let body = json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });

        let resp = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery {
                channel: "email",
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let reason = match resp.json::<ResendError>().await {
            Ok(err) if !err.message.is_empty() => err.message,
            _ => format!("Resend returned {status}"),
        };
        Err(NotifyError::Delivery {
            channel: "email",
            reason,
        })
    }
}

// ── Test email ──────────────────────────────────────────────────────────────

/// Confirmation message sent by the settings "test email" action.
pub fn test_message(config: &EmailConfig, recipients: Vec<String>) -> EmailMessage {
    let count = recipients.len();
    let html = match config.provider() {
        SmtpProvider::Resend => {
            let from = EmailConfig::field(&config.resend_from_email).unwrap_or(RESEND_DEFAULT_FROM);
            format!(
                "<h2>✅ Resend API configuration successful!</h2>\n\
                 <p>Your Resend email settings are working correctly.</p>\n\
                 <p><strong>Recipients:</strong> {count}</p>\n\
                 <p><strong>Provider:</strong> Resend API</p>\n\
                 <p><strong>From:</strong> {}</p>\n",
                super::report::escape_html(from)
            )
        }
        provider => format!(
            "<h2>✅ Email configuration successful!</h2>\n\
             <p>Your email settings are working correctly.</p>\n\
             <p><strong>Provider:</strong> {}</p>\n\
             <p><strong>Recipients:</strong> {count}</p>\n",
            provider_label(provider)
        ),
    };

    EmailMessage {
        to: recipients,
        subject: TEST_SUBJECT.to_string(),
        html,
    }
}

fn provider_label(provider: SmtpProvider) -> &'static str {
    match provider {
        SmtpProvider::Gmail => "gmail",
        SmtpProvider::Outlook => "outlook",
        SmtpProvider::Yahoo => "yahoo",
        SmtpProvider::Custom => "custom",
        SmtpProvider::Resend => "resend",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resend_config() -> EmailConfig {
        EmailConfig {
            smtp_provider: Some(SmtpProvider::Resend),
            resend_api_key: Some("re_test".to_string()),
            ..Default::default()
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: vec!["ops@example.com".to_string()],
            subject: "Domain Rating Report - 2026-01-01".to_string(),
            html: "<h2>Domain Rating Report</h2>".to_string(),
        }
    }

    #[test]
    fn test_smtp_requires_credentials() {
        let err = SmtpMailer::new(&EmailConfig::default()).err().unwrap();
        assert!(matches!(err, NotifyError::MissingCredentials(_)));
    }

    #[test]
    fn test_custom_smtp_requires_host() {
        let config = EmailConfig {
            smtp_provider: Some(SmtpProvider::Custom),
            smtp_email: Some("me@example.com".to_string()),
            smtp_password: Some("pw".to_string()),
            ..Default::default()
        };
        let err = SmtpMailer::new(&config).err().unwrap();
        assert_eq!(err.to_string(), "SMTP host not configured");
    }

    #[test]
    fn test_resend_requires_key() {
        let config = EmailConfig {
            smtp_provider: Some(SmtpProvider::Resend),
            ..Default::default()
        };
        let err = build_mailer(&config, &reqwest::Client::new(), RESEND_API_BASE)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Resend API key not configured");
    }

    #[tokio::test]
    async fn test_resend_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_partial_json(serde_json::json!({
                "from": "Domain Reports <onboarding@resend.dev>",
                "to": ["ops@example.com"],
                "subject": "Domain Rating Report - 2026-01-01"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = build_mailer(&resend_config(), &reqwest::Client::new(), &server.uri()).unwrap();
        mailer.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_resend_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"message": "Invalid `to` field"})),
            )
            .mount(&server)
            .await;

        let mailer = build_mailer(&resend_config(), &reqwest::Client::new(), &server.uri()).unwrap();
        let err = mailer.send(&message()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid `to` field"));
    }

    #[tokio::test]
    async fn test_empty_recipients_rejected() {
        let mailer =
            build_mailer(&resend_config(), &reqwest::Client::new(), "http://127.0.0.1:1").unwrap();
        let mut msg = message();
        msg.to.clear();
        assert!(matches!(
            mailer.send(&msg).await,
            Err(NotifyError::NoRecipients)
        ));
    }

    #[test]
    fn test_test_message() {
        let msg = test_message(&resend_config(), vec!["a@x.com".into(), "b@x.com".into()]);
        assert_eq!(msg.subject, TEST_SUBJECT);
        assert!(msg.html.contains("<strong>Recipients:</strong> 2"));
        assert!(msg.html.contains("onboarding@resend.dev"));
    }
}
