//! SMTP email provider implementation using lettre.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_flag, env_optional, env_or_default, env_parse};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{debug, error, info};

/// SMTP configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_email: String,
    pub from_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// STARTTLS when true; plaintext (local Mailpit and friends) otherwise.
    pub use_tls: bool,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            from_email: "noreply@boversal.com".to_string(),
            from_name: "Boversal".to_string(),
            username: None,
            password: None,
            use_tls: true,
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    pub fn with_sender(mut self, from_email: String, from_name: String) -> Self {
        self.from_email = from_email;
        self.from_name = from_name;
        self
    }

    /// Load from env, or `None` when `SMTP_HOST` is unset (mail disabled).
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        match env_optional("SMTP_HOST") {
            Some(_) => Self::from_env().map(Some),
            None => Ok(None),
        }
    }
}

/// Environment variables:
/// - `SMTP_HOST` (required)
/// - `SMTP_PORT` (default 587)
/// - `SMTP_USERNAME`, `SMTP_PASSWORD` (optional, used only together)
/// - `SMTP_FROM_EMAIL` (default noreply@boversal.com)
/// - `SMTP_FROM_NAME` (default Boversal)
/// - `SMTP_USE_TLS` (default true)
impl FromEnv for SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_optional("SMTP_HOST")
            .ok_or_else(|| ConfigError::MissingEnvVar("SMTP_HOST".to_string()))?;

        let mut config = Self::new(host, env_parse("SMTP_PORT", 587u16)?)
            .with_tls(env_flag("SMTP_USE_TLS", true)?)
            .with_sender(
                env_or_default("SMTP_FROM_EMAIL", "noreply@boversal.com"),
                env_or_default("SMTP_FROM_NAME", "Boversal"),
            );

        if let (Some(username), Some(password)) =
            (env_optional("SMTP_USERNAME"), env_optional("SMTP_PASSWORD"))
        {
            config = config.with_credentials(username, password);
        }

        Ok(config)
    }
}

/// SMTP email provider.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
    from: Mailbox,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> NotificationResult<Self> {
        let transport = Self::build_transport(&config)?;
        let from = Mailbox::new(
            Some(config.from_name.clone()),
            config
                .from_email
                .parse()
                .map_err(|e| NotificationError::InvalidEmail(format!("from address: {}", e)))?,
        );

        Ok(Self {
            transport,
            config,
            from,
        })
    }

    fn build_transport(
        config: &SmtpConfig,
    ) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| {
                    NotificationError::ConfigError(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn build_message(&self, email: &EmailContent) -> NotificationResult<Message> {
        let address = email.to_email.parse().map_err(|e| {
            NotificationError::InvalidEmail(format!("'{}': {}", email.to_email, e))
        })?;
        let name = (!email.to_name.is_empty()).then(|| email.to_name.clone());
        let to = Mailbox::new(name, address);

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::ProviderError(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        debug!(
            to = %email.to_email,
            subject = %email.subject,
            host = %self.config.host,
            port = self.config.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(email)?;

        let response = self.transport.send(message).await.map_err(|e| {
            error!(to = %email.to_email, error = %e, "SMTP send failed");
            NotificationError::ProviderError(format!("SMTP send failed: {}", e))
        })?;

        let message_id = response.message().next().map(|s| s.to_string());

        info!(to = %email.to_email, message_id = ?message_id, "Email sent via SMTP");

        Ok(SentEmail {
            message_id,
            accepted: response.is_positive(),
        })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| NotificationError::ProviderError(format!("SMTP health check failed: {}", e)))
    }
}
