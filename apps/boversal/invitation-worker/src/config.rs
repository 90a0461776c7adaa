use core_config::server::HealthServerConfig;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use domain_notifications::{MeetingCreatedStream, SmtpConfig};
use stream_worker::{StreamDef, WorkerConfig};

/// Everything the invitation worker reads from the environment.
///
/// - `BROKER_URL` (unset: consuming disabled)
/// - `MEETING_CREATED_TOPIC` (default meeting-created)
/// - `CONSUMER_GROUP` (default utility-service-group)
/// - `CONSUMER_NAME` (default utility-service)
/// - `CONSUMER_POLL_TIMEOUT_MS` (default 1000)
/// - `CONSUMER_ERROR_BACKOFF_MS` (default 5000)
/// - `CONSUMER_CLAIM_IDLE_MS` (default 30000)
/// - `CONSUMER_FANOUT_CONCURRENCY` (default 1, sequential)
/// - `SMTP_*` (unset `SMTP_HOST`: consuming disabled)
#[derive(Debug, Clone)]
pub struct InvitationWorkerConfig {
    pub health: HealthServerConfig,
    pub broker_url: Option<String>,
    pub worker: WorkerConfig,
    pub fanout_concurrency: usize,
    pub smtp: Option<SmtpConfig>,
}

impl FromEnv for InvitationWorkerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let worker = WorkerConfig::new(
            env_or_default("MEETING_CREATED_TOPIC", MeetingCreatedStream::stream_name()),
            env_or_default("CONSUMER_GROUP", MeetingCreatedStream::consumer_group()),
        )
        .with_consumer_name(env_or_default("CONSUMER_NAME", "utility-service"))
        .with_poll_timeout_ms(env_parse("CONSUMER_POLL_TIMEOUT_MS", 1000u64)?)
        .with_error_backoff_ms(env_parse("CONSUMER_ERROR_BACKOFF_MS", 5000u64)?)
        .with_claim_idle_ms(env_parse("CONSUMER_CLAIM_IDLE_MS", 30_000u64)?);

        let fanout_concurrency: usize = env_parse("CONSUMER_FANOUT_CONCURRENCY", 1)?;
        if fanout_concurrency == 0 {
            return Err(ConfigError::ParseError {
                key: "CONSUMER_FANOUT_CONCURRENCY".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            health: HealthServerConfig::from_env()?,
            broker_url: env_optional("BROKER_URL"),
            worker,
            fanout_concurrency,
            smtp: SmtpConfig::from_env_optional()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 9] = [
        "BROKER_URL",
        "MEETING_CREATED_TOPIC",
        "CONSUMER_GROUP",
        "CONSUMER_NAME",
        "CONSUMER_POLL_TIMEOUT_MS",
        "CONSUMER_ERROR_BACKOFF_MS",
        "CONSUMER_CLAIM_IDLE_MS",
        "CONSUMER_FANOUT_CONCURRENCY",
        "SMTP_HOST",
    ];

    #[test]
    fn test_defaults_leave_everything_disabled() {
        temp_env::with_vars_unset(KEYS, || {
            let config = InvitationWorkerConfig::from_env().unwrap();
            assert!(config.broker_url.is_none());
            assert!(config.smtp.is_none());
            assert_eq!(config.worker.stream_name, "meeting-created");
            assert_eq!(config.worker.consumer_group, "utility-service-group");
            assert_eq!(config.worker.consumer_name, "utility-service");
            assert_eq!(config.worker.poll_timeout_ms, 1000);
            assert_eq!(config.fanout_concurrency, 1);
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars_unset(KEYS, || {
            temp_env::with_vars(
                [
                    ("BROKER_URL", Some("redis://broker:6379")),
                    ("CONSUMER_GROUP", Some("invites")),
                    ("CONSUMER_FANOUT_CONCURRENCY", Some("4")),
                    ("CONSUMER_CLAIM_IDLE_MS", Some("60000")),
                ],
                || {
                    let config = InvitationWorkerConfig::from_env().unwrap();
                    assert_eq!(config.broker_url.as_deref(), Some("redis://broker:6379"));
                    assert_eq!(config.worker.consumer_group, "invites");
                    assert_eq!(config.worker.claim_idle_ms, 60_000);
                    assert_eq!(config.fanout_concurrency, 4);
                },
            );
        });
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        temp_env::with_var("CONSUMER_FANOUT_CONCURRENCY", Some("0"), || {
            assert!(InvitationWorkerConfig::from_env().is_err());
        });
    }
}
