use core_config::server::HealthServerConfig;
use core_config::{ConfigError, FromEnv, env_flag};
use database::postgres::PostgresConfig;
use domain_notifications::SmtpConfig;
use domain_reminders::PollerConfig;

/// Everything the reminder worker reads from the environment.
#[derive(Debug, Clone)]
pub struct ReminderWorkerConfig {
    pub health: HealthServerConfig,
    pub postgres: PostgresConfig,
    /// Apply pending migrations at startup (`RUN_MIGRATIONS`, default false)
    pub run_migrations: bool,
    pub poller: PollerConfig,
    /// `None` when `SMTP_HOST` is unset; the poller then stays off
    pub smtp: Option<SmtpConfig>,
}

impl FromEnv for ReminderWorkerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            health: HealthServerConfig::from_env()?,
            postgres: PostgresConfig::from_env()?,
            run_migrations: env_flag("RUN_MIGRATIONS", false)?,
            poller: PollerConfig::from_env()?,
            smtp: SmtpConfig::from_env_optional()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_database_url_is_required() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = ReminderWorkerConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "DATABASE_URL"));
        });
    }

    #[test]
    fn test_mail_is_optional() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/boversal")),
                ("SMTP_HOST", None),
                ("RUN_MIGRATIONS", Some("yes")),
                ("REMINDER_POLL_INTERVAL_SECS", Some("30")),
            ],
            || {
                let config = ReminderWorkerConfig::from_env().unwrap();
                assert!(config.smtp.is_none());
                assert!(config.run_migrations);
                assert_eq!(config.poller.poll_interval, Duration::from_secs(30));
            },
        );
    }
}
