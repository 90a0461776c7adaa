use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeetingError {
    #[error("Meeting not found: {0}")]
    NotFound(i64),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error(transparent)]
    Config(#[from] core_config::ConfigError),
}

pub type MeetingResult<T> = Result<T, MeetingError>;

impl From<sea_orm::DbErr> for MeetingError {
    fn from(err: sea_orm::DbErr) -> Self {
        MeetingError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for MeetingError {
    fn from(err: validator::ValidationErrors) -> Self {
        MeetingError::Validation(err.to_string())
    }
}
