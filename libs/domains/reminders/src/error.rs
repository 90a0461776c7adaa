use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Reminder not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// Expired reminders are read-only.
    #[error("Reminder {0} has expired and can no longer be edited")]
    Expired(Uuid),

    #[error("Database error: {0}")]
    Database(String),
}

pub type ReminderResult<T> = Result<T, ReminderError>;

impl From<sea_orm::DbErr> for ReminderError {
    fn from(err: sea_orm::DbErr) -> Self {
        ReminderError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ReminderError {
    fn from(err: validator::ValidationErrors) -> Self {
        ReminderError::Validation(err.to_string())
    }
}
