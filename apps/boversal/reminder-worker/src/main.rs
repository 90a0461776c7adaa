//! Reminder Worker - Entry Point
//!
//! Emails reminders shortly before they are due and expires the ones that passed.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    boversal_reminder_worker::run().await
}
