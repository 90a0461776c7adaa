//! Invitation Worker - Entry Point
//!
//! Consumes meeting-created events and emails every attendee.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    boversal_invitation_worker::run().await
}
