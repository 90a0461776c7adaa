//! Invitation fan-out for `MeetingCreatedEvent`.
//!
//! One rendered invitation per event, one send per attendee. Failed sends are
//! logged and counted; the processor still returns `Ok` so the message is
//! committed after every attendee has been attempted.

use crate::dispatch::{DispatchReport, attempt_all};
use crate::events::MeetingCreatedEvent;
use crate::providers::EmailProvider;
use crate::templates::{InvitationEmailData, TemplateEngine};
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use stream_worker::{StreamError, StreamProcessor};
use tracing::{info, warn};

pub struct InvitationProcessor {
    provider: Arc<dyn EmailProvider>,
    templates: Arc<TemplateEngine>,
    concurrency: usize,
}

impl InvitationProcessor {
    pub fn new(provider: Arc<dyn EmailProvider>, templates: Arc<TemplateEngine>) -> Self {
        Self {
            provider,
            templates,
            concurrency: 1,
        }
    }

    /// Sends in flight per event. 1 (the default) sends in attendee order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Send the invitation to every attendee and report the outcome.
    pub async fn fan_out(
        &self,
        event: &MeetingCreatedEvent,
    ) -> Result<DispatchReport, StreamError> {
        let rendered = self
            .templates
            .render_invitation(&InvitationEmailData::from(event))?;
        let email = rendered.to("", "");

        let provider = &self.provider;
        let email = &email;
        let report = attempt_all(event.attendees.iter(), self.concurrency, |attendee| {
            let message = email.addressed_to(attendee.as_str());
            async move { provider.send(&message).await }
        })
        .await;

        counter!("invitations_sent_total").increment(report.succeeded as u64);
        counter!("invitations_failed_total").increment(report.failed() as u64);

        Ok(report)
    }
}

#[async_trait]
impl StreamProcessor<MeetingCreatedEvent> for InvitationProcessor {
    async fn process(&self, event: &MeetingCreatedEvent) -> Result<(), StreamError> {
        if event.attendees.is_empty() {
            info!(meeting_id = event.meeting_id, "Meeting has no attendees, nothing to send");
            return Ok(());
        }

        let report = self.fan_out(event).await?;

        if report.all_succeeded() {
            info!(
                meeting_id = event.meeting_id,
                sent = report.succeeded,
                "Sent meeting invitations"
            );
        } else {
            warn!(
                meeting_id = event.meeting_id,
                sent = report.succeeded,
                failed = report.failed(),
                "Some meeting invitations failed"
            );
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "invitation"
    }

    async fn health_check(&self) -> Result<bool, StreamError> {
        self.provider
            .health_check()
            .await
            .map_err(StreamError::from)
    }
}
