//! Email template rendering engine.
//!
//! Handlebars templates for the two notification kinds: reminder due soon and
//! meeting invitation. Timestamps are formatted in Rust before rendering (UTC).

use crate::error::{NotificationError, NotificationResult};
use crate::events::MeetingCreatedEvent;
use crate::providers::EmailContent;
use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

const REMINDER_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";
const MEETING_START_FORMAT: &str = "%A, %B %d, %Y at %I:%M %p";
const MEETING_END_FORMAT: &str = "%I:%M %p";

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl RenderedEmail {
    pub fn to(self, to_email: impl Into<String>, to_name: impl Into<String>) -> EmailContent {
        EmailContent {
            to_email: to_email.into(),
            to_name: to_name.into(),
            subject: self.subject,
            html_body: self.html,
            text_body: self.text,
        }
    }
}

/// Data for the reminder email.
#[derive(Debug, Clone, Serialize)]
pub struct ReminderEmailData {
    pub title: String,
    pub reminder_time: String,
    pub minutes_remaining: i64,
    pub note: Option<String>,
}

impl ReminderEmailData {
    /// `minutes_remaining` is whole minutes from `now`, truncated.
    pub fn new(
        title: impl Into<String>,
        note: Option<String>,
        reminder_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            reminder_time: reminder_time.format(REMINDER_TIME_FORMAT).to_string(),
            minutes_remaining: (reminder_time - now).num_minutes(),
            note: note.filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Data for the meeting invitation email.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationEmailData {
    pub title: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub organizer_name: String,
    pub organizer_email: String,
    pub meeting_link: Option<String>,
}

impl From<&MeetingCreatedEvent> for InvitationEmailData {
    fn from(event: &MeetingCreatedEvent) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone().filter(|d| !d.is_empty()),
            start: event.start_time.format(MEETING_START_FORMAT).to_string(),
            end: event.end_time.format(MEETING_END_FORMAT).to_string(),
            organizer_name: event.organizer_name.clone(),
            organizer_email: event.organizer_email.clone(),
            meeting_link: event.meeting_link.clone().filter(|l| !l.is_empty()),
        }
    }
}

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create the engine with every template registered.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        for (name, source) in [
            ("reminder_html", REMINDER_HTML_TEMPLATE),
            ("reminder_text", REMINDER_TEXT_TEMPLATE),
            ("invitation_html", INVITATION_HTML_TEMPLATE),
            ("invitation_text", INVITATION_TEXT_TEMPLATE),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| {
                    NotificationError::TemplateError(format!("Failed to register {}: {}", name, e))
                })?;
        }

        Ok(Self { handlebars })
    }

    fn render<T: Serialize>(&self, template_name: &str, data: &T) -> NotificationResult<String> {
        Ok(self.handlebars.render(template_name, data)?)
    }

    pub fn render_reminder(&self, data: &ReminderEmailData) -> NotificationResult<RenderedEmail> {
        debug!(title = %data.title, "Rendering reminder email");

        Ok(RenderedEmail {
            subject: format!("Reminder: {}", data.title),
            html: self.render("reminder_html", data)?,
            text: self.render("reminder_text", data)?,
        })
    }

    pub fn render_invitation(
        &self,
        data: &InvitationEmailData,
    ) -> NotificationResult<RenderedEmail> {
        debug!(title = %data.title, "Rendering invitation email");

        Ok(RenderedEmail {
            subject: format!("Meeting Invitation: {}", data.title),
            html: self.render("invitation_html", data)?,
            text: self.render("invitation_text", data)?,
        })
    }
}

const REMINDER_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h2>Reminder: {{title}}</h2>
  <p><strong>Time:</strong> {{reminder_time}}</p>
  <p><strong>{{minutes_remaining}} minutes remaining</strong></p>
  {{#if note}}<p><strong>Note:</strong> {{note}}</p>{{/if}}
  <hr/>
  <p style="color: #666; font-size: 12px;">This is an automated reminder from Boversal.</p>
</body>
</html>
"#;

const REMINDER_TEXT_TEMPLATE: &str = r#"Reminder: {{{title}}}

Time: {{{reminder_time}}}
{{minutes_remaining}} minutes remaining
{{#if note}}
Note: {{{note}}}
{{/if}}
--
This is an automated reminder from Boversal.
"#;

const INVITATION_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { background: #667eea; color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0; }
    .content { background: #f9f9f9; padding: 30px; border-radius: 0 0 10px 10px; }
    .details { background: white; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #667eea; }
    .label { font-weight: bold; color: #667eea; }
    .join { display: inline-block; background: #667eea; color: white; padding: 12px 30px; text-decoration: none; border-radius: 5px; }
    .footer { text-align: center; color: #666; font-size: 12px; margin-top: 30px; }
  </style>
</head>
<body>
  <div class="container">
    <div class="header"><h1>Meeting Invitation</h1></div>
    <div class="content">
      <p>Hello,</p>
      <p>You have been invited to a meeting by <strong>{{organizer_name}}</strong> ({{organizer_email}}).</p>
      <div class="details">
        <h2 style="color: #667eea; margin-top: 0;">{{title}}</h2>
        {{#if description}}<p><span class="label">Description:</span><br>{{description}}</p>{{/if}}
        <p><span class="label">Date &amp; Time:</span><br>{{start}} - {{end}}</p>
        <p><span class="label">Organizer:</span><br>{{organizer_name}} ({{organizer_email}})</p>
        {{#if meeting_link}}<p style="text-align: center;"><a href="{{meeting_link}}" class="join">Join Meeting</a></p>{{/if}}
      </div>
      <p>Please make sure to mark your calendar for this meeting.</p>
      <div class="footer"><p>This is an automated email from Boversal Meeting System.</p></div>
    </div>
  </div>
</body>
</html>
"#;

const INVITATION_TEXT_TEMPLATE: &str = r#"Meeting Invitation: {{{title}}}

You have been invited to a meeting by {{{organizer_name}}} ({{{organizer_email}}}).
{{#if description}}
Description: {{{description}}}
{{/if}}
Date & Time: {{{start}}} - {{{end}}}
Organizer: {{{organizer_name}}} ({{{organizer_email}}})
{{#if meeting_link}}
Join: {{{meeting_link}}}
{{/if}}
Please make sure to mark your calendar for this meeting.
"#;
