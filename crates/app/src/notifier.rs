//! Telegram notifier
//!
//! Fire-and-forget delivery of booking lifecycle events. The worker task
//! drains a channel so a slow or unreachable Telegram API can never block
//! or fail the booking operation that emitted the event; every delivery
//! failure is logged and swallowed.

use bookline_core::{Appointment, TelegramConfig};
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Booking lifecycle events delivered to the notification channel
#[derive(Debug, Clone)]
pub enum NotifierEvent {
    AppointmentCreated {
        id: Uuid,
        name: String,
        phone: String,
        email: Option<String>,
        date: NaiveDate,
        time: String,
        message: Option<String>,
        code: String,
    },
    AppointmentCancelled {
        name: String,
        phone: String,
        date: NaiveDate,
        time: String,
        code: String,
    },
}

impl NotifierEvent {
    pub fn created(appointment: &Appointment) -> Self {
        NotifierEvent::AppointmentCreated {
            id: appointment.id,
            name: appointment.name.clone(),
            phone: appointment.phone.clone(),
            email: appointment.email.clone(),
            date: appointment.date,
            time: appointment.time.to_string(),
            message: appointment.message.clone(),
            code: appointment.code.to_string(),
        }
    }

    pub fn cancelled(appointment: &Appointment) -> Self {
        NotifierEvent::AppointmentCancelled {
            name: appointment.name.clone(),
            phone: appointment.phone.clone(),
            date: appointment.date,
            time: appointment.time.to_string(),
            code: appointment.code.to_string(),
        }
    }
}

/// Cheap cloneable handle for emitting events
#[derive(Clone)]
pub struct NotifierHandle {
    tx: Option<mpsc::UnboundedSender<NotifierEvent>>,
}

impl NotifierHandle {
    /// A handle that drops every event (tests, missing credentials)
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue an event for delivery; never blocks, never fails the caller
    pub fn send(&self, event: NotifierEvent) {
        let Some(tx) = &self.tx else {
            debug!("Notifier disabled, event dropped");
            return;
        };
        if tx.send(event).is_err() {
            warn!("Notifier worker gone, event dropped");
        }
    }
}

/// Spawn the delivery worker, if credentials are configured
pub fn spawn(config: &TelegramConfig) -> NotifierHandle {
    let (Some(token), Some(chat_id)) = (config.bot_token.clone(), config.chat_id.clone()) else {
        warn!("Telegram credentials not configured, notifications disabled");
        return NotifierHandle::disabled();
    };

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(worker(token, chat_id, rx));
    NotifierHandle { tx: Some(tx) }
}

async fn worker(token: String, chat_id: String, mut rx: mpsc::UnboundedReceiver<NotifierEvent>) {
    let client = reqwest::Client::new();

    while let Some(event) = rx.recv().await {
        match deliver(&client, &token, &chat_id, &event).await {
            Ok(()) => info!("Telegram notification sent"),
            Err(e) => warn!(error = %e, "Telegram notification failed"),
        }
    }

    debug!("Notifier worker shutting down");
}

async fn deliver(
    client: &reqwest::Client,
    token: &str,
    chat_id: &str,
    event: &NotifierEvent,
) -> reqwest::Result<()> {
    let url = format!("https://api.telegram.org/bot{token}/sendMessage");
    client
        .post(url)
        .json(&serde_json::json!({
            "chat_id": chat_id,
            "text": render(event),
            "parse_mode": "MarkdownV2",
        }))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

/// Render an event as a MarkdownV2 Telegram message
fn render(event: &NotifierEvent) -> String {
    match event {
        NotifierEvent::AppointmentCreated {
            id,
            name,
            phone,
            email,
            date,
            time,
            message,
            code,
        } => format!(
            "*New appointment*\n\n\
             *Name:* {}\n\
             *Phone:* {}\n\
             *Email:* {}\n\
             *Date:* {}\n\
             *Time:* {}\n\
             *Message:* {}\n\n\
             *Booking code:* `{}`\n\
             *Record id:* {}",
            escape_markdown_v2(name),
            escape_markdown_v2(phone),
            escape_markdown_v2(email.as_deref().unwrap_or("not provided")),
            escape_markdown_v2(&format_date(*date)),
            escape_markdown_v2(time),
            escape_markdown_v2(message.as_deref().unwrap_or("none")),
            escape_markdown_v2(code),
            escape_markdown_v2(&id.to_string()),
        ),
        NotifierEvent::AppointmentCancelled {
            name,
            phone,
            date,
            time,
            code,
        } => format!(
            "*Appointment cancelled*\n\n\
             *Name:* {}\n\
             *Phone:* {}\n\
             *Date:* {}\n\
             *Time:* {}\n\
             *Booking code:* `{}`\n\n\
             The slot is now free for other clients",
            escape_markdown_v2(name),
            escape_markdown_v2(phone),
            escape_markdown_v2(&format_date(*date)),
            escape_markdown_v2(time),
            escape_markdown_v2(code),
        ),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Escape the characters MarkdownV2 treats as markup
fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                | '|' | '{' | '}' | '.' | '!' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
