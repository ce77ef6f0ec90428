//! Email message to candidate task conversion.
//!
//! Conversion rules:
//! - `Subject` and an RFC 2822 `Date` header are required; messages missing
//!   either are skipped.
//! - The subject, trimmed of surrounding whitespace, is the title.
//! - Description is `Email from: <From>` (`Unknown` when absent).
//! - Tasks land in `Category::Work` with medium priority and source `email`.
//! - The task id is derived from the message id, so re-fetching the same
//!   message always yields the same task.

use crate::model::task::{Category, Priority, Task, TaskSource};
use crate::source::{stable_task_id, Conversion};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

/// Minimal message shape (Gmail `users.messages.get` metadata format).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub payload: EmailPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailPayload {
    #[serde(default)]
    pub headers: Vec<EmailHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailHeader {
    pub name: String,
    pub value: String,
}

impl EmailMessage {
    /// Returns the first header value matching `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

/// Converts a raw JSON payload into a task, skipping undecodable payloads.
pub fn convert_payload(source_id: &str, payload: &Value) -> Conversion {
    match EmailMessage::deserialize(payload) {
        Ok(message) => email_to_task(source_id, &message),
        Err(err) => Conversion::Skipped(format!("undecodable message payload: {err}")),
    }
}

/// Converts one email message into a candidate task.
pub fn email_to_task(source_id: &str, message: &EmailMessage) -> Conversion {
    let message_id = message.id.trim();
    if message_id.is_empty() {
        return Conversion::Skipped("missing message id".to_string());
    }

    let Some(subject) = message.header("Subject") else {
        return Conversion::Skipped("missing Subject header".to_string());
    };
    let title = subject.trim().to_string();

    let Some(date_text) = message.header("Date") else {
        return Conversion::Skipped("missing Date header".to_string());
    };
    let Some(due_at) = parse_email_date(date_text) else {
        return Conversion::Skipped("unparseable Date header".to_string());
    };

    let sender = message.header("From").unwrap_or("Unknown");
    let task = Task {
        id: stable_task_id(source_id, message_id),
        title,
        description: format!("Email from: {sender}"),
        due_at,
        priority: Priority::Medium,
        category: Category::Work,
        is_completed: false,
        source: TaskSource::Email,
    };
    Conversion::Converted(task)
}

/// Parses an RFC 2822 date header into epoch milliseconds.
pub fn parse_email_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.timestamp_millis())
}
