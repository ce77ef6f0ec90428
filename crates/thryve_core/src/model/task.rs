//! Task domain model.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `source` is set once at creation and is never rewritten.
//! - `due_at` is Unix epoch milliseconds.

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Task urgency. Defaults to `Medium`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Focus area a task belongs to. Each category is a distinct partition of
/// the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Work,
    Personal,
    Habits,
    Jobs,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Work, Self::Personal, Self::Habits, Self::Jobs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Habits => "habits",
            Self::Jobs => "jobs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "work" => Some(Self::Work),
            "personal" => Some(Self::Personal),
            "habits" => Some(Self::Habits),
            "jobs" => Some(Self::Jobs),
            _ => None,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a task originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Email,
    Text,
    Manual,
    Calendar,
}

impl TaskSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Text => "text",
            Self::Manual => "manual",
            Self::Calendar => "calendar",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email" => Some(Self::Email),
            "text" => Some(Self::Text),
            "manual" => Some(Self::Manual),
            "calendar" => Some(Self::Calendar),
            _ => None,
        }
    }
}

impl Display for TaskSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskWire")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// May be empty.
    pub description: String,
    /// Unix epoch milliseconds.
    pub due_at: i64,
    pub priority: Priority,
    pub category: Category,
    pub is_completed: bool,
    pub source: TaskSource,
}

impl Task {
    /// Creates an incomplete, medium-priority task with a generated ID.
    pub fn new(
        title: impl Into<String>,
        due_at: i64,
        category: Category,
        source: TaskSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            due_at,
            priority: Priority::default(),
            category,
            is_completed: false,
            source,
        }
    }

    /// Creates a task with a caller-provided stable ID.
    ///
    /// Used by ingestion paths where identity is derived from an external
    /// natural key.
    pub fn with_id(
        id: TaskId,
        title: impl Into<String>,
        due_at: i64,
        category: Category,
        source: TaskSource,
    ) -> Result<Self, ValidationError> {
        let mut task = Self::new(title, due_at, category, source);
        task.id = id;
        task.validate()?;
        Ok(task)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn toggle_completion(&mut self) {
        self.is_completed = !self.is_completed;
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct TaskWire {
    id: TaskId,
    title: String,
    #[serde(default)]
    description: String,
    due_at: i64,
    #[serde(default)]
    priority: Priority,
    category: Category,
    #[serde(default)]
    is_completed: bool,
    source: TaskSource,
}

impl TryFrom<TaskWire> for Task {
    type Error = ValidationError;

    fn try_from(wire: TaskWire) -> Result<Self, Self::Error> {
        let task = Task {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            due_at: wire.due_at,
            priority: wire.priority,
            category: wire.category,
            is_completed: wire.is_completed,
            source: wire.source,
        };
        task.validate()?;
        Ok(task)
    }
}
