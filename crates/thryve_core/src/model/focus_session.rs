//! Focus session domain model.
//!
//! # Invariants
//! - `duration_secs` is strictly positive.
//! - `scheduled_at`, when set, is Unix epoch milliseconds.

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a focus session.
pub type FocusSessionId = Uuid;

/// Kind of mindful/focus block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    MindfulBreak,
    FocusSession,
    QuickReset,
}

impl SessionKind {
    pub const ALL: [SessionKind; 3] = [Self::MindfulBreak, Self::FocusSession, Self::QuickReset];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MindfulBreak => "mindful_break",
            Self::FocusSession => "focus_session",
            Self::QuickReset => "quick_reset",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mindful_break" => Some(Self::MindfulBreak),
            "focus_session" => Some(Self::FocusSession),
            "quick_reset" => Some(Self::QuickReset),
            _ => None,
        }
    }

    /// Human-readable label shown by clients.
    pub fn label(self) -> &'static str {
        match self {
            Self::MindfulBreak => "Mindful Break",
            Self::FocusSession => "Focus Session",
            Self::QuickReset => "Quick Reset",
        }
    }
}

/// Canonical focus session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FocusSessionWire")]
pub struct FocusSession {
    pub id: FocusSessionId,
    pub title: String,
    pub duration_secs: u32,
    pub kind: SessionKind,
    pub scheduled_at: Option<i64>,
    pub is_completed: bool,
    pub notes: Option<String>,
}

impl FocusSession {
    /// Creates an unscheduled, incomplete session with a generated ID.
    pub fn new(
        title: impl Into<String>,
        duration_secs: u32,
        kind: SessionKind,
    ) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::new_v4(), title, duration_secs, kind)
    }

    /// Creates a session with a caller-provided stable ID.
    pub fn with_id(
        id: FocusSessionId,
        title: impl Into<String>,
        duration_secs: u32,
        kind: SessionKind,
    ) -> Result<Self, ValidationError> {
        let session = Self {
            id,
            title: title.into(),
            duration_secs,
            kind,
            scheduled_at: None,
            is_completed: false,
            notes: None,
        };
        session.validate()?;
        Ok(session)
    }

    pub fn scheduled_at(mut self, epoch_ms: i64) -> Self {
        self.scheduled_at = Some(epoch_ms);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.duration_secs == 0 {
            return Err(ValidationError::NonPositiveDuration);
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct FocusSessionWire {
    id: FocusSessionId,
    title: String,
    duration_secs: u32,
    kind: SessionKind,
    #[serde(default)]
    scheduled_at: Option<i64>,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    notes: Option<String>,
}

impl TryFrom<FocusSessionWire> for FocusSession {
    type Error = ValidationError;

    fn try_from(wire: FocusSessionWire) -> Result<Self, Self::Error> {
        let session = FocusSession {
            id: wire.id,
            title: wire.title,
            duration_secs: wire.duration_secs,
            kind: wire.kind,
            scheduled_at: wire.scheduled_at,
            is_completed: wire.is_completed,
            notes: wire.notes,
        };
        session.validate()?;
        Ok(session)
    }
}
