//! Job application tracking model.
//!
//! # Invariants
//! - `title` and `company` are non-empty after trimming.
//! - `deadline` is Unix epoch milliseconds.
//! - New applications start in `ApplicationStatus::Applied`.

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a job application.
pub type JobApplicationId = Uuid;

/// Deadline offset used when the caller does not pick one: one week.
pub const DEFAULT_DEADLINE_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Pipeline stage of an application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    InterviewScheduled,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] =
        [Self::Applied, Self::InterviewScheduled, Self::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::InterviewScheduled => "interview_scheduled",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "applied" => Some(Self::Applied),
            "interview_scheduled" => Some(Self::InterviewScheduled),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::InterviewScheduled => "Interview Scheduled",
            Self::Rejected => "Rejected",
        }
    }
}

impl Display for ApplicationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical job application record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JobApplicationWire")]
pub struct JobApplication {
    pub id: JobApplicationId,
    pub title: String,
    pub company: String,
    pub status: ApplicationStatus,
    /// Unix epoch milliseconds.
    pub deadline: i64,
}

impl JobApplication {
    /// Creates an `Applied` application with a generated ID.
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        deadline: i64,
    ) -> Result<Self, ValidationError> {
        let application = Self {
            id: Uuid::new_v4(),
            title: title.into(),
            company: company.into(),
            status: ApplicationStatus::Applied,
            deadline,
        };
        application.validate()?;
        Ok(application)
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("job title"));
        }
        if self.company.trim().is_empty() {
            return Err(ValidationError::EmptyField("company"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct JobApplicationWire {
    id: JobApplicationId,
    title: String,
    company: String,
    #[serde(default)]
    status: ApplicationStatus,
    deadline: i64,
}

impl TryFrom<JobApplicationWire> for JobApplication {
    type Error = ValidationError;

    fn try_from(wire: JobApplicationWire) -> Result<Self, Self::Error> {
        let application = JobApplication {
            id: wire.id,
            title: wire.title,
            company: wire.company,
            status: wire.status,
            deadline: wire.deadline,
        };
        application.validate()?;
        Ok(application)
    }
}
