//! In-memory working set of tasks, focus sessions and job applications.
//!
//! Published to readers as `Arc<WorkingSet>`; only the pipeline can mutate
//! it, and only through copy-on-write of its own handle.

use super::RecordKind;
use crate::model::focus_session::{FocusSession, FocusSessionId};
use crate::model::job_application::{JobApplication, JobApplicationId};
use crate::model::task::{Task, TaskId};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    tasks: Vec<Task>,
    focus_sessions: Vec<FocusSession>,
    job_applications: Vec<JobApplication>,
}

impl WorkingSet {
    pub(crate) fn from_parts(
        tasks: Vec<Task>,
        focus_sessions: Vec<FocusSession>,
        job_applications: Vec<JobApplication>,
    ) -> Self {
        Self {
            tasks,
            focus_sessions,
            job_applications,
        }
    }

    /// Tasks in load order, with later insertions appended.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn focus_sessions(&self) -> &[FocusSession] {
        &self.focus_sessions
    }

    pub fn job_applications(&self) -> &[JobApplication] {
        &self.job_applications
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.get(id)
    }

    pub fn focus_session(&self, id: FocusSessionId) -> Option<&FocusSession> {
        self.get(id)
    }

    pub fn job_application(&self, id: JobApplicationId) -> Option<&JobApplication> {
        self.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
            && self.focus_sessions.is_empty()
            && self.job_applications.is_empty()
    }

    pub(crate) fn get<T: Record>(&self, id: Uuid) -> Option<&T> {
        T::slot(self).iter().find(|item| item.key() == id)
    }

    /// Inserts or replaces by id; returns the replaced record.
    pub(crate) fn put<T: Record>(&mut self, item: T) -> Option<T> {
        let items = T::slot_mut(self);
        match items.iter().position(|existing| existing.key() == item.key()) {
            Some(index) => Some(std::mem::replace(&mut items[index], item)),
            None => {
                items.push(item);
                None
            }
        }
    }

    /// Undoes a `put` given the value it returned.
    pub(crate) fn restore<T: Record>(&mut self, id: Uuid, previous: Option<T>) {
        let items = T::slot_mut(self);
        let Some(index) = items.iter().position(|existing| existing.key() == id) else {
            return;
        };
        match previous {
            Some(previous) => items[index] = previous,
            None => {
                items.remove(index);
            }
        }
    }
}

/// A record family held by the working set.
pub(crate) trait Record: Clone {
    const KIND: RecordKind;

    fn key(&self) -> Uuid;
    fn slot(set: &WorkingSet) -> &Vec<Self>;
    fn slot_mut(set: &mut WorkingSet) -> &mut Vec<Self>;
}

impl Record for Task {
    const KIND: RecordKind = RecordKind::Task;

    fn key(&self) -> Uuid {
        self.id
    }

    fn slot(set: &WorkingSet) -> &Vec<Self> {
        &set.tasks
    }

    fn slot_mut(set: &mut WorkingSet) -> &mut Vec<Self> {
        &mut set.tasks
    }
}

impl Record for FocusSession {
    const KIND: RecordKind = RecordKind::FocusSession;

    fn key(&self) -> Uuid {
        self.id
    }

    fn slot(set: &WorkingSet) -> &Vec<Self> {
        &set.focus_sessions
    }

    fn slot_mut(set: &mut WorkingSet) -> &mut Vec<Self> {
        &mut set.focus_sessions
    }
}

impl Record for JobApplication {
    const KIND: RecordKind = RecordKind::JobApplication;

    fn key(&self) -> Uuid {
        self.id
    }

    fn slot(set: &WorkingSet) -> &Vec<Self> {
        &set.job_applications
    }

    fn slot_mut(set: &mut WorkingSet) -> &mut Vec<Self> {
        &mut set.job_applications
    }
}
