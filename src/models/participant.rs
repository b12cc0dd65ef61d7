//! Roster entries of a virtual class and the rules that reconcile student
//! join/leave events with teacher attendance overrides.
//!
//! `joined_at`, `left_at` and `is_present` are what the roster reports.
//! Attended time is tracked separately: `interval_started_at` is set while a
//! presence interval is running and closing it folds its length into
//! `attended_seconds`. Every length is clamped to the class window
//! (`started_at ..= ended_at`), so time outside the session never counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Participant {
    pub id: Uuid,
    pub class_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub is_present: bool,
    pub attended_seconds: i64,
    pub interval_started_at: Option<DateTime<Utc>>,
    pub marked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The part of the class lifecycle that bounds attended time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionWindow {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionWindow {
    pub fn is_live(&self) -> bool {
        self.started_at.is_some() && self.ended_at.is_none()
    }

    /// Seconds of `[from, to)` that fall inside the window.
    pub fn clamp_seconds(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        let Some(start) = self.started_at else {
            return 0;
        };
        let from = from.max(start);
        let to = match self.ended_at {
            Some(end) => to.min(end),
            None => to,
        };
        (to - from).num_seconds().max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    AlreadyJoined,
    ClassFull,
}

impl Participant {
    pub fn new(class_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_id,
            user_id,
            joined_at: None,
            left_at: None,
            is_present: false,
            attended_seconds: 0,
            interval_started_at: None,
            marked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Present and not yet gone. Counts toward the class capacity.
    pub fn is_open(&self) -> bool {
        self.is_present && self.left_at.is_none()
    }

    /// Closed time plus the running interval, if any.
    pub fn attended_seconds_at(&self, window: &SessionWindow, now: DateTime<Utc>) -> i64 {
        let running = self
            .interval_started_at
            .map(|start| window.clamp_seconds(start, now))
            .unwrap_or(0);
        self.attended_seconds + running
    }

    fn stop_interval(&mut self, window: &SessionWindow, at: DateTime<Utc>) {
        if let Some(start) = self.interval_started_at.take() {
            self.attended_seconds += window.clamp_seconds(start, at);
        }
    }

    /// A student's own join. Callers only allow it while the class is live.
    pub fn join(&mut self, now: DateTime<Utc>) -> Result<(), JoinRejection> {
        if self.is_present {
            return Err(JoinRejection::AlreadyJoined);
        }
        self.joined_at = Some(now);
        self.left_at = None;
        self.is_present = true;
        self.interval_started_at = Some(now);
        self.marked_by = None;
        self.updated_at = now;
        Ok(())
    }

    /// A student's own leave. Returns whether anything changed.
    pub fn leave(&mut self, window: &SessionWindow, now: DateTime<Utc>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.stop_interval(window, now);
        self.left_at = Some(now);
        self.is_present = false;
        self.updated_at = now;
        true
    }

    /// A teacher override. Repeating the same mark leaves the timestamps alone.
    pub fn mark(
        &mut self,
        is_present: bool,
        marked_by: Uuid,
        window: &SessionWindow,
        now: DateTime<Utc>,
    ) {
        if is_present {
            self.joined_at = self.joined_at.or(Some(now));
            self.left_at = None;
            self.is_present = true;
            if self.interval_started_at.is_none() {
                self.interval_started_at = Some(now);
            }
        } else {
            self.stop_interval(window, now);
            self.left_at = self.left_at.or(Some(now));
            self.is_present = false;
        }
        self.marked_by = Some(marked_by);
        self.updated_at = now;
    }

    /// Stops a running interval when the class ends. The presence flag is
    /// kept: the student attended until the end.
    pub fn close_at_class_end(&mut self, window: &SessionWindow, ended_at: DateTime<Utc>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.stop_interval(window, ended_at);
        self.left_at = Some(ended_at);
        self.updated_at = ended_at;
        true
    }
}

/// The full roster of one class, loaded under the class row lock. Tracks
/// which entries were touched so only those are written back.
#[derive(Debug, Clone)]
pub struct Roster {
    class_id: Uuid,
    participants: Vec<Participant>,
    dirty: HashSet<Uuid>,
}

impl Roster {
    pub fn new(class_id: Uuid, participants: Vec<Participant>) -> Self {
        Self {
            class_id,
            participants,
            dirty: HashSet::new(),
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, user_id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn present_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_open()).count()
    }

    fn index_or_insert(&mut self, user_id: Uuid, now: DateTime<Utc>) -> usize {
        match self.participants.iter().position(|p| p.user_id == user_id) {
            Some(idx) => idx,
            None => {
                self.participants
                    .push(Participant::new(self.class_id, user_id, now));
                self.participants.len() - 1
            }
        }
    }

    pub fn join(
        &mut self,
        user_id: Uuid,
        max_participants: usize,
        now: DateTime<Utc>,
    ) -> Result<(), JoinRejection> {
        if self.get(user_id).map(|p| p.is_present).unwrap_or(false) {
            return Err(JoinRejection::AlreadyJoined);
        }
        if self.present_count() >= max_participants {
            return Err(JoinRejection::ClassFull);
        }
        let idx = self.index_or_insert(user_id, now);
        self.participants[idx].join(now)?;
        self.dirty.insert(user_id);
        Ok(())
    }

    pub fn leave(&mut self, user_id: Uuid, window: &SessionWindow, now: DateTime<Utc>) -> bool {
        let changed = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .map(|p| p.leave(window, now))
            .unwrap_or(false);
        if changed {
            self.dirty.insert(user_id);
        }
        changed
    }

    pub fn mark(
        &mut self,
        user_id: Uuid,
        is_present: bool,
        marked_by: Uuid,
        window: &SessionWindow,
        now: DateTime<Utc>,
    ) -> &Participant {
        let idx = self.index_or_insert(user_id, now);
        self.participants[idx].mark(is_present, marked_by, window, now);
        self.dirty.insert(user_id);
        &self.participants[idx]
    }

    pub fn close_all(&mut self, window: &SessionWindow, ended_at: DateTime<Utc>) -> usize {
        let mut closed = 0;
        for p in self.participants.iter_mut() {
            if p.close_at_class_end(window, ended_at) {
                self.dirty.insert(p.user_id);
                closed += 1;
            }
        }
        closed
    }

    /// Entries that must be persisted, in roster order.
    pub fn changed(&self) -> Vec<&Participant> {
        self.participants
            .iter()
            .filter(|p| self.dirty.contains(&p.user_id))
            .collect()
    }
}
