use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

pub const DEFAULT_DURATION_MINUTES: i32 = 60;
pub const DEFAULT_MAX_PARTICIPANTS: i32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VirtualClass {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    pub subject: String,
    pub grade: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub meeting_id: String,
    pub meeting_password: String,
    pub status: String,
    pub max_participants: i32,
    pub is_recorded: bool,
    pub recording_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VirtualClass {
    pub fn status(&self) -> Result<ClassStatus> {
        self.status
            .parse()
            .map_err(|e: String| Error::Internal(format!("class {}: {}", self.id, e)))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    Scheduled,
    Live,
    Ended,
    Cancelled,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Scheduled => "scheduled",
            ClassStatus::Live => "live",
            ClassStatus::Ended => "ended",
            ClassStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ClassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ClassStatus::Scheduled),
            "live" => Ok(ClassStatus::Live),
            "ended" => Ok(ClassStatus::Ended),
            "cancelled" => Ok(ClassStatus::Cancelled),
            other => Err(format!("unknown class status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassAction {
    Start,
    End,
    Cancel,
}

impl ClassAction {
    pub fn target(&self) -> ClassStatus {
        match self {
            ClassAction::Start => ClassStatus::Live,
            ClassAction::End => ClassStatus::Ended,
            ClassAction::Cancel => ClassStatus::Cancelled,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            ClassAction::Start => "start",
            ClassAction::End => "end",
            ClassAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The class moves to the new status.
    Apply(ClassStatus),
    /// The class is already in the status the action leads to.
    AlreadyThere,
}

/// Decides what `action` does to a class currently in `current`.
///
/// Allowed edges: scheduled -> live (start), live -> ended (end),
/// scheduled -> cancelled (cancel).
pub fn plan_transition(current: ClassStatus, action: ClassAction) -> Result<Transition> {
    use ClassStatus::*;

    let target = action.target();
    if current == target {
        return Ok(Transition::AlreadyThere);
    }
    match (current, action) {
        (Scheduled, ClassAction::Start)
        | (Live, ClassAction::End)
        | (Scheduled, ClassAction::Cancel) => Ok(Transition::Apply(target)),
        _ => Err(Error::Conflict(format!(
            "Cannot {} a class that is {}",
            action.verb(),
            current
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_edges_apply() {
        assert_eq!(
            plan_transition(ClassStatus::Scheduled, ClassAction::Start).unwrap(),
            Transition::Apply(ClassStatus::Live)
        );
        assert_eq!(
            plan_transition(ClassStatus::Live, ClassAction::End).unwrap(),
            Transition::Apply(ClassStatus::Ended)
        );
        assert_eq!(
            plan_transition(ClassStatus::Scheduled, ClassAction::Cancel).unwrap(),
            Transition::Apply(ClassStatus::Cancelled)
        );
    }

    #[test]
    fn repeating_an_action_is_a_no_op() {
        assert_eq!(
            plan_transition(ClassStatus::Live, ClassAction::Start).unwrap(),
            Transition::AlreadyThere
        );
        assert_eq!(
            plan_transition(ClassStatus::Ended, ClassAction::End).unwrap(),
            Transition::AlreadyThere
        );
        assert_eq!(
            plan_transition(ClassStatus::Cancelled, ClassAction::Cancel).unwrap(),
            Transition::AlreadyThere
        );
    }

    #[test]
    fn backward_and_skipping_edges_conflict() {
        let rejected = [
            (ClassStatus::Ended, ClassAction::Start),
            (ClassStatus::Cancelled, ClassAction::Start),
            (ClassStatus::Scheduled, ClassAction::End),
            (ClassStatus::Cancelled, ClassAction::End),
            (ClassStatus::Live, ClassAction::Cancel),
            (ClassStatus::Ended, ClassAction::Cancel),
        ];
        for (status, action) in rejected {
            match plan_transition(status, action) {
                Err(Error::Conflict(_)) => {}
                other => panic!("{:?} on {:?} gave {:?}", action, status, other),
            }
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ClassStatus::Scheduled,
            ClassStatus::Live,
            ClassStatus::Ended,
            ClassStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ClassStatus>().unwrap(), status);
        }
        assert!("paused".parse::<ClassStatus>().is_err());
    }
}
