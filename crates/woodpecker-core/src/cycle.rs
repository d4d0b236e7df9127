//! Woodpecker cycles and their daily sessions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Planned,
    Active,
    Rest,
    Done,
}

impl CycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStatus::Planned => "planned",
            CycleStatus::Active => "active",
            CycleStatus::Rest => "rest",
            CycleStatus::Done => "done",
        }
    }

    /// Status changes a user may request. The scheduler additionally demotes
    /// surplus active cycles back to planned.
    pub fn can_transition_to(self, next: CycleStatus) -> bool {
        use CycleStatus::*;
        matches!(
            (self, next),
            (Planned, Active) | (Active, Rest) | (Rest, Active) | (Active, Done)
        )
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CycleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(CycleStatus::Planned),
            "active" => Ok(CycleStatus::Active),
            "rest" => Ok(CycleStatus::Rest),
            "done" => Ok(CycleStatus::Done),
            other => Err(CoreError::InvalidCycleStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: i64,
    pub set_id: i64,
    pub index: i32,
    pub target_days: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: CycleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub cycle_id: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub target_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            CycleStatus::Planned,
            CycleStatus::Active,
            CycleStatus::Rest,
            CycleStatus::Done,
        ] {
            assert_eq!(status.as_str().parse::<CycleStatus>().unwrap(), status);
        }
        assert!(matches!(
            "paused".parse::<CycleStatus>(),
            Err(CoreError::InvalidCycleStatus(_))
        ));
    }

    #[test]
    fn test_transitions() {
        use CycleStatus::*;
        assert!(Planned.can_transition_to(Active));
        assert!(Active.can_transition_to(Rest));
        assert!(Rest.can_transition_to(Active));
        assert!(Active.can_transition_to(Done));
        assert!(!Done.can_transition_to(Active));
        assert!(!Planned.can_transition_to(Done));
        assert!(!Rest.can_transition_to(Done));
    }
}
