use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::cron::CronExpr;
use crate::error::ScheduleError;

/// Canonical schedule descriptor, decided once at parse time.
///
/// Serialises as its canonical string (`manual`, `hourly`, `daily`,
/// `weekly`, or the cron expression text), which is also the storage format.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleKind {
    /// Never due; runs only on explicit trigger.
    Manual,
    /// Top of every hour, UTC.
    Hourly,
    /// Every day at 00:00 UTC.
    Daily,
    /// Every Monday at 00:00 UTC.
    Weekly,
    /// Standard 5-field cron expression.
    Cron(CronExpr),
}

impl ScheduleKind {
    /// Parse a user-facing schedule string. Keywords are matched
    /// case-insensitively; anything else must be a valid cron expression.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "manual" => Ok(ScheduleKind::Manual),
            "hourly" => Ok(ScheduleKind::Hourly),
            "daily" => Ok(ScheduleKind::Daily),
            "weekly" => Ok(ScheduleKind::Weekly),
            "" => Err(ScheduleError::InvalidSchedule {
                input: raw.to_string(),
                reason: "schedule must not be empty".to_string(),
            }),
            _ => CronExpr::parse(trimmed)
                .map(ScheduleKind::Cron)
                .map_err(|e| ScheduleError::InvalidSchedule {
                    input: trimmed.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, ScheduleKind::Manual)
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Manual => write!(f, "manual"),
            ScheduleKind::Hourly => write!(f, "hourly"),
            ScheduleKind::Daily => write!(f, "daily"),
            ScheduleKind::Weekly => write!(f, "weekly"),
            ScheduleKind::Cron(expr) => write!(f, "{expr}"),
        }
    }
}

impl FromStr for ScheduleKind {
    type Err = ScheduleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ScheduleKind::parse(s)
    }
}

impl Serialize for ScheduleKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScheduleKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ScheduleKind::parse(&raw).map_err(serde::de::Error::custom)
    }
}
