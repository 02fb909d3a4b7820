//! Sample data for new tenants: the team roster, one worked example day, and
//! the default label catalogs.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::info;

use crate::engine::{Engine, EngineError};
use crate::model::*;

const SAMPLE: &str = include_str!("seed.json");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub schedules: BTreeMap<Date, DaySchedule>,
    #[serde(default)]
    pub custom_assignments: Vec<String>,
    #[serde(default)]
    pub custom_leave_reasons: Vec<String>,
}

impl Seed {
    pub fn sample() -> Result<Self, serde_json::Error> {
        serde_json::from_str(SAMPLE)
    }
}

/// Load `seed` into `engine` if it holds nothing yet. Documents are written
/// as given, duplicate ids included. Returns whether anything was written.
pub async fn apply(engine: &Engine, seed: &Seed) -> Result<bool, EngineError> {
    if !engine.roster_is_empty().await || !engine.scheduled_dates().await.is_empty() {
        return Ok(false);
    }
    engine
        .import(
            seed.members.clone(),
            seed.custom_assignments.clone(),
            seed.custom_leave_reasons.clone(),
            seed.schedules
                .iter()
                .map(|(date, day)| (*date, day.clone()))
                .collect(),
        )
        .await?;
    info!(
        members = seed.members.len(),
        days = seed.schedules.len(),
        "seeded sample data"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_parses() {
        let seed = Seed::sample().unwrap();
        assert_eq!(seed.members.len(), 14);
        assert!(seed.members.iter().all(|m| m.active));
        assert_eq!(seed.custom_assignments, vec!["M1", "M2", "M3", "M4", "M5"]);
        assert_eq!(
            seed.custom_leave_reasons,
            vec!["Training", "Sick Leave", "Vacation", "Personal"]
        );

        let day = &seed.schedules[&parse_date("2026-01-19").unwrap()];
        assert_eq!(day.shift_entries().count(), 4);
        assert_eq!(day.on_leave.len(), 2);
        assert_eq!(day.shift(ShiftType::Ist).len(), 2);
        assert!(day.shift(ShiftType::UsLate).is_empty());
    }

    #[test]
    fn sample_day_reuses_ids_across_shifts_and_leave() {
        let seed = Seed::sample().unwrap();
        let day = &seed.schedules[&parse_date("2026-01-19").unwrap()];
        let shift_ids: Vec<EntryId> = day.shift_entries().map(|(_, e)| e.id).collect();
        let leave_ids: Vec<EntryId> = day.on_leave.iter().map(|l| l.id).collect();
        assert_eq!(shift_ids, vec![1, 2, 3, 4]);
        assert_eq!(leave_ids, vec![1, 2]);
        assert_eq!(day.max_id(), 4);
    }
}
