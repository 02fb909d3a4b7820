use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Weekday};
use tracing::info;

use crate::config::IdPolicy;
use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::{DayGuard, Engine, EngineError, rejected};

/// Where a paste lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteTargets {
    /// Exactly these dates, in this order. Repeats are ignored.
    Dates(Vec<Date>),
    /// Every Monday to Friday in `start..=end`.
    Weekdays { start: Date, end: Date },
}

impl PasteTargets {
    pub fn resolve(&self) -> Result<Vec<Date>, EngineError> {
        match self {
            PasteTargets::Dates(dates) => {
                let mut seen = HashSet::new();
                Ok(dates.iter().copied().filter(|d| seen.insert(*d)).collect())
            }
            PasteTargets::Weekdays { start, end } => weekdays_between(*start, *end),
        }
    }
}

/// Monday to Friday dates in `start..=end`.
pub fn weekdays_between(start: Date, end: Date) -> Result<Vec<Date>, EngineError> {
    if start > end {
        return Err(EngineError::InvalidRange { start, end });
    }
    let days: Vec<Date> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();
    if days.is_empty() {
        return Err(EngineError::EmptyRange { start, end });
    }
    Ok(days)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteReport {
    /// Overwritten days, in the order their ids were allocated.
    pub dates: Vec<Date>,
    /// Shift entries written to each day.
    pub shift_entries: usize,
    /// Leave entries written to each day.
    pub leave_entries: usize,
}

/// Deep copy of `source` with fresh ids drawn from `next_id`: shift entries in
/// catalog order first, then leave entries.
fn renumber(source: &DaySchedule, next_id: &mut EntryId) -> DaySchedule {
    let mut copy = DaySchedule::empty();
    for (shift, entry) in source.shift_entries() {
        copy.shift_mut(shift).push(ShiftEntry {
            id: *next_id,
            ..entry.clone()
        });
        *next_id += 1;
    }
    for leave in &source.on_leave {
        copy.on_leave.push(LeaveEntry {
            id: *next_id,
            ..leave.clone()
        });
        *next_id += 1;
    }
    copy
}

/// What a paste copies from.
#[derive(Clone, Copy)]
enum Source<'a> {
    Given(&'a DaySchedule),
    /// Read under its own day lock, taken together with the targets'.
    Stored(Date),
}

impl Engine {
    /// Overwrite every target day with a copy of `source`. Destructive and
    /// unvalidated: whatever the targets held is gone. The whole paste is one
    /// WAL record.
    pub async fn paste_schedule(
        &self,
        source: &DaySchedule,
        targets: &PasteTargets,
    ) -> Result<PasteReport, EngineError> {
        self.paste(Source::Given(source), targets).await
    }

    /// Copy the schedule stored for `source_date` onto the targets. A day never
    /// written pastes as the empty schedule, clearing the targets. The source
    /// is read while every target is locked, so an edit cannot slip in between
    /// the read and the copy, including when the source is itself a target.
    pub async fn paste_day(
        &self,
        source_date: Date,
        targets: &PasteTargets,
    ) -> Result<PasteReport, EngineError> {
        self.paste(Source::Stored(source_date), targets).await
    }

    async fn paste(
        &self,
        source: Source<'_>,
        targets: &PasteTargets,
    ) -> Result<PasteReport, EngineError> {
        let dates = targets.resolve().map_err(rejected)?;
        if dates.len() > MAX_PASTE_TARGETS {
            return Err(rejected(EngineError::LimitExceeded("too many paste targets")));
        }
        if dates.is_empty() {
            let source = match source {
                Source::Given(day) => day.clone(),
                Source::Stored(date) => self.schedule(date).await,
            };
            return Ok(PasteReport {
                shift_entries: source.shift_entries().count(),
                leave_entries: source.on_leave.len(),
                dates,
            });
        }

        let _gate = self.compaction_gate.read().await;
        let _serial = self.paste_lock.lock().await;

        // Lock in date order; ids are still handed out in caller order.
        let mut held: BTreeMap<Date, DayGuard> = BTreeMap::new();
        let mut sorted = dates.clone();
        if let Source::Stored(date) = source {
            sorted.push(date);
        }
        sorted.sort();
        sorted.dedup();
        for date in sorted {
            held.insert(date, self.lock_day(date).await);
        }

        let source = match source {
            Source::Given(day) => day.clone(),
            Source::Stored(date) => held
                .get(&date)
                .and_then(|guard| guard.as_ref())
                .cloned()
                .unwrap_or_else(DaySchedule::empty),
        };
        if source.entry_count() > MAX_ENTRIES_PER_DAY {
            return Err(rejected(EngineError::LimitExceeded("too many entries on day")));
        }
        let report = PasteReport {
            shift_entries: source.shift_entries().count(),
            leave_entries: source.on_leave.len(),
            dates,
        };

        let mut next_id = match self.config.paste_ids {
            IdPolicy::PerDay => 1,
            IdPolicy::Global => self.global_max_id(&held).await + 1,
        };
        let mut days = Vec::with_capacity(report.dates.len());
        for date in &report.dates {
            if self.config.paste_ids == IdPolicy::PerDay {
                next_id = 1;
            }
            days.push((*date, renumber(&source, &mut next_id)));
        }

        let event = Event::DaysReplaced { days };
        self.wal_append(&event).await?;
        if let Event::DaysReplaced { days } = event {
            for (date, day) in days {
                if let Some(guard) = held.get_mut(&date) {
                    **guard = Some(day);
                }
            }
        }

        metrics::counter!(observability::PASTE_DAYS_TOTAL).increment(report.dates.len() as u64);
        info!(
            days = report.dates.len(),
            entries = report.shift_entries + report.leave_entries,
            policy = %self.config.paste_ids,
            "schedule pasted"
        );
        Ok(report)
    }

    /// Highest entry id on any stored day. Days in `held` are read through the
    /// guards the caller already owns.
    async fn global_max_id(&self, held: &BTreeMap<Date, DayGuard>) -> EntryId {
        let mut max = held
            .values()
            .filter_map(|guard| guard.as_ref())
            .map(DaySchedule::max_id)
            .max()
            .unwrap_or(0);
        for (date, handle) in self.days.handles() {
            if held.contains_key(&date) {
                continue;
            }
            if let Some(day) = handle.read().await.as_ref() {
                max = max.max(day.max_id());
            }
        }
        max
    }
}
