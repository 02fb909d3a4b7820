use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_entry_update, check_name, check_new_entry, check_new_leave};
use super::{Engine, EngineError, WalCommand, rejected};

/// Days per `DaysReplaced` record in a compaction snapshot. A full day
/// encodes to well under 64 KiB, so a chunk stays far below the WAL frame cap.
pub(crate) const SNAPSHOT_DAYS_PER_EVENT: usize = 256;

fn check_catalog_text(text: &str, max_len: usize, what: &'static str) -> Result<(), EngineError> {
    if text.is_empty() {
        return Err(EngineError::InvalidInput(what));
    }
    if text.len() > max_len {
        return Err(EngineError::LimitExceeded("catalog entry too long"));
    }
    Ok(())
}

impl Engine {
    // ── Shift entries ────────────────────────────────────────────

    /// Add a member to one shift of `date`, creating the day if needed.
    /// The new entry takes the day's next id.
    pub async fn add_shift_member(
        &self,
        date: Date,
        shift: ShiftType,
        new: NewShiftEntry,
    ) -> Result<ShiftEntry, EngineError> {
        let new = NewShiftEntry {
            member_name: new.member_name.trim().to_string(),
            assignment: normalize_label(new.assignment.as_deref()),
            ..new
        };
        let _gate = self.compaction_gate.read().await;
        let mut guard = self.lock_day(date).await;

        let empty = DaySchedule::empty();
        let day = guard.as_ref().unwrap_or(&empty);
        check_new_entry(day, shift, &new).map_err(rejected)?;
        let entry = ShiftEntry {
            id: day.next_id(),
            member_id: new.member_id,
            member_name: new.member_name,
            slot: new.slot,
            assignment: new.assignment,
        };

        let event = Event::ShiftEntryAdded {
            date,
            shift,
            entry: entry.clone(),
        };
        self.persist_day(&mut guard, &event).await?;
        debug!(%date, %shift, id = entry.id, member = entry.member_id, "shift entry added");
        Ok(entry)
    }

    /// Overwrite the given fields of one shift entry. Only fields that change
    /// are re-validated; an update that changes nothing writes nothing.
    pub async fn update_shift_member(
        &self,
        date: Date,
        shift: ShiftType,
        id: EntryId,
        update: EntryUpdate,
    ) -> Result<Outcome<ShiftEntry>, EngineError> {
        let _gate = self.compaction_gate.read().await;
        let Some(mut guard) = self.lock_existing_day(date).await else {
            return Ok(Outcome::ScheduleNotFound);
        };
        let Some(day) = guard.as_ref() else {
            return Ok(Outcome::ScheduleNotFound);
        };
        let Some(current) = day.find_entry(shift, id) else {
            return Ok(Outcome::EntryNotFound);
        };

        let update = EntryUpdate {
            member_name: update.member_name.map(|n| n.trim().to_string()),
            ..update
        };
        let next = update.apply_to(current);
        if next == *current {
            return Ok(Outcome::Applied(next));
        }
        check_entry_update(day, shift, current, &next).map_err(rejected)?;

        let event = Event::ShiftEntryUpdated {
            date,
            shift,
            entry: next.clone(),
        };
        self.persist_day(&mut guard, &event).await?;
        debug!(%date, %shift, id, "shift entry updated");
        Ok(Outcome::Applied(next))
    }

    /// Remove one shift entry. Ids of the remaining entries are untouched.
    pub async fn delete_shift_member(
        &self,
        date: Date,
        shift: ShiftType,
        id: EntryId,
    ) -> Result<Outcome<ShiftEntry>, EngineError> {
        let _gate = self.compaction_gate.read().await;
        let Some(mut guard) = self.lock_existing_day(date).await else {
            return Ok(Outcome::ScheduleNotFound);
        };
        let Some(day) = guard.as_ref() else {
            return Ok(Outcome::ScheduleNotFound);
        };
        let Some(removed) = day.find_entry(shift, id).cloned() else {
            return Ok(Outcome::EntryNotFound);
        };

        let event = Event::ShiftEntryRemoved { date, shift, id };
        self.persist_day(&mut guard, &event).await?;
        debug!(%date, %shift, id, "shift entry removed");
        Ok(Outcome::Applied(removed))
    }

    // ── Leave ────────────────────────────────────────────────────

    pub async fn add_on_leave(
        &self,
        date: Date,
        new: NewLeaveEntry,
    ) -> Result<LeaveEntry, EngineError> {
        let new = NewLeaveEntry {
            member_name: new.member_name.trim().to_string(),
            reason: new.reason.trim().to_string(),
            ..new
        };
        let _gate = self.compaction_gate.read().await;
        let mut guard = self.lock_day(date).await;

        let empty = DaySchedule::empty();
        let day = guard.as_ref().unwrap_or(&empty);
        check_new_leave(day, &new).map_err(rejected)?;
        let entry = LeaveEntry {
            id: day.next_id(),
            member_id: new.member_id,
            member_name: new.member_name,
            reason: new.reason,
        };

        let event = Event::LeaveAdded {
            date,
            entry: entry.clone(),
        };
        self.persist_day(&mut guard, &event).await?;
        debug!(%date, id = entry.id, member = entry.member_id, "leave added");
        Ok(entry)
    }

    pub async fn delete_on_leave(
        &self,
        date: Date,
        id: EntryId,
    ) -> Result<Outcome<LeaveEntry>, EngineError> {
        let _gate = self.compaction_gate.read().await;
        let Some(mut guard) = self.lock_existing_day(date).await else {
            return Ok(Outcome::ScheduleNotFound);
        };
        let Some(day) = guard.as_ref() else {
            return Ok(Outcome::ScheduleNotFound);
        };
        let Some(removed) = day.find_leave(id).cloned() else {
            return Ok(Outcome::EntryNotFound);
        };

        let event = Event::LeaveRemoved { date, id };
        self.persist_day(&mut guard, &event).await?;
        debug!(%date, id, "leave removed");
        Ok(Outcome::Applied(removed))
    }

    // ── Roster ───────────────────────────────────────────────────

    /// Add a member under the next free id (highest existing + 1).
    pub async fn add_member(&self, name: &str) -> Result<TeamMember, EngineError> {
        let name = name.trim();
        check_name(name).map_err(rejected)?;
        let _gate = self.compaction_gate.read().await;
        let mut roster = self.roster.write().await;
        if roster.members.len() >= MAX_ROSTER_SIZE {
            return Err(rejected(EngineError::LimitExceeded("too many team members")));
        }
        let member = TeamMember {
            id: roster.next_member_id(),
            name: name.to_string(),
            active: true,
        };
        let event = Event::MemberAdded {
            member: member.clone(),
        };
        self.persist_roster(&mut roster, &event).await?;
        info!(id = member.id, name = %member.name, "team member added");
        Ok(member)
    }

    pub async fn update_member(
        &self,
        id: MemberId,
        update: MemberUpdate,
    ) -> Result<TeamMember, EngineError> {
        let _gate = self.compaction_gate.read().await;
        let mut roster = self.roster.write().await;
        let current = roster
            .members
            .get(&id)
            .ok_or(EngineError::MemberNotFound(id))
            .map_err(rejected)?;

        let mut member = current.clone();
        if let Some(name) = update.name {
            let name = name.trim();
            check_name(name).map_err(rejected)?;
            member.name = name.to_string();
        }
        if let Some(active) = update.active {
            member.active = active;
        }
        if member == *current {
            return Ok(member);
        }

        let event = Event::MemberUpdated {
            member: member.clone(),
        };
        self.persist_roster(&mut roster, &event).await?;
        info!(id, name = %member.name, active = member.active, "team member updated");
        Ok(member)
    }

    /// Remove a member from the roster. Entries already naming them on
    /// stored days keep their id and name.
    pub async fn remove_member(&self, id: MemberId) -> Result<TeamMember, EngineError> {
        let _gate = self.compaction_gate.read().await;
        let mut roster = self.roster.write().await;
        let removed = roster
            .members
            .get(&id)
            .cloned()
            .ok_or(EngineError::MemberNotFound(id))
            .map_err(rejected)?;
        self.persist_roster(&mut roster, &Event::MemberRemoved { id })
            .await?;
        info!(id, "team member removed");
        Ok(removed)
    }

    // ── Catalogs ─────────────────────────────────────────────────

    /// Append a reusable assignment label. Returns false if it already existed.
    pub async fn add_assignment_label(&self, label: &str) -> Result<bool, EngineError> {
        let label = label.trim();
        check_catalog_text(label, MAX_LABEL_LEN, "assignment label must not be empty")
            .map_err(rejected)?;
        let _gate = self.compaction_gate.read().await;
        let mut roster = self.roster.write().await;
        if roster.assignment_labels.iter().any(|l| l == label) {
            return Ok(false);
        }
        if roster.assignment_labels.len() >= MAX_CATALOG_LEN {
            return Err(rejected(EngineError::LimitExceeded("too many assignment labels")));
        }
        let event = Event::AssignmentLabelAdded {
            label: label.to_string(),
        };
        self.persist_roster(&mut roster, &event).await?;
        Ok(true)
    }

    /// Append a reusable leave reason. Returns false if it already existed.
    pub async fn add_leave_reason(&self, reason: &str) -> Result<bool, EngineError> {
        let reason = reason.trim();
        check_catalog_text(reason, MAX_REASON_LEN, "leave reason must not be empty")
            .map_err(rejected)?;
        let _gate = self.compaction_gate.read().await;
        let mut roster = self.roster.write().await;
        if roster.leave_reasons.iter().any(|r| r == reason) {
            return Ok(false);
        }
        if roster.leave_reasons.len() >= MAX_CATALOG_LEN {
            return Err(rejected(EngineError::LimitExceeded("too many leave reasons")));
        }
        let event = Event::LeaveReasonAdded {
            reason: reason.to_string(),
        };
        self.persist_roster(&mut roster, &event).await?;
        Ok(true)
    }

    // ── Bulk load ────────────────────────────────────────────────

    /// Write a roster and a set of days exactly as given, bypassing the
    /// validator. Used to load seed data into an empty tenant.
    pub(crate) async fn import(
        &self,
        members: Vec<TeamMember>,
        labels: Vec<String>,
        reasons: Vec<String>,
        days: Vec<(Date, DaySchedule)>,
    ) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        {
            let mut roster = self.roster.write().await;
            let events = members
                .into_iter()
                .map(|member| Event::MemberAdded { member })
                .chain(labels.into_iter().map(|label| Event::AssignmentLabelAdded { label }))
                .chain(reasons.into_iter().map(|reason| Event::LeaveReasonAdded { reason }));
            for event in events {
                self.persist_roster(&mut roster, &event).await?;
            }
        }
        if days.is_empty() {
            return Ok(());
        }

        let _serial = self.paste_lock.lock().await;
        let mut targets: Vec<Date> = days.iter().map(|(date, _)| *date).collect();
        targets.sort();
        targets.dedup();
        let mut guards = Vec::with_capacity(targets.len());
        for date in &targets {
            guards.push((*date, self.lock_day(*date).await));
        }
        let event = Event::DaysReplaced { days };
        self.wal_append(&event).await?;
        let Event::DaysReplaced { days } = event else {
            return Ok(());
        };
        for (date, day) in days {
            if let Some((_, guard)) = guards.iter_mut().find(|(d, _)| *d == date) {
                **guard = Some(day);
            }
        }
        Ok(())
    }

    // ── WAL maintenance ──────────────────────────────────────────

    /// Everything needed to rebuild the current state: the roster, the
    /// catalogs, and whole-document overwrites of every present day, at most
    /// [`SNAPSHOT_DAYS_PER_EVENT`] days per record.
    pub(super) async fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        {
            let roster = self.roster.read().await;
            events.extend(
                roster
                    .members
                    .values()
                    .cloned()
                    .map(|member| Event::MemberAdded { member }),
            );
            events.extend(
                roster
                    .assignment_labels
                    .iter()
                    .cloned()
                    .map(|label| Event::AssignmentLabelAdded { label }),
            );
            events.extend(
                roster
                    .leave_reasons
                    .iter()
                    .cloned()
                    .map(|reason| Event::LeaveReasonAdded { reason }),
            );
        }
        let days = self.days.scan().await;
        events.extend(
            days.chunks(SNAPSHOT_DAYS_PER_EVENT)
                .map(|chunk| Event::DaysReplaced {
                    days: chunk.to_vec(),
                }),
        );
        events
    }

    /// Rewrite the WAL as a snapshot of the current state. Writers are held
    /// off until the snapshot has replaced the log.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _quiesced = self.compaction_gate.write().await;
        let events = self.snapshot_events().await;
        let count = events.len();

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        debug!(events = count, "WAL compacted");
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
