use std::collections::BTreeSet;

use crate::model::*;

use super::conflict::{is_assignment_taken, is_slot_taken, member_booking};
use super::{Engine, EngineError};

impl Engine {
    /// The day's schedule. A day never written reads as the empty schedule,
    /// and every shift type is always present.
    pub async fn schedule(&self, date: Date) -> DaySchedule {
        self.days.load(date).await.unwrap_or_default()
    }

    /// The stored document, or `None` if nothing was ever written for `date`.
    pub async fn load_schedule(&self, date: Date) -> Option<DaySchedule> {
        self.days.load(date).await
    }

    pub async fn schedule_exists(&self, date: Date) -> bool {
        self.days.load(date).await.is_some()
    }

    /// Every stored day, sorted by date.
    pub async fn scan_schedules(&self) -> Vec<(Date, DaySchedule)> {
        self.days.scan().await
    }

    pub async fn scheduled_dates(&self) -> Vec<Date> {
        self.days
            .scan()
            .await
            .into_iter()
            .map(|(date, _)| date)
            .collect()
    }

    pub async fn slot_taken(&self, date: Date, slot: Slot) -> bool {
        is_slot_taken(&self.schedule(date).await, slot)
    }

    pub async fn assignment_taken(&self, date: Date, assignment: &str) -> bool {
        is_assignment_taken(&self.schedule(date).await, assignment)
    }

    /// Slots nobody holds on `date`, ascending.
    pub async fn free_slots(&self, date: Date) -> Vec<Slot> {
        let day = self.schedule(date).await;
        Slot::all().filter(|slot| !is_slot_taken(&day, *slot)).collect()
    }

    /// Shifts with no entries on `date`, in catalog order.
    pub async fn empty_shifts(&self, date: Date) -> Vec<ShiftType> {
        let day = self.schedule(date).await;
        ShiftType::ALL
            .into_iter()
            .filter(|shift| day.shift(*shift).is_empty())
            .collect()
    }

    /// Members appearing anywhere on `date`, on a shift or on leave.
    pub async fn booked_member_ids(&self, date: Date) -> Vec<MemberId> {
        let day = self.schedule(date).await;
        let ids: BTreeSet<MemberId> = day
            .shift_entries()
            .map(|(_, e)| e.member_id)
            .chain(day.on_leave.iter().map(|l| l.member_id))
            .collect();
        ids.into_iter().collect()
    }

    pub async fn is_member_booked(&self, date: Date, member_id: MemberId) -> bool {
        member_booking(&self.schedule(date).await, member_id, None).is_some()
    }

    // ── Roster & catalogs ────────────────────────────────────────

    /// Every member, by id.
    pub async fn list_all_members(&self) -> Vec<TeamMember> {
        self.roster.read().await.members.values().cloned().collect()
    }

    /// Active members sorted by name, the order pickers offer them in.
    pub async fn list_active_members(&self) -> Vec<TeamMember> {
        let mut active: Vec<TeamMember> = self
            .roster
            .read()
            .await
            .members
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        active
    }

    pub async fn member(&self, id: MemberId) -> Option<TeamMember> {
        self.roster.read().await.members.get(&id).cloned()
    }

    /// Look up a member, failing if the id is not on the roster.
    pub async fn resolve_member(&self, id: MemberId) -> Result<TeamMember, EngineError> {
        self.member(id).await.ok_or(EngineError::MemberNotFound(id))
    }

    pub async fn assignment_labels(&self) -> Vec<String> {
        self.roster.read().await.assignment_labels.clone()
    }

    pub async fn leave_reasons(&self) -> Vec<String> {
        self.roster.read().await.leave_reasons.clone()
    }

    pub async fn roster_is_empty(&self) -> bool {
        self.roster.read().await.is_empty()
    }
}
