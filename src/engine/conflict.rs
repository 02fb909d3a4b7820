use crate::catalog::valid_slots_for;
use crate::limits::*;
use crate::model::*;

use super::EngineError;

// Slots and assignment labels are exclusive per day, across every shift list.
// Entries without a slot or assignment never take part in these checks.

pub fn is_slot_valid_for_shift(shift: ShiftType, slot: Slot) -> bool {
    valid_slots_for(shift).contains(&slot)
}

pub fn is_slot_taken(schedule: &DaySchedule, slot: Slot) -> bool {
    slot_holder(schedule, slot, None).is_some()
}

/// Same as [`is_slot_taken`] but ignores the entry being edited.
pub fn is_slot_taken_excluding(schedule: &DaySchedule, slot: Slot, exclude: EntryId) -> bool {
    slot_holder(schedule, slot, Some(exclude)).is_some()
}

pub fn is_assignment_taken(schedule: &DaySchedule, assignment: &str) -> bool {
    assignment_holder(schedule, assignment, None).is_some()
}

pub fn is_assignment_taken_excluding(
    schedule: &DaySchedule,
    assignment: &str,
    exclude: EntryId,
) -> bool {
    assignment_holder(schedule, assignment, Some(exclude)).is_some()
}

fn slot_holder(schedule: &DaySchedule, slot: Slot, exclude: Option<EntryId>) -> Option<EntryId> {
    schedule
        .shift_entries()
        .map(|(_, e)| e)
        .filter(|e| Some(e.id) != exclude)
        .find(|e| e.slot == Some(slot))
        .map(|e| e.id)
}

fn assignment_holder(
    schedule: &DaySchedule,
    assignment: &str,
    exclude: Option<EntryId>,
) -> Option<EntryId> {
    let wanted = assignment.trim();
    if wanted.is_empty() {
        return None;
    }
    schedule
        .shift_entries()
        .map(|(_, e)| e)
        .filter(|e| Some(e.id) != exclude)
        .find(|e| e.assignment.as_deref() == Some(wanted))
        .map(|e| e.id)
}

/// Where a member already appears on a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Booking {
    Shift { shift: ShiftType, id: EntryId },
    Leave { id: EntryId },
}

/// First place `member_id` appears on the day, skipping shift entry `exclude`.
pub fn member_booking(
    schedule: &DaySchedule,
    member_id: MemberId,
    exclude: Option<EntryId>,
) -> Option<Booking> {
    let on_shift = schedule
        .shift_entries()
        .find(|(_, e)| e.member_id == member_id && Some(e.id) != exclude)
        .map(|(shift, e)| Booking::Shift { shift, id: e.id });
    on_shift.or_else(|| {
        schedule
            .on_leave
            .iter()
            .find(|l| l.member_id == member_id)
            .map(|l| Booking::Leave { id: l.id })
    })
}

// ── Gates run by the mutator before every write ──────────────────

fn check_slot(
    schedule: &DaySchedule,
    shift: ShiftType,
    slot: Option<Slot>,
    exclude: Option<EntryId>,
) -> Result<(), EngineError> {
    let Some(slot) = slot else { return Ok(()) };
    // A held slot is reported as a conflict even when it is also outside the shift.
    if let Some(holder) = slot_holder(schedule, slot, exclude) {
        return Err(EngineError::SlotConflict { slot, holder });
    }
    if !is_slot_valid_for_shift(shift, slot) {
        return Err(EngineError::InvalidSlotForShift { shift, slot });
    }
    Ok(())
}

fn check_assignment(
    schedule: &DaySchedule,
    assignment: Option<&str>,
    exclude: Option<EntryId>,
) -> Result<(), EngineError> {
    let Some(assignment) = assignment else { return Ok(()) };
    if assignment.len() > MAX_LABEL_LEN {
        return Err(EngineError::LimitExceeded("assignment label too long"));
    }
    if let Some(holder) = assignment_holder(schedule, assignment, exclude) {
        return Err(EngineError::AssignmentConflict {
            assignment: assignment.to_string(),
            holder,
        });
    }
    Ok(())
}

fn check_member_free(
    schedule: &DaySchedule,
    member_id: MemberId,
    exclude: Option<EntryId>,
) -> Result<(), EngineError> {
    match member_booking(schedule, member_id, exclude) {
        None => Ok(()),
        Some(Booking::Leave { .. }) => Err(EngineError::MemberOnLeave(member_id)),
        Some(Booking::Shift { shift, .. }) => {
            Err(EngineError::MemberAlreadyScheduled { member_id, shift })
        }
    }
}

fn check_day_capacity(schedule: &DaySchedule) -> Result<(), EngineError> {
    if schedule.entry_count() >= MAX_ENTRIES_PER_DAY {
        return Err(EngineError::LimitExceeded("too many entries on day"));
    }
    Ok(())
}

pub(crate) fn check_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidInput("member name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("member name too long"));
    }
    Ok(())
}

pub(crate) fn check_new_entry(
    schedule: &DaySchedule,
    shift: ShiftType,
    new: &NewShiftEntry,
) -> Result<(), EngineError> {
    check_name(&new.member_name)?;
    check_day_capacity(schedule)?;
    check_slot(schedule, shift, new.slot, None)?;
    check_assignment(schedule, new.assignment.as_deref(), None)?;
    check_member_free(schedule, new.member_id, None)
}

/// Only fields whose value changes are re-checked, so an entry never
/// conflicts with itself.
pub(crate) fn check_entry_update(
    schedule: &DaySchedule,
    shift: ShiftType,
    current: &ShiftEntry,
    next: &ShiftEntry,
) -> Result<(), EngineError> {
    if next.member_name != current.member_name {
        check_name(&next.member_name)?;
    }
    if next.slot != current.slot {
        check_slot(schedule, shift, next.slot, Some(current.id))?;
    }
    if next.assignment != current.assignment {
        check_assignment(schedule, next.assignment.as_deref(), Some(current.id))?;
    }
    if next.member_id != current.member_id {
        check_member_free(schedule, next.member_id, Some(current.id))?;
    }
    Ok(())
}

pub(crate) fn check_new_leave(schedule: &DaySchedule, new: &NewLeaveEntry) -> Result<(), EngineError> {
    check_name(&new.member_name)?;
    if new.reason.trim().is_empty() {
        return Err(EngineError::InvalidInput("leave reason must not be empty"));
    }
    if new.reason.len() > MAX_REASON_LEN {
        return Err(EngineError::LimitExceeded("leave reason too long"));
    }
    check_day_capacity(schedule)?;
    check_member_free(schedule, new.member_id, None)
}
