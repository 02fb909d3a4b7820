use crate::model::{Date, EntryId, MemberId, ShiftType, Slot};

#[derive(Debug)]
pub enum EngineError {
    InvalidSlotForShift {
        shift: ShiftType,
        slot: Slot,
    },
    SlotConflict {
        slot: Slot,
        holder: EntryId,
    },
    AssignmentConflict {
        assignment: String,
        holder: EntryId,
    },
    MemberOnLeave(MemberId),
    MemberAlreadyScheduled {
        member_id: MemberId,
        shift: ShiftType,
    },
    MemberNotFound(MemberId),
    InvalidRange {
        start: Date,
        end: Date,
    },
    EmptyRange {
        start: Date,
        end: Date,
    },
    InvalidInput(&'static str),
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidSlotForShift { .. } => "invalid_slot_for_shift",
            EngineError::SlotConflict { .. } => "slot_conflict",
            EngineError::AssignmentConflict { .. } => "assignment_conflict",
            EngineError::MemberOnLeave(_) => "member_on_leave",
            EngineError::MemberAlreadyScheduled { .. } => "member_already_scheduled",
            EngineError::MemberNotFound(_) => "member_not_found",
            EngineError::InvalidRange { .. } => "invalid_range",
            EngineError::EmptyRange { .. } => "empty_range",
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::WalError(_) => "wal_error",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidSlotForShift { shift, slot } => {
                write!(f, "slot {slot} is not valid for shift {shift}")
            }
            EngineError::SlotConflict { slot, holder } => {
                write!(f, "slot {slot} is already taken for this day (entry {holder})")
            }
            EngineError::AssignmentConflict { assignment, holder } => {
                write!(
                    f,
                    "assignment {assignment:?} is already taken for this day (entry {holder})"
                )
            }
            EngineError::MemberOnLeave(id) => write!(f, "member {id} is on leave this day"),
            EngineError::MemberAlreadyScheduled { member_id, shift } => {
                write!(f, "member {member_id} is already scheduled on {shift} this day")
            }
            EngineError::MemberNotFound(id) => write!(f, "team member not found: {id}"),
            EngineError::InvalidRange { start, end } => {
                write!(f, "end date {end} is before start date {start}")
            }
            EngineError::EmptyRange { start, end } => {
                write!(f, "no weekdays between {start} and {end}")
            }
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
