use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar day a schedule document is keyed by.
pub type Date = NaiveDate;

/// Entry id. Unique within one day's schedule only.
pub type EntryId = u32;

pub type MemberId = u32;

/// Wire and storage format of a date key.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(s: &str) -> Option<Date> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

// ── Shifts & slots ───────────────────────────────────────────────

/// Time-zone aligned duty window. Declaration order is catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftType {
    Jpn,
    Ist,
    CetEarly,
    CetLate,
    UsEarly,
    UsLate,
}

impl ShiftType {
    pub const ALL: [ShiftType; 6] = [
        ShiftType::Jpn,
        ShiftType::Ist,
        ShiftType::CetEarly,
        ShiftType::CetLate,
        ShiftType::UsEarly,
        ShiftType::UsLate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftType::Jpn => "JPN",
            ShiftType::Ist => "IST",
            ShiftType::CetEarly => "CET_EARLY",
            ShiftType::CetLate => "CET_LATE",
            ShiftType::UsEarly => "US_EARLY",
            ShiftType::UsLate => "US_LATE",
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownShift(pub String);

impl fmt::Display for UnknownShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown shift type: {}", self.0)
    }
}

impl std::error::Error for UnknownShift {}

impl FromStr for ShiftType {
    type Err = UnknownShift;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ShiftType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownShift(wanted.to_string()))
    }
}

/// Company-wide rotating duty window, `1..=6`. Exclusive per day across all shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(pub(crate) u8);

impl Slot {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub const fn new(n: u8) -> Option<Slot> {
        if n >= Self::MIN && n <= Self::MAX {
            Some(Slot(n))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Slot> {
        (Self::MIN..=Self::MAX).map(Slot)
    }
}

impl TryFrom<u8> for Slot {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Slot::new(n).ok_or_else(|| format!("slot {n} out of range {}-{}", Slot::MIN, Slot::MAX))
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Entries ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftEntry {
    pub id: EntryId,
    pub member_id: MemberId,
    pub member_name: String,
    #[serde(default)]
    pub slot: Option<Slot>,
    #[serde(default)]
    pub assignment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveEntry {
    pub id: EntryId,
    pub member_id: MemberId,
    pub member_name: String,
    pub reason: String,
}

/// All shift and leave entries of one calendar day: the unit of consistency.
///
/// Every shift type is always present as a key. Documents missing some (older
/// or partial writes) are filled with empty lists when read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredDay", rename_all = "camelCase")]
pub struct DaySchedule {
    pub shifts: BTreeMap<ShiftType, Vec<ShiftEntry>>,
    pub on_leave: Vec<LeaveEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDay {
    #[serde(default)]
    shifts: BTreeMap<ShiftType, Vec<ShiftEntry>>,
    #[serde(default)]
    on_leave: Vec<LeaveEntry>,
}

impl From<StoredDay> for DaySchedule {
    fn from(stored: StoredDay) -> Self {
        let mut day = DaySchedule {
            shifts: stored.shifts,
            on_leave: stored.on_leave,
        };
        day.fill_missing_shifts();
        day
    }
}

impl Default for DaySchedule {
    fn default() -> Self {
        Self::empty()
    }
}

impl DaySchedule {
    pub fn empty() -> Self {
        let mut day = DaySchedule {
            shifts: BTreeMap::new(),
            on_leave: Vec::new(),
        };
        day.fill_missing_shifts();
        day
    }

    fn fill_missing_shifts(&mut self) {
        for shift in ShiftType::ALL {
            self.shifts.entry(shift).or_default();
        }
    }

    pub fn shift(&self, shift: ShiftType) -> &[ShiftEntry] {
        self.shifts.get(&shift).map_or(&[], Vec::as_slice)
    }

    pub fn shift_mut(&mut self, shift: ShiftType) -> &mut Vec<ShiftEntry> {
        self.shifts.entry(shift).or_default()
    }

    /// Every shift entry of the day, in catalog order.
    pub fn shift_entries(&self) -> impl Iterator<Item = (ShiftType, &ShiftEntry)> {
        self.shifts
            .iter()
            .flat_map(|(shift, entries)| entries.iter().map(move |e| (*shift, e)))
    }

    pub fn find_entry(&self, shift: ShiftType, id: EntryId) -> Option<&ShiftEntry> {
        self.shift(shift).iter().find(|e| e.id == id)
    }

    pub fn find_leave(&self, id: EntryId) -> Option<&LeaveEntry> {
        self.on_leave.iter().find(|l| l.id == id)
    }

    /// Shift and leave entries combined.
    pub fn entry_count(&self) -> usize {
        self.shifts.values().map(Vec::len).sum::<usize>() + self.on_leave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Highest id across shift and leave entries, 0 for an empty day.
    pub fn max_id(&self) -> EntryId {
        self.shift_entries()
            .map(|(_, e)| e.id)
            .chain(self.on_leave.iter().map(|l| l.id))
            .max()
            .unwrap_or(0)
    }

    pub fn next_id(&self) -> EntryId {
        self.max_id() + 1
    }
}

/// Outcome of an update or delete addressed by date and entry id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    /// Nothing was ever written for the date.
    ScheduleNotFound,
    EntryNotFound,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(v) => Some(v),
            _ => None,
        }
    }
}

// ── Mutation inputs ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShiftEntry {
    pub member_id: MemberId,
    pub member_name: String,
    pub slot: Option<Slot>,
    pub assignment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaveEntry {
    pub member_id: MemberId,
    pub member_name: String,
    pub reason: String,
}

/// Field-level overwrite of a shift entry. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub member_id: Option<MemberId>,
    pub member_name: Option<String>,
    pub slot: Option<Option<Slot>>,
    pub assignment: Option<Option<String>>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        *self == EntryUpdate::default()
    }

    pub fn apply_to(&self, entry: &ShiftEntry) -> ShiftEntry {
        let mut next = entry.clone();
        if let Some(member_id) = self.member_id {
            next.member_id = member_id;
        }
        if let Some(ref name) = self.member_name {
            next.member_name = name.clone();
        }
        if let Some(slot) = self.slot {
            next.slot = slot;
        }
        if let Some(ref assignment) = self.assignment {
            next.assignment = normalize_label(assignment.as_deref());
        }
        next
    }
}

/// Trim an assignment label; blank labels mean "no assignment".
pub fn normalize_label(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

// ── Roster ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: MemberId,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub active: Option<bool>,
}

/// Global roster plus the reusable label catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub members: BTreeMap<MemberId, TeamMember>,
    pub assignment_labels: Vec<String>,
    pub leave_reasons: Vec<String>,
}

impl Roster {
    pub fn next_member_id(&self) -> MemberId {
        self.members.keys().next_back().map_or(1, |max| max + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.assignment_labels.is_empty() && self.leave_reasons.is_empty()
    }
}

/// The event types. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ShiftEntryAdded {
        date: Date,
        shift: ShiftType,
        entry: ShiftEntry,
    },
    /// Carries the entry as it is after the update.
    ShiftEntryUpdated {
        date: Date,
        shift: ShiftType,
        entry: ShiftEntry,
    },
    ShiftEntryRemoved {
        date: Date,
        shift: ShiftType,
        id: EntryId,
    },
    LeaveAdded {
        date: Date,
        entry: LeaveEntry,
    },
    LeaveRemoved {
        date: Date,
        id: EntryId,
    },
    /// Whole-document overwrite of several days at once (paste, compaction).
    DaysReplaced {
        days: Vec<(Date, DaySchedule)>,
    },
    MemberAdded {
        member: TeamMember,
    },
    MemberUpdated {
        member: TeamMember,
    },
    MemberRemoved {
        id: MemberId,
    },
    AssignmentLabelAdded {
        label: String,
    },
    LeaveReasonAdded {
        reason: String,
    },
}

impl Event {
    /// The single day an event touches, if it is day-scoped.
    pub fn date(&self) -> Option<Date> {
        match self {
            Event::ShiftEntryAdded { date, .. }
            | Event::ShiftEntryUpdated { date, .. }
            | Event::ShiftEntryRemoved { date, .. }
            | Event::LeaveAdded { date, .. }
            | Event::LeaveRemoved { date, .. } => Some(*date),
            _ => None,
        }
    }
}
