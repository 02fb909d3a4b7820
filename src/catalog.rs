//! Static shift catalog: which slots each shift accepts, plus display metadata.

use crate::model::{ShiftType, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftInfo {
    pub shift: ShiftType,
    pub label: &'static str,
    pub time_range: &'static str,
    pub slots: &'static [Slot],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: Slot,
    pub ist_range: &'static str,
    pub cet_range: &'static str,
}

pub const SHIFTS: [ShiftInfo; 6] = [
    ShiftInfo {
        shift: ShiftType::Jpn,
        label: "JPN Shift",
        time_range: "05:30-14:30 IST",
        slots: &[Slot(1), Slot(2)],
    },
    ShiftInfo {
        shift: ShiftType::Ist,
        label: "IST Shift",
        time_range: "09:30-18:30 IST",
        slots: &[Slot(2), Slot(3)],
    },
    ShiftInfo {
        shift: ShiftType::CetEarly,
        label: "CET Early Shift",
        time_range: "12:30-21:00 IST",
        slots: &[Slot(3)],
    },
    ShiftInfo {
        shift: ShiftType::CetLate,
        label: "CET Late Shift",
        time_range: "14:30-23:30 IST",
        slots: &[Slot(4)],
    },
    ShiftInfo {
        shift: ShiftType::UsEarly,
        label: "US Early Shift",
        time_range: "18:30-03:30 IST",
        slots: &[Slot(5)],
    },
    ShiftInfo {
        shift: ShiftType::UsLate,
        label: "US Late Shift",
        time_range: "20:30-05:30 IST",
        slots: &[Slot(5), Slot(6)],
    },
];

pub const SLOTS: [SlotInfo; 6] = [
    SlotInfo { slot: Slot(1), ist_range: "05:30-09:30 IST", cet_range: "01:00-05:00 CET" },
    SlotInfo { slot: Slot(2), ist_range: "09:30-13:30 IST", cet_range: "05:00-09:00 CET" },
    SlotInfo { slot: Slot(3), ist_range: "13:30-17:30 IST", cet_range: "09:00-13:00 CET" },
    SlotInfo { slot: Slot(4), ist_range: "17:30-21:30 IST", cet_range: "13:00-17:00 CET" },
    SlotInfo { slot: Slot(5), ist_range: "21:30-01:30 IST", cet_range: "17:00-21:00 CET" },
    SlotInfo { slot: Slot(6), ist_range: "01:30-05:30 IST", cet_range: "21:00-01:00 CET" },
];

pub fn shift_info(shift: ShiftType) -> &'static ShiftInfo {
    // SHIFTS is laid out in ShiftType declaration order.
    &SHIFTS[shift as usize]
}

pub fn slot_info(slot: Slot) -> &'static SlotInfo {
    &SLOTS[usize::from(slot.get() - Slot::MIN)]
}

pub fn valid_slots_for(shift: ShiftType) -> &'static [Slot] {
    shift_info(shift).slots
}

/// e.g. `Slot 2 (09:30-13:30 IST)`
pub fn slot_label(slot: Slot) -> String {
    format!("Slot {} ({})", slot, slot_info(slot).ist_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_shift_types() {
        for (i, shift) in ShiftType::ALL.into_iter().enumerate() {
            assert_eq!(SHIFTS[i].shift, shift);
            assert!(!valid_slots_for(shift).is_empty());
        }
        for slot in Slot::all() {
            assert_eq!(slot_info(slot).slot, slot);
        }
    }

    #[test]
    fn slot_sets_overlap_between_shifts() {
        let two = Slot::new(2).unwrap();
        assert!(valid_slots_for(ShiftType::Jpn).contains(&two));
        assert!(valid_slots_for(ShiftType::Ist).contains(&two));
        let five = Slot::new(5).unwrap();
        assert!(valid_slots_for(ShiftType::UsEarly).contains(&five));
        assert!(valid_slots_for(ShiftType::UsLate).contains(&five));
    }

    #[test]
    fn every_slot_is_reachable_from_some_shift() {
        for slot in Slot::all() {
            assert!(SHIFTS.iter().any(|s| s.slots.contains(&slot)), "slot {slot} unreachable");
        }
    }

    #[test]
    fn labels() {
        assert_eq!(slot_label(Slot::new(2).unwrap()), "Slot 2 (09:30-13:30 IST)");
        assert_eq!(shift_info(ShiftType::CetLate).label, "CET Late Shift");
    }
}
