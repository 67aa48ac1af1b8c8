use crate::model::{MINUTES_PER_DAY, SlotTime};

/// Static ordered catalogue of bookable slot start times.
///
/// Strictly increasing, immutable for the life of the process. Array index —
/// not wall-clock arithmetic — is the sole basis for adjacency and range
/// computations; an excised break simply removes labels from the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    slots: Vec<SlotTime>,
    step_minutes: u16,
}

impl SlotGrid {
    /// Build a grid of `step_minutes`-wide slots starting at `open`, with the
    /// last slot starting strictly before `close`. A close of `00:00` means
    /// midnight. Slots whose start falls in `[break_start, break_end)` are
    /// excised.
    pub fn new(
        open: SlotTime,
        close: SlotTime,
        step_minutes: u16,
        excised_break: Option<(SlotTime, SlotTime)>,
    ) -> Self {
        let close_minutes = match close.minutes() {
            0 => MINUTES_PER_DAY,
            m => m,
        };
        debug_assert!(step_minutes > 0, "slot step must be positive");
        debug_assert!(open.minutes() < close_minutes, "grid must open before it closes");
        let mut slots = Vec::new();
        let mut at = open.minutes();
        while at < close_minutes {
            let slot = SlotTime::from_minutes(at);
            let excised = excised_break
                .is_some_and(|(start, end)| slot >= start && slot < end);
            if !excised {
                slots.push(slot);
            }
            at += step_minutes;
        }
        Self { slots, step_minutes }
    }

    /// The standard facility day: 09:00 through 16:30 at 30-minute steps,
    /// with the 13:30 slot excised for the 13:30-14:00 break.
    pub fn standard_day() -> Self {
        Self::new(
            SlotTime::from_hm(9, 0),
            SlotTime::from_hm(17, 0),
            30,
            Some((SlotTime::from_hm(13, 30), SlotTime::from_hm(14, 0))),
        )
    }

    pub fn step_minutes(&self) -> u16 {
        self.step_minutes
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SlotTime] {
        &self.slots
    }

    pub fn contains(&self, slot: SlotTime) -> bool {
        self.index_of(slot).is_some()
    }

    /// Grid-order position of a slot.
    pub fn index_of(&self, slot: SlotTime) -> Option<usize> {
        self.slots.binary_search(&slot).ok()
    }

    /// The contiguous run of slots between two grid indices, inclusive.
    pub fn range(&self, low: usize, high: usize) -> &[SlotTime] {
        &self.slots[low..=high]
    }
}
