use crate::grid::SlotGrid;
use crate::model::{BookingWindow, SlotTime};

use super::error::EngineError;
use super::selection::Selection;

/// Convert a selection into its canonical window for storage and display.
///
/// `start` is the first selected slot; `end` is exclusive — the last slot's
/// start plus the grid step, computed arithmetically (modulo 24h) rather than
/// by grid lookup, because the end of the last bookable slot lies outside the
/// grid. An empty selection is a validation failure, not a crash.
pub fn normalize(selection: &Selection, grid: &SlotGrid) -> Result<BookingWindow, EngineError> {
    let ordered_slots = selection.slots().to_vec();
    let (Some(&first), Some(&last)) = (ordered_slots.first(), ordered_slots.last()) else {
        return Err(EngineError::EmptySelection);
    };
    let end = SlotTime::from_minutes(last.minutes() + grid.step_minutes());
    Ok(BookingWindow { start: first, end, ordered_slots })
}
