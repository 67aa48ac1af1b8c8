use serde::{Deserialize, Serialize};

use crate::grid::SlotGrid;
use crate::model::SlotTime;

/// The set of slots a user has currently chosen for one booking attempt.
///
/// Always a subset of the grid, kept in grid order. Contiguity (no gaps in
/// grid order) is a postcondition of every engine operation, never a
/// precondition checked elsewhere. Every mutation returns a full replacement;
/// callers must treat the return value as the new authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    slots: Vec<SlotTime>,
}

impl Selection {
    pub fn empty() -> Self {
        Self { slots: Vec::new() }
    }

    /// The full-duration shortcut: every slot in the grid.
    pub fn full(grid: &SlotGrid) -> Self {
        Self { slots: grid.slots().to_vec() }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, slot: SlotTime) -> bool {
        self.slots.binary_search(&slot).is_ok()
    }

    /// Slots in grid order.
    pub fn slots(&self) -> &[SlotTime] {
        &self.slots
    }

    /// Toggle a slot, reproducing the selection form's fill/trim behavior.
    ///
    /// Deselecting (clicked already selected):
    /// - sole selected slot: clears the selection entirely;
    /// - otherwise trims the run to the span between its grid-order minimum
    ///   and the clicked slot, dropping everything outside that span.
    ///
    /// Selecting (clicked not selected):
    /// - empty: just the clicked slot;
    /// - one slot: the range between it and the clicked slot, either order;
    /// - two or more: the envelope from the minimum to the maximum grid index
    ///   of the current run plus the clicked slot. Clicking far from the run
    ///   expands the whole span; the gap fill is intentional.
    ///
    /// # Panics
    ///
    /// Panics if `clicked` is not a member of `grid` — that is a caller
    /// contract violation, not a recoverable condition.
    #[must_use]
    pub fn toggle(&self, grid: &SlotGrid, clicked: SlotTime) -> Selection {
        let clicked_idx = grid
            .index_of(clicked)
            .unwrap_or_else(|| panic!("slot {clicked} is not in the grid"));

        let result = if self.contains(clicked) {
            if self.slots.len() == 1 {
                Selection::empty()
            } else {
                // Trim-to-click: keep the span from the run's start to the
                // clicked slot, inclusive.
                let run_start_idx = grid
                    .index_of(self.slots[0])
                    .expect("selection is a subset of the grid");
                let low = run_start_idx.min(clicked_idx);
                let high = run_start_idx.max(clicked_idx);
                Selection { slots: grid.range(low, high).to_vec() }
            }
        } else if self.slots.is_empty() {
            Selection { slots: vec![clicked] }
        } else {
            // Fill: envelope over the current run plus the clicked slot.
            let first_idx = grid
                .index_of(self.slots[0])
                .expect("selection is a subset of the grid");
            let last_idx = grid
                .index_of(self.slots[self.slots.len() - 1])
                .expect("selection is a subset of the grid");
            let low = first_idx.min(clicked_idx);
            let high = last_idx.max(clicked_idx);
            Selection { slots: grid.range(low, high).to_vec() }
        };

        debug_assert!(result.is_contiguous(grid), "toggle produced a gapped run");
        result
    }

    /// True when the slots form a consecutive index run in the grid.
    /// The empty selection is trivially contiguous.
    pub fn is_contiguous(&self, grid: &SlotGrid) -> bool {
        let mut indices = self.slots.iter().map(|s| grid.index_of(*s));
        let Some(Some(first)) = indices.next() else {
            return self.slots.is_empty();
        };
        let mut prev = first;
        for idx in indices {
            match idx {
                Some(i) if i == prev + 1 => prev = i,
                _ => return false,
            }
        }
        true
    }
}
