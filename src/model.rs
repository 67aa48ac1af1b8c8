use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only absolute time type.
pub type Ms = i64;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Whole minutes since facility-local midnight — the only intra-day time type.
///
/// Renders and parses as zero-padded `HH:MM`. All bookings live in a single
/// fixed facility-local zone, so no offset handling exists anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotTime(u16);

impl SlotTime {
    pub fn from_hm(hour: u16, minute: u16) -> Self {
        debug_assert!(hour < 24 && minute < 60, "SlotTime out of range");
        Self(hour * 60 + minute)
    }

    /// Wraps at midnight: `from_minutes(1440)` is `00:00`.
    pub fn from_minutes(minutes: u16) -> Self {
        Self(minutes % MINUTES_PER_DAY)
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeError(String);

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time literal: {:?}", self.0)
    }
}

impl std::error::Error for ParseTimeError {}

impl FromStr for SlotTime {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(err)?;
        let hour: u16 = h.parse().map_err(|_| err())?;
        let minute: u16 = m.parse().map_err(|_| err())?;
        if hour >= 24 || minute >= 60 {
            return Err(err());
        }
        Ok(Self::from_hm(hour, minute))
    }
}

/// A calendar day in the facility-local zone, `YYYY-MM-DD`.
///
/// Booking dates compare by calendar day, never by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDay {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl CalendarDay {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        debug_assert!((1..=12).contains(&month) && (1..=31).contains(&day));
        Self { year, month, day }
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for CalendarDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let mut parts = s.splitn(3, '-');
        let year: u16 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let month: u8 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let day: u8 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(err());
        }
        Ok(Self { year, month, day })
    }
}

// ── Booking status state machine ─────────────────────────────────

/// Lifecycle status of a committed booking.
///
/// Transitions are guarded centrally by the store:
/// `Pending → Approved`, `Pending → Rejected`, `Approved → Cancelled`.
/// Rejected and Cancelled are terminal and never block scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that occupy slots for conflict purposes.
    pub const SCHEDULING_BLOCKERS: [BookingStatus; 2] =
        [BookingStatus::Pending, BookingStatus::Approved];

    pub fn can_transition(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Approved)
                | (BookingStatus::Pending, BookingStatus::Rejected)
                | (BookingStatus::Approved, BookingStatus::Cancelled)
        )
    }

    pub fn blocks_scheduling(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Approved => "Approved",
            BookingStatus::Rejected => "Rejected",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Resources ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Venue,
    Grounds,
    Vehicle,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Venue => "venue",
            ResourceKind::Grounds => "grounds",
            ResourceKind::Vehicle => "vehicle",
        }
    }
}

/// Identifies one bookable resource. Together with the date this is the unit
/// compared for overlap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub slug: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, slug: impl Into<String>) -> Self {
        Self { kind, slug: slug.into() }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.slug)
    }
}

// ── Booking records ──────────────────────────────────────────────

/// Canonical interval produced by the normalizer. `end` is exclusive: the
/// start of the slot after the last selected one, which may lie outside the
/// grid entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow {
    pub start: SlotTime,
    pub end: SlotTime,
    pub ordered_slots: Vec<SlotTime>,
}

/// A committed booking. Time fields are immutable once created; only status
/// transitions mutate a record after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Ulid,
    pub resource: ResourceKey,
    pub date: CalendarDay,
    pub window: BookingWindow,
    pub full_day: bool,
    pub status: BookingStatus,
    pub event_title: String,
    pub department: String,
    pub requester: String,
    pub requester_email: String,
    pub attendees: u32,
    pub created_at: Ms,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<Ms>,
    pub review_note: Option<String>,
}

impl BookingRecord {
    /// Shared display rule for every rendering surface (approvals, history,
    /// calendar, CSV): full-day bookings get a fixed label, others render
    /// `first-slot - last-slot`, falling back to the raw window bounds when
    /// the slot list is absent.
    pub fn time_display(&self) -> String {
        if self.full_day {
            return "Full Day".to_string();
        }
        match (
            self.window.ordered_slots.first(),
            self.window.ordered_slots.last(),
        ) {
            (Some(first), Some(last)) => format!("{first} - {last}"),
            _ => format!("{} - {}", self.window.start, self.window.end),
        }
    }
}

/// Submission payload. The store assigns the id, sets `Pending`, and stamps
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub resource: ResourceKey,
    pub date: CalendarDay,
    pub window: BookingWindow,
    pub full_day: bool,
    pub event_title: String,
    pub department: String,
    pub requester: String,
    pub requester_email: String,
    pub attendees: u32,
}

impl BookingDraft {
    pub(crate) fn into_record(self, id: Ulid, created_at: Ms) -> BookingRecord {
        BookingRecord {
            id,
            resource: self.resource,
            date: self.date,
            window: self.window,
            full_day: self.full_day,
            status: BookingStatus::Pending,
            event_title: self.event_title,
            department: self.department,
            requester: self.requester,
            requester_email: self.requester_email,
            attendees: self.attendees,
            created_at,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
        }
    }
}

// ── Conflicts ────────────────────────────────────────────────────

/// One committed booking that overlaps a candidate selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub booking_id: Ulid,
    pub event_title: String,
    pub department: String,
    pub status: BookingStatus,
    /// The overlapping slots, in grid order.
    pub slots: Vec<SlotTime>,
}

impl Conflict {
    pub fn describe(&self) -> String {
        format!("\"{}\" ({}) - {}", self.event_title, self.department, self.status)
    }
}

/// Derived, ephemeral result of an availability check. Never persisted;
/// recomputed on every relevant selection/date/resource change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn is_clear(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Human-readable warning in the shape the booking form shows.
    pub fn summary(&self, resource: &ResourceKey, date: CalendarDay) -> Option<String> {
        if self.conflicts.is_empty() {
            return None;
        }
        let listed: Vec<String> = self.conflicts.iter().map(Conflict::describe).collect();
        Some(format!(
            "{resource} is already booked on {date} for: {}",
            listed.join(", ")
        ))
    }
}

// ── Lifecycle events ─────────────────────────────────────────────

/// What happened to a booking — the notify payload. Each variant carries the
/// record snapshot as of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Requested(BookingRecord),
    Approved(BookingRecord),
    Rejected(BookingRecord),
    Cancelled(BookingRecord),
}

impl LifecycleEvent {
    pub fn record(&self) -> &BookingRecord {
        match self {
            LifecycleEvent::Requested(r)
            | LifecycleEvent::Approved(r)
            | LifecycleEvent::Rejected(r)
            | LifecycleEvent::Cancelled(r) => r,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            LifecycleEvent::Requested(_) => "Requested",
            LifecycleEvent::Approved(_) => "Approved",
            LifecycleEvent::Rejected(_) => "Rejected",
            LifecycleEvent::Cancelled(_) => "Cancelled",
        }
    }

    pub fn for_status(status: BookingStatus, record: BookingRecord) -> LifecycleEvent {
        match status {
            BookingStatus::Pending => LifecycleEvent::Requested(record),
            BookingStatus::Approved => LifecycleEvent::Approved(record),
            BookingStatus::Rejected => LifecycleEvent::Rejected(record),
            BookingStatus::Cancelled => LifecycleEvent::Cancelled(record),
        }
    }
}

/// The ledger record format — flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Submitted {
        record: BookingRecord,
    },
    StatusChanged {
        id: Ulid,
        status: BookingStatus,
        reviewed_by: String,
        review_note: Option<String>,
        reviewed_at: Ms,
    },
}
