use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::engine::{EngineError, Selection, check_conflicts, normalize};
use crate::grid::SlotGrid;
use crate::model::{BookingDraft, BookingRecord, CalendarDay, ConflictReport, ResourceKey, SlotTime};
use crate::store::{BookingStore, StoreError};

/// How the user is picking a duration. Manual toggles are rejected while
/// `FullDay` is active so the selection cannot drift from "all slots".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationMode {
    #[default]
    Custom,
    FullDay,
}

/// Submission gating failures. Engine-level contract errors surface here as
/// form-level validation values, never as raw panics.
#[derive(Debug)]
pub enum SessionError {
    EmptySelection,
    FullDayActive,
    /// A non-empty conflict report is current; carries the warning text.
    ConflictOutstanding(String),
    MissingContext(&'static str),
    Store(StoreError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::EmptySelection => write!(f, "select at least one time slot"),
            SessionError::FullDayActive => {
                write!(f, "manual slot toggles are disabled while full-day mode is active")
            }
            SessionError::ConflictOutstanding(msg) => {
                write!(f, "booking conflict detected: {msg}")
            }
            SessionError::MissingContext(what) => {
                write!(f, "no {what} chosen for this booking")
            }
            SessionError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        SessionError::Store(e)
    }
}

/// Requester-entered fields that ride along with the schedule.
#[derive(Debug, Clone)]
pub struct RequestDetails {
    pub event_title: String,
    pub department: String,
    pub requester: String,
    pub requester_email: String,
    pub attendees: u32,
}

#[derive(Default)]
struct SessionState {
    resource: Option<ResourceKey>,
    date: Option<CalendarDay>,
    selection: Selection,
    mode: DurationMode,
}

#[derive(Default)]
struct CheckState {
    report: Option<ConflictReport>,
    /// Set when the last check failed against the store: the user may
    /// proceed, but availability is unconfirmed.
    availability_unverified: bool,
}

/// One user's in-progress booking request.
///
/// Holds the selection and full-day mode, and owns the advisory conflict
/// checking. Checks are asynchronous store reads of unbounded latency; each
/// is issued a monotonically increasing token, and a result is applied only
/// if its token is still the newest issued when it resolves — any response
/// superseded by a later request is discarded. That is the entire ordering
/// guarantee: no in-flight cancellation, last result wins.
pub struct BookingSession {
    grid: Arc<SlotGrid>,
    store: Arc<dyn BookingStore>,
    state: Arc<Mutex<SessionState>>,
    check: Arc<Mutex<CheckState>>,
    issued: Arc<AtomicU64>,
}

impl BookingSession {
    pub fn new(grid: Arc<SlotGrid>, store: Arc<dyn BookingStore>) -> Self {
        Self {
            grid,
            store,
            state: Arc::new(Mutex::new(SessionState::default())),
            check: Arc::new(Mutex::new(CheckState::default())),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    // ── Form mutations — each one re-issues the advisory check ──

    pub async fn set_resource(&self, resource: ResourceKey) {
        self.state.lock().await.resource = Some(resource);
        self.spawn_check();
    }

    pub async fn set_date(&self, date: CalendarDay) {
        self.state.lock().await.date = Some(date);
        self.spawn_check();
    }

    /// Toggle one slot through the selection engine. Rejected while full-day
    /// mode is active.
    pub async fn toggle_slot(&self, slot: SlotTime) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock().await;
            if state.mode == DurationMode::FullDay {
                return Err(SessionError::FullDayActive);
            }
            state.selection = state.selection.toggle(&self.grid, slot);
        }
        self.spawn_check();
        Ok(())
    }

    /// Full-duration shortcut: selects the whole grid and locks out manual
    /// toggles until the mode is cleared.
    pub async fn set_full_day(&self) {
        {
            let mut state = self.state.lock().await;
            state.mode = DurationMode::FullDay;
            state.selection = Selection::full(&self.grid);
        }
        self.spawn_check();
    }

    /// Back to custom duration with nothing selected.
    pub async fn clear_duration(&self) {
        {
            let mut state = self.state.lock().await;
            state.mode = DurationMode::Custom;
            state.selection = Selection::empty();
        }
        self.spawn_check();
    }

    // ── Snapshots ────────────────────────────────────────────────

    pub async fn selection(&self) -> Selection {
        self.state.lock().await.selection.clone()
    }

    pub async fn mode(&self) -> DurationMode {
        self.state.lock().await.mode
    }

    /// The currently applied conflict report, if any check has landed.
    pub async fn conflict_report(&self) -> Option<ConflictReport> {
        self.check.lock().await.report.clone()
    }

    pub async fn availability_unverified(&self) -> bool {
        self.check.lock().await.availability_unverified
    }

    /// Warning text for the current report, in the form's wording.
    pub async fn conflict_warning(&self) -> Option<String> {
        let (resource, date) = {
            let state = self.state.lock().await;
            match (state.resource.clone(), state.date) {
                (Some(resource), Some(date)) => (resource, date),
                _ => return None,
            }
        };
        self.check
            .lock()
            .await
            .report
            .as_ref()
            .and_then(|r| r.summary(&resource, date))
    }

    // ── Advisory conflict checking ───────────────────────────────

    /// Issue a fresh availability check. Returns the task handle; callers
    /// normally fire and forget, tests await it.
    pub fn spawn_check(&self) -> JoinHandle<()> {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let store = self.store.clone();
        let state = self.state.clone();
        let check = self.check.clone();
        let issued = self.issued.clone();
        tokio::spawn(Self::run_check(token, store, state, check, issued))
    }

    async fn run_check(
        token: u64,
        store: Arc<dyn BookingStore>,
        state: Arc<Mutex<SessionState>>,
        check: Arc<Mutex<CheckState>>,
        issued: Arc<AtomicU64>,
    ) {
        let snapshot = {
            let state = state.lock().await;
            match (state.resource.clone(), state.date) {
                (Some(resource), Some(date)) => {
                    Some((resource, date, state.selection.slots().to_vec()))
                }
                _ => None,
            }
        };

        let Some((resource, date, candidate)) = snapshot else {
            // Not enough context to check anything; clear any stale report.
            let mut check = check.lock().await;
            if token == issued.load(Ordering::SeqCst) {
                check.report = None;
                check.availability_unverified = false;
            }
            return;
        };

        let started = std::time::Instant::now();
        let result = check_conflicts(&*store, &resource, date, &candidate).await;
        metrics::histogram!(crate::observability::CHECK_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let mut check = check.lock().await;
        if token != issued.load(Ordering::SeqCst) {
            // Superseded while in flight — a newer check owns the visible state.
            metrics::counter!(crate::observability::CONFLICT_CHECKS_STALE_TOTAL).increment(1);
            tracing::debug!(token, "discarding stale availability result");
            return;
        }

        match result {
            Ok(report) => {
                if let Some(warning) = report.summary(&resource, date) {
                    tracing::warn!(%resource, %date, "{warning}");
                }
                check.report = Some(report);
                check.availability_unverified = false;
            }
            Err(e) => {
                // Fail open: never block a booking because the store is down,
                // but flag that availability could not be confirmed.
                metrics::counter!(crate::observability::STORE_ERRORS_TOTAL).increment(1);
                tracing::warn!(%resource, %date, "availability could not be confirmed: {e}");
                check.report = None;
                check.availability_unverified = true;
            }
        }
    }

    // ── Submission ───────────────────────────────────────────────

    /// Normalize the selection and persist the request. Refused while a
    /// non-empty conflict report is current — regardless of any edits since —
    /// until a fresh check clears it.
    pub async fn submit(&self, details: RequestDetails) -> Result<BookingRecord, SessionError> {
        let (resource, date, selection, full_day) = {
            let state = self.state.lock().await;
            (
                state.resource.clone().ok_or(SessionError::MissingContext("resource"))?,
                state.date.ok_or(SessionError::MissingContext("date"))?,
                state.selection.clone(),
                state.mode == DurationMode::FullDay,
            )
        };

        {
            let check = self.check.lock().await;
            if let Some(report) = &check.report
                && !report.is_clear()
            {
                let warning = report.summary(&resource, date).unwrap_or_default();
                return Err(SessionError::ConflictOutstanding(warning));
            }
            if check.availability_unverified {
                tracing::warn!(%resource, %date, "submitting without confirmed availability");
            }
        }

        let window = normalize(&selection, &self.grid).map_err(|e| match e {
            EngineError::EmptySelection => SessionError::EmptySelection,
        })?;

        let draft = BookingDraft {
            resource: resource.clone(),
            date,
            window,
            full_day,
            event_title: details.event_title,
            department: details.department,
            requester: details.requester,
            requester_email: details.requester_email,
            attendees: details.attendees,
        };

        let record = self.store.insert(draft).await?;
        tracing::info!(
            id = %record.id,
            %resource,
            %date,
            time = %record.time_display(),
            "booking request submitted"
        );
        Ok(record)
    }
}
