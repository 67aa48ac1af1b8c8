use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc, oneshot};
use ulid::Ulid;

use crate::engine::now_ms;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Ledger;

/// Faults from the booking lifecycle store.
#[derive(Debug)]
pub enum StoreError {
    /// Read/write failed (storage or network fault). The availability
    /// checker treats this as fail-open; writes fail closed.
    Unavailable(String),
    NotFound(Ulid),
    /// Refused by the status transition table.
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    Ledger(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "booking store unavailable: {msg}"),
            StoreError::NotFound(id) => write!(f, "booking not found: {id}"),
            StoreError::InvalidTransition { from, to } => {
                write!(f, "invalid status transition: {from} -> {to}")
            }
            StoreError::Ledger(msg) => write!(f, "ledger error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Query/insert/transition contract the scheduling core consumes.
///
/// `find` filters natively by resource and status set; finer filtering (e.g.
/// by calendar day) is the caller's job over the returned records.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find(
        &self,
        resource: &ResourceKey,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingRecord>, StoreError>;

    async fn get(&self, id: Ulid) -> Result<Option<BookingRecord>, StoreError>;

    /// Persist a draft as a new `Pending` record. The slot fields are exactly
    /// the normalizer's output; the store never reinterprets them.
    async fn insert(&self, draft: BookingDraft) -> Result<BookingRecord, StoreError>;

    /// Transition a record's status, stamping reviewer and review time.
    /// Transitions not in the table are refused.
    async fn update_status(
        &self,
        id: Ulid,
        new_status: BookingStatus,
        reviewer: &str,
        note: Option<String>,
    ) -> Result<BookingRecord, StoreError>;
}

// ── Group-commit ledger channel ──────────────────────────────────

enum LedgerCommand {
    Append {
        event: LedgerEvent,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<LedgerEvent>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the ledger file and batches appends.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to all senders.
async fn ledger_writer_loop(mut ledger: Ledger, mut rx: mpsc::Receiver<LedgerCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            LedgerCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                loop {
                    match rx.try_recv() {
                        Ok(LedgerCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            flush_and_respond(&mut ledger, &mut batch);
                            handle_non_append(&mut ledger, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut ledger, &mut batch);
                }
            }
            other => handle_non_append(&mut ledger, other),
        }
    }
}

fn flush_and_respond(
    ledger: &mut Ledger,
    batch: &mut Vec<(LedgerEvent, oneshot::Sender<io::Result<()>>)>,
) {
    metrics::histogram!(crate::observability::LEDGER_FLUSH_BATCH_SIZE)
        .record(batch.len() as f64);
    let flush_start = std::time::Instant::now();

    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = ledger.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush, even after an append error, so partially buffered bytes
    // don't leak into the next batch (these callers are told this batch failed).
    let flush_err = ledger.flush_sync().err();
    let result = match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    };

    metrics::histogram!(crate::observability::LEDGER_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(ledger: &mut Ledger, cmd: LedgerCommand) {
    match cmd {
        LedgerCommand::Compact { events, response } => {
            let result = Ledger::write_compact_file(ledger.path(), &events)
                .and_then(|()| ledger.swap_compact_file());
            let _ = response.send(result);
        }
        LedgerCommand::AppendsSinceCompact { response } => {
            let _ = response.send(ledger.appends_since_compact());
        }
        LedgerCommand::Append { .. } => unreachable!(),
    }
}

// ── LedgerStore ──────────────────────────────────────────────────

/// Counts per status, for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSummary {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub cancelled: usize,
}

/// The bundled lifecycle store: an in-memory index made durable by the
/// append-only ledger. Opening replays the ledger; every write is appended
/// through a background group-commit writer before it is applied in memory
/// and announced on the notify hub.
pub struct LedgerStore {
    records: DashMap<Ulid, BookingRecord>,
    by_resource: DashMap<ResourceKey, Vec<Ulid>>,
    ledger_tx: mpsc::Sender<LedgerCommand>,
    notify: Arc<NotifyHub>,
    /// Serializes status transitions so two concurrent reviews cannot both
    /// pass the transition-table check before either is applied.
    transition_gate: Mutex<()>,
}

impl LedgerStore {
    /// Open the store at `path`, replaying any existing ledger. Must be
    /// called from within a Tokio runtime (the writer task is spawned here).
    pub fn open(path: &Path) -> io::Result<Self> {
        let events = Ledger::replay(path)?;
        let ledger = Ledger::open(path)?;
        let (ledger_tx, ledger_rx) = mpsc::channel(4096);
        tokio::spawn(ledger_writer_loop(ledger, ledger_rx));

        let store = Self {
            records: DashMap::new(),
            by_resource: DashMap::new(),
            ledger_tx,
            notify: Arc::new(NotifyHub::new()),
            transition_gate: Mutex::new(()),
        };

        for event in events {
            store.apply(event);
        }

        Ok(store)
    }

    /// The hub on which this store announces lifecycle events.
    pub fn notify(&self) -> Arc<NotifyHub> {
        self.notify.clone()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn status_summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for entry in self.records.iter() {
            match entry.value().status {
                BookingStatus::Pending => summary.pending += 1,
                BookingStatus::Approved => summary.approved += 1,
                BookingStatus::Rejected => summary.rejected += 1,
                BookingStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }

    /// Apply a replayed or freshly persisted event to the in-memory index.
    fn apply(&self, event: LedgerEvent) {
        match event {
            LedgerEvent::Submitted { record } => {
                self.by_resource
                    .entry(record.resource.clone())
                    .or_default()
                    .push(record.id);
                self.records.insert(record.id, record);
            }
            LedgerEvent::StatusChanged {
                id,
                status,
                reviewed_by,
                review_note,
                reviewed_at,
            } => {
                if let Some(mut record) = self.records.get_mut(&id) {
                    record.status = status;
                    record.reviewed_by = Some(reviewed_by);
                    record.reviewed_at = Some(reviewed_at);
                    record.review_note = review_note;
                }
            }
        }
    }

    /// Durably append via the background writer.
    async fn ledger_append(&self, event: &LedgerEvent) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.ledger_tx
            .send(LedgerCommand::Append { event: event.clone(), response: tx })
            .await
            .map_err(|_| StoreError::Ledger("ledger writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Ledger("ledger writer dropped response".into()))?
            .map_err(|e| StoreError::Ledger(e.to_string()))
    }

    /// Rewrite the ledger with only the events needed to recreate the
    /// current records.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let events: Vec<LedgerEvent> = self
            .records
            .iter()
            .map(|entry| LedgerEvent::Submitted { record: entry.value().clone() })
            .collect();

        let (tx, rx) = oneshot::channel();
        self.ledger_tx
            .send(LedgerCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::Ledger("ledger writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Ledger("ledger writer dropped response".into()))?
            .map_err(|e| StoreError::Ledger(e.to_string()))
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .ledger_tx
            .send(LedgerCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    fn announce(&self, event: LifecycleEvent) {
        let resource = event.record().resource.clone();
        tracing::debug!(
            action = crate::observability::event_label(&event),
            id = %event.record().id,
            "lifecycle event announced"
        );
        self.notify.send(&resource, &event);
    }
}

#[async_trait]
impl BookingStore for LedgerStore {
    async fn find(
        &self,
        resource: &ResourceKey,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let ids = self
            .by_resource
            .get(resource)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        let mut found: Vec<BookingRecord> = ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|e| e.value().clone()))
            .filter(|r| statuses.contains(&r.status))
            .collect();
        // Newest first, matching the review queue ordering.
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn get(&self, id: Ulid) -> Result<Option<BookingRecord>, StoreError> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn insert(&self, draft: BookingDraft) -> Result<BookingRecord, StoreError> {
        let record = draft.into_record(Ulid::new(), now_ms());
        let event = LedgerEvent::Submitted { record: record.clone() };
        self.ledger_append(&event).await?;
        self.apply(event);

        metrics::counter!(crate::observability::BOOKINGS_SUBMITTED_TOTAL).increment(1);
        self.announce(LifecycleEvent::Requested(record.clone()));
        Ok(record)
    }

    async fn update_status(
        &self,
        id: Ulid,
        new_status: BookingStatus,
        reviewer: &str,
        note: Option<String>,
    ) -> Result<BookingRecord, StoreError> {
        let _gate = self.transition_gate.lock().await;
        let current = self
            .records
            .get(&id)
            .map(|e| e.value().status)
            .ok_or(StoreError::NotFound(id))?;
        if !current.can_transition(new_status) {
            return Err(StoreError::InvalidTransition { from: current, to: new_status });
        }

        let event = LedgerEvent::StatusChanged {
            id,
            status: new_status,
            reviewed_by: reviewer.to_string(),
            review_note: note,
            reviewed_at: now_ms(),
        };
        self.ledger_append(&event).await?;
        self.apply(event);

        let record = self
            .records
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound(id))?;

        metrics::counter!(
            crate::observability::STATUS_TRANSITIONS_TOTAL,
            "status" => new_status.as_str()
        )
        .increment(1);
        self.announce(LifecycleEvent::for_status(new_status, record.clone()));
        Ok(record)
    }
}

/// Background task that compacts the ledger whenever the append count since
/// the last compaction crosses `threshold`.
pub async fn run_compactor(store: Arc<LedgerStore>, threshold: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        interval.tick().await;
        if store.appends_since_compact().await >= threshold {
            match store.compact().await {
                Ok(()) => tracing::info!("ledger compacted"),
                Err(e) => tracing::warn!("ledger compaction failed: {e}"),
            }
        }
    }
}
