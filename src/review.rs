use ulid::Ulid;

use crate::auth::Identity;
use crate::model::{BookingRecord, BookingStatus};
use crate::store::{BookingStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug)]
pub enum ReviewError {
    /// The principal lacks the capability for this operation.
    Forbidden(String),
    /// Rejections must carry a reason for the requester.
    ReasonRequired,
    Store(StoreError),
}

impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewError::Forbidden(principal) => write!(f, "not permitted: {principal}"),
            ReviewError::ReasonRequired => write!(f, "a rejection reason is required"),
            ReviewError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReviewError {}

impl From<StoreError> for ReviewError {
    fn from(e: StoreError) -> Self {
        ReviewError::Store(e)
    }
}

/// Decide a pending request. Approver-only; a rejection without a non-empty
/// reason is refused before touching the store. The transition table itself
/// is enforced by the store, so a double decision fails there.
pub async fn review(
    store: &dyn BookingStore,
    identity: &Identity,
    id: Ulid,
    decision: Decision,
    note: Option<String>,
) -> Result<BookingRecord, ReviewError> {
    if !identity.is_approver() {
        return Err(ReviewError::Forbidden(identity.principal.clone()));
    }

    let new_status = match decision {
        Decision::Approve => BookingStatus::Approved,
        Decision::Reject => {
            if note.as_deref().is_none_or(|n| n.trim().is_empty()) {
                return Err(ReviewError::ReasonRequired);
            }
            BookingStatus::Rejected
        }
    };

    let record = store
        .update_status(id, new_status, &identity.principal, note)
        .await?;
    tracing::info!(
        id = %record.id,
        status = %record.status,
        reviewer = %identity.principal,
        "booking reviewed"
    );
    Ok(record)
}

/// Withdraw an approved booking. Allowed for an approver or for the
/// requester themself; `Approved → Cancelled` is the only legal path.
pub async fn cancel(
    store: &dyn BookingStore,
    identity: &Identity,
    id: Ulid,
    reason: Option<String>,
) -> Result<BookingRecord, ReviewError> {
    let record = store
        .get(id)
        .await?
        .ok_or(ReviewError::Store(StoreError::NotFound(id)))?;
    if !identity.is_approver() && identity.principal != record.requester_email {
        return Err(ReviewError::Forbidden(identity.principal.clone()));
    }

    let record = store
        .update_status(id, BookingStatus::Cancelled, &identity.principal, reason)
        .await?;
    tracing::info!(id = %record.id, by = %identity.principal, "booking cancelled");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::{IdentityProvider, StaticRoster};
    use crate::model::*;
    use crate::store::LedgerStore;

    fn t(h: u16, m: u16) -> SlotTime {
        SlotTime::from_hm(h, m)
    }

    fn test_ledger_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("tessera_test_review");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    async fn seeded_store(name: &str) -> (Arc<LedgerStore>, BookingRecord) {
        let store = Arc::new(LedgerStore::open(&test_ledger_path(name)).unwrap());
        let record = crate::store::BookingStore::insert(
            store.as_ref(),
            BookingDraft {
                resource: ResourceKey::new(ResourceKind::Venue, "main-hall"),
                date: CalendarDay::new(2025, 3, 1),
                window: BookingWindow {
                    start: t(9, 0),
                    end: t(10, 0),
                    ordered_slots: vec![t(9, 0), t(9, 30)],
                },
                full_day: false,
                event_title: "Guest Lecture".into(),
                department: "Physics".into(),
                requester: "A. Person".into(),
                requester_email: "a.person@example.edu".into(),
                attendees: 40,
            },
        )
        .await
        .unwrap();
        (store, record)
    }

    async fn identities() -> (Identity, Identity) {
        let roster = StaticRoster::new(["approver@example.edu"]);
        let approver = roster.resolve("approver@example.edu").await;
        let requester = roster.resolve("a.person@example.edu").await;
        (approver, requester)
    }

    #[tokio::test]
    async fn approver_can_approve() {
        let (store, record) = seeded_store("approve.ledger").await;
        let (approver, _) = identities().await;

        let approved = review(store.as_ref(), &approver, record.id, Decision::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("approver@example.edu"));
    }

    #[tokio::test]
    async fn requester_cannot_review() {
        let (store, record) = seeded_store("forbidden.ledger").await;
        let (_, requester) = identities().await;

        let err = review(store.as_ref(), &requester, record.id, Decision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Forbidden(_)));
    }

    #[tokio::test]
    async fn rejection_requires_a_reason() {
        let (store, record) = seeded_store("reason.ledger").await;
        let (approver, _) = identities().await;

        let err = review(store.as_ref(), &approver, record.id, Decision::Reject, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::ReasonRequired));

        let err = review(
            store.as_ref(),
            &approver,
            record.id,
            Decision::Reject,
            Some("   ".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReviewError::ReasonRequired));

        let rejected = review(
            store.as_ref(),
            &approver,
            record.id,
            Decision::Reject,
            Some("venue under maintenance".into()),
        )
        .await
        .unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
        assert_eq!(rejected.review_note.as_deref(), Some("venue under maintenance"));
    }

    #[tokio::test]
    async fn double_decision_hits_the_transition_table() {
        let (store, record) = seeded_store("double.ledger").await;
        let (approver, _) = identities().await;

        review(store.as_ref(), &approver, record.id, Decision::Approve, None)
            .await
            .unwrap();
        let err = review(store.as_ref(), &approver, record.id, Decision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Store(StoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn requester_can_cancel_their_approved_booking() {
        let (store, record) = seeded_store("cancel_own.ledger").await;
        let (approver, requester) = identities().await;

        review(store.as_ref(), &approver, record.id, Decision::Approve, None)
            .await
            .unwrap();
        let cancelled = cancel(
            store.as_ref(),
            &requester,
            record.id,
            Some("event called off".into()),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.review_note.as_deref(), Some("event called off"));
    }

    #[tokio::test]
    async fn stranger_cannot_cancel() {
        let (store, record) = seeded_store("cancel_stranger.ledger").await;
        let (approver, _) = identities().await;
        review(store.as_ref(), &approver, record.id, Decision::Approve, None)
            .await
            .unwrap();

        let roster = StaticRoster::new(["approver@example.edu"]);
        let stranger = roster.resolve("stranger@example.edu").await;
        let err = cancel(store.as_ref(), &stranger, record.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Forbidden(_)));
    }

    #[tokio::test]
    async fn pending_bookings_cannot_be_cancelled() {
        let (store, record) = seeded_store("cancel_pending.ledger").await;
        let (approver, _) = identities().await;

        let err = cancel(store.as_ref(), &approver, record.id, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Store(StoreError::InvalidTransition {
                from: BookingStatus::Pending,
                to: BookingStatus::Cancelled,
            })
        ));
    }
}
