use crate::model::{BookingStatus, CalendarDay, Conflict, ConflictReport, Ms, ResourceKey, SlotTime};
use crate::store::{BookingStore, StoreError};

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as Ms
}

/// Advisory overlap check for a candidate slot set.
///
/// Reads committed bookings for the resource with status in
/// `{Pending, Approved}` (Rejected/Cancelled never conflict), keeps those on
/// the same calendar day, and reports every one whose slot list intersects
/// the candidate. No lock or reservation is taken: a race between this check
/// and a later commit is accepted by design, so the store's `find` doubles as
/// the hook for after-the-fact reconciliation.
pub async fn check_conflicts(
    store: &dyn BookingStore,
    resource: &ResourceKey,
    date: CalendarDay,
    candidate: &[SlotTime],
) -> Result<ConflictReport, StoreError> {
    metrics::counter!(crate::observability::CONFLICT_CHECKS_TOTAL).increment(1);
    if candidate.is_empty() {
        return Ok(ConflictReport::default());
    }

    // Native store filter is resource + status set; the day filter runs here.
    let committed = store
        .find(resource, &BookingStatus::SCHEDULING_BLOCKERS)
        .await?;

    let mut conflicts = Vec::new();
    for record in committed {
        if record.date != date {
            continue;
        }
        let overlap = slot_intersection(&record.window.ordered_slots, candidate);
        if !overlap.is_empty() {
            conflicts.push(Conflict {
                booking_id: record.id,
                event_title: record.event_title,
                department: record.department,
                status: record.status,
                slots: overlap,
            });
        }
    }

    if !conflicts.is_empty() {
        metrics::counter!(crate::observability::CONFLICTS_FOUND_TOTAL)
            .increment(conflicts.len() as u64);
    }
    Ok(ConflictReport { conflicts })
}

/// Intersection of two slot lists, both in grid order.
fn slot_intersection(a: &[SlotTime], b: &[SlotTime]) -> Vec<SlotTime> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingDraft, BookingWindow, ResourceKind};
    use crate::store::LedgerStore;

    fn t(h: u16, m: u16) -> SlotTime {
        SlotTime::from_hm(h, m)
    }

    fn test_ledger_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("tessera_test_conflict");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn draft(resource: &ResourceKey, date: CalendarDay, slots: Vec<SlotTime>) -> BookingDraft {
        let start = slots[0];
        let end = SlotTime::from_minutes(slots.last().unwrap().minutes() + 30);
        BookingDraft {
            resource: resource.clone(),
            date,
            window: BookingWindow { start, end, ordered_slots: slots },
            full_day: false,
            event_title: "Robotics Workshop".into(),
            department: "Mechanical".into(),
            requester: "B. Builder".into(),
            requester_email: "b.builder@example.edu".into(),
            attendees: 25,
        }
    }

    #[test]
    fn intersection_basics() {
        let a = [t(14, 0), t(14, 30)];
        let b = [t(14, 30), t(15, 0)];
        assert_eq!(slot_intersection(&a, &b), vec![t(14, 30)]);
        assert!(slot_intersection(&a, &[t(15, 0), t(15, 30)]).is_empty());
        assert!(slot_intersection(&[], &b).is_empty());
    }

    #[tokio::test]
    async fn overlapping_committed_booking_is_reported() {
        let store = LedgerStore::open(&test_ledger_path("overlap.ledger")).unwrap();
        let resource = ResourceKey::new(ResourceKind::Venue, "main-hall");
        let date = CalendarDay::new(2025, 3, 1);

        let record = store
            .insert(draft(&resource, date, vec![t(14, 0), t(14, 30)]))
            .await
            .unwrap();
        store
            .update_status(record.id, BookingStatus::Approved, "approver@example.edu", None)
            .await
            .unwrap();

        let report = check_conflicts(&store, &resource, date, &[t(14, 30), t(15, 0)])
            .await
            .unwrap();
        assert_eq!(report.conflicts.len(), 1);
        let c = &report.conflicts[0];
        assert_eq!(c.booking_id, record.id);
        assert_eq!(c.status, BookingStatus::Approved);
        assert_eq!(c.slots, vec![t(14, 30)]);
        assert_eq!(c.describe(), "\"Robotics Workshop\" (Mechanical) - Approved");
    }

    #[tokio::test]
    async fn different_date_does_not_conflict() {
        let store = LedgerStore::open(&test_ledger_path("date.ledger")).unwrap();
        let resource = ResourceKey::new(ResourceKind::Venue, "main-hall");

        store
            .insert(draft(&resource, CalendarDay::new(2025, 3, 1), vec![t(14, 0)]))
            .await
            .unwrap();

        let report = check_conflicts(
            &store,
            &resource,
            CalendarDay::new(2025, 3, 2),
            &[t(14, 0)],
        )
        .await
        .unwrap();
        assert!(report.is_clear());
    }

    #[tokio::test]
    async fn different_resource_does_not_conflict() {
        let store = LedgerStore::open(&test_ledger_path("resource.ledger")).unwrap();
        let hall = ResourceKey::new(ResourceKind::Venue, "main-hall");
        let bus = ResourceKey::new(ResourceKind::Vehicle, "bus-1");
        let date = CalendarDay::new(2025, 3, 1);

        store.insert(draft(&hall, date, vec![t(14, 0)])).await.unwrap();

        let report = check_conflicts(&store, &bus, date, &[t(14, 0)]).await.unwrap();
        assert!(report.is_clear());
    }

    #[tokio::test]
    async fn terminal_statuses_never_conflict() {
        let store = LedgerStore::open(&test_ledger_path("terminal.ledger")).unwrap();
        let resource = ResourceKey::new(ResourceKind::Venue, "main-hall");
        let date = CalendarDay::new(2025, 3, 1);

        let rejected = store
            .insert(draft(&resource, date, vec![t(14, 0)]))
            .await
            .unwrap();
        store
            .update_status(
                rejected.id,
                BookingStatus::Rejected,
                "approver@example.edu",
                Some("venue closed".into()),
            )
            .await
            .unwrap();

        let cancelled = store
            .insert(draft(&resource, date, vec![t(14, 0)]))
            .await
            .unwrap();
        store
            .update_status(cancelled.id, BookingStatus::Approved, "approver@example.edu", None)
            .await
            .unwrap();
        store
            .update_status(cancelled.id, BookingStatus::Cancelled, "approver@example.edu", None)
            .await
            .unwrap();

        let report = check_conflicts(&store, &resource, date, &[t(14, 0)]).await.unwrap();
        assert!(report.is_clear());
    }

    #[tokio::test]
    async fn all_conflicts_returned_not_just_first() {
        let store = LedgerStore::open(&test_ledger_path("multi.ledger")).unwrap();
        let resource = ResourceKey::new(ResourceKind::Grounds, "north-field");
        let date = CalendarDay::new(2025, 3, 1);

        store.insert(draft(&resource, date, vec![t(9, 0), t(9, 30)])).await.unwrap();
        store.insert(draft(&resource, date, vec![t(10, 0), t(10, 30)])).await.unwrap();

        let report = check_conflicts(
            &store,
            &resource,
            date,
            &[t(9, 30), t(10, 0)],
        )
        .await
        .unwrap();
        assert_eq!(report.conflicts.len(), 2);
    }

    #[tokio::test]
    async fn empty_candidate_is_trivially_clear() {
        let store = LedgerStore::open(&test_ledger_path("empty.ledger")).unwrap();
        let resource = ResourceKey::new(ResourceKind::Venue, "main-hall");
        let date = CalendarDay::new(2025, 3, 1);
        store.insert(draft(&resource, date, vec![t(14, 0)])).await.unwrap();

        let report = check_conflicts(&store, &resource, date, &[]).await.unwrap();
        assert!(report.is_clear());
    }
}
