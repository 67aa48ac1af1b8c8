//! Rendering surfaces consumed by exporters and the outbound notifier.
//! Everything here goes through [`BookingRecord::time_display`] so every
//! surface agrees on how a booking's time reads.

use serde_json::{Value, json};

use crate::model::{BookingRecord, BookingStatus, LifecycleEvent, SlotTime};

const CSV_HEADERS: [&str; 9] = [
    "ID",
    "Event Title",
    "Resource",
    "Department",
    "Date",
    "Time",
    "Requester",
    "Status",
    "Reason",
];

/// Booking history as CSV, one row per record. The reason column carries the
/// review note only for terminal-negative statuses.
pub fn history_csv(records: &[BookingRecord]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADERS.join(","));
    out.push('\n');
    for record in records {
        let reason = match record.status {
            BookingStatus::Rejected | BookingStatus::Cancelled => {
                record.review_note.as_deref().unwrap_or("")
            }
            _ => "",
        };
        let row = [
            record.id.to_string(),
            csv_quote(&record.event_title),
            csv_quote(&record.resource.to_string()),
            csv_quote(&record.department),
            record.date.to_string(),
            csv_quote(&record.time_display()),
            csv_quote(&record.requester),
            record.status.to_string(),
            csv_quote(reason),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// The JSON body handed to outbound delivery for a lifecycle event: the
/// action, a de-duplicating subject line, and the record snapshot.
pub fn notification_payload(event: &LifecycleEvent) -> Value {
    let record = event.record();
    json!({
        "action": event.action(),
        "subject": format!(
            "Booking {}: {} ({})",
            event.action(),
            record.event_title,
            &record.id.to_string()[..8]
        ),
        "booking": {
            "id": record.id.to_string(),
            "resource": record.resource.to_string(),
            "date": record.date.to_string(),
            "time": record.time_display(),
            "slots": record
                .window
                .ordered_slots
                .iter()
                .map(SlotTime::to_string)
                .collect::<Vec<_>>(),
            "status": record.status.as_str(),
            "event_title": record.event_title,
            "department": record.department,
            "requester": record.requester,
            "requester_email": record.requester_email,
            "attendees": record.attendees,
            "review_note": record.review_note,
        },
    })
}
