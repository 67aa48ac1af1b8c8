//! tessera — slot-based scheduling for shared-facility booking.
//!
//! Members of an organization request time-bounded use of shared resources
//! (venues, grounds, vehicles); each request flows through an approval
//! workflow. The core is the scheduling engine: a fixed slot grid, the
//! toggle/fill/trim selection state machine, an interval normalizer, and an
//! advisory conflict checker with last-result-wins sequencing for in-flight
//! checks. Bookings persist through the [`store::BookingStore`] contract;
//! the bundled [`store::LedgerStore`] is an in-memory index made durable by
//! a crash-safe append-only ledger, and lifecycle events fan out through the
//! fire-and-forget [`notify::NotifyHub`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use tessera::grid::SlotGrid;
//! use tessera::model::{CalendarDay, ResourceKey, ResourceKind, SlotTime};
//! use tessera::session::{BookingSession, RequestDetails};
//! use tessera::store::LedgerStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(LedgerStore::open("bookings.ledger".as_ref())?);
//! let session = BookingSession::new(Arc::new(SlotGrid::standard_day()), store);
//!
//! session.set_resource(ResourceKey::new(ResourceKind::Venue, "main-hall")).await;
//! session.set_date("2025-03-01".parse::<CalendarDay>()?).await;
//! session.toggle_slot(SlotTime::from_hm(10, 0)).await?;
//! session.toggle_slot(SlotTime::from_hm(11, 0)).await?;
//!
//! let record = session
//!     .submit(RequestDetails {
//!         event_title: "Guest Lecture".into(),
//!         department: "Physics".into(),
//!         requester: "A. Person".into(),
//!         requester_email: "a.person@example.edu".into(),
//!         attendees: 40,
//!     })
//!     .await?;
//! println!("requested {} at {}", record.id, record.time_display());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod engine;
pub mod export;
pub mod grid;
pub mod model;
pub mod notify;
pub mod observability;
pub mod review;
pub mod session;
pub mod store;
pub mod wal;
