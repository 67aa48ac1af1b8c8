use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{LifecycleEvent, ResourceKey};

const CHANNEL_CAPACITY: usize = 256;

/// Fire-and-forget broadcast of booking lifecycle events, one channel per
/// resource. Outbound delivery (email and the like) subscribes here; the
/// scheduling core never waits on a listener.
pub struct NotifyHub {
    channels: DashMap<ResourceKey, broadcast::Sender<LifecycleEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self { channels: DashMap::new() }
    }

    /// Subscribe to lifecycle events for a resource. Creates the channel if
    /// needed.
    pub fn subscribe(&self, resource: &ResourceKey) -> broadcast::Receiver<LifecycleEvent> {
        let sender = self
            .channels
            .entry(resource.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Announce an event. No-op if nobody is listening.
    pub fn send(&self, resource: &ResourceKey, event: &LifecycleEvent) {
        if let Some(sender) = self.channels.get(resource) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop a resource's channel.
    pub fn remove(&self, resource: &ResourceKey) {
        self.channels.remove(resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use ulid::Ulid;

    fn sample_event() -> LifecycleEvent {
        LifecycleEvent::Requested(BookingRecord {
            id: Ulid::new(),
            resource: ResourceKey::new(ResourceKind::Venue, "auditorium"),
            date: CalendarDay::new(2025, 3, 1),
            window: BookingWindow {
                start: SlotTime::from_hm(9, 0),
                end: SlotTime::from_hm(9, 30),
                ordered_slots: vec![SlotTime::from_hm(9, 0)],
            },
            full_day: false,
            status: BookingStatus::Pending,
            event_title: "Town Hall".into(),
            department: "Administration".into(),
            requester: "D. Dean".into(),
            requester_email: "d.dean@example.edu".into(),
            attendees: 200,
            created_at: 0,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
        })
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let resource = ResourceKey::new(ResourceKind::Venue, "auditorium");
        let mut rx = hub.subscribe(&resource);

        let event = sample_event();
        hub.send(&resource, &event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
        assert_eq!(received.action(), "Requested");
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        let resource = ResourceKey::new(ResourceKind::Grounds, "south-field");
        // No subscriber — must not panic or block.
        hub.send(&resource, &sample_event());
    }

    #[tokio::test]
    async fn channels_are_per_resource() {
        let hub = NotifyHub::new();
        let hall = ResourceKey::new(ResourceKind::Venue, "auditorium");
        let bus = ResourceKey::new(ResourceKind::Vehicle, "bus-1");
        let mut hall_rx = hub.subscribe(&hall);
        let mut bus_rx = hub.subscribe(&bus);

        hub.send(&hall, &sample_event());

        assert!(hall_rx.recv().await.is_ok());
        assert!(bus_rx.try_recv().is_err());
    }
}
