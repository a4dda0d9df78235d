//! Geofence Event Log
//!
//! Bounded, most-recent-first log of geofence transitions with read/unread
//! tracking. Entries are never mutated after recording except for their
//! read flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::geo::LatLng;

/// Default number of events kept in the log
pub const DEFAULT_EVENT_CAPACITY: usize = 500;

/// Direction of a containment change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Entered,
    Exited,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransitionKind::Entered => write!(f, "entered"),
            TransitionKind::Exited => write!(f, "exited"),
        }
    }
}

/// A transition as produced by the detector, before it is recorded
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub fence_id: String,
    pub fence_name: String,
    pub device_id: String,
    pub device_name: String,
    pub kind: TransitionKind,
    pub position: LatLng,
    pub timestamp: DateTime<Utc>,
}

/// A recorded geofence event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceEvent {
    pub id: String,
    pub fence_id: String,
    pub fence_name: String,
    pub device_id: String,
    pub device_name: String,
    pub kind: TransitionKind,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl GeofenceEvent {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Capped, most-recent-first event log
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<GeofenceEvent>,
    capacity: usize,
    next_seq: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        EventLog::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    /// Create a log that keeps at most `capacity` events (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        EventLog {
            events: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Restore a log from previously recorded events (most recent first).
    ///
    /// Events beyond `capacity` are dropped from the old end.
    pub fn from_events(events: Vec<GeofenceEvent>, capacity: usize) -> Self {
        let mut log = EventLog::with_capacity(capacity);
        log.events.extend(events.into_iter().take(log.capacity));
        // Continue numbering after the highest restored sequence number
        log.next_seq = log
            .events
            .iter()
            .filter_map(|e| e.id.rsplit('-').next()?.parse::<u64>().ok())
            .max()
            .map_or(0, |seq| seq + 1);
        log
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a transition as a new unread event at the front of the log.
    ///
    /// The oldest entries are silently dropped once the log is full.
    pub fn record(&mut self, transition: Transition) -> &GeofenceEvent {
        let id = format!(
            "gfe-{}-{}",
            transition.timestamp.timestamp_millis(),
            self.next_seq
        );
        self.next_seq += 1;

        self.events.push_front(GeofenceEvent {
            id,
            fence_id: transition.fence_id,
            fence_name: transition.fence_name,
            device_id: transition.device_id,
            device_name: transition.device_name,
            kind: transition.kind,
            lat: transition.position.lat,
            lng: transition.position.lng,
            timestamp: transition.timestamp,
            read: false,
        });
        self.events.truncate(self.capacity);

        &self.events[0]
    }

    pub fn mark_all_read(&mut self) {
        for event in self.events.iter_mut() {
            event.read = true;
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.events.iter().filter(|e| !e.read).count()
    }

    /// Events, most recent first
    pub fn events(&self) -> impl Iterator<Item = &GeofenceEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&GeofenceEvent> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Snapshot of all events for persistence
    pub fn to_vec(&self) -> Vec<GeofenceEvent> {
        self.events.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn transition(n: i64) -> Transition {
        Transition {
            fence_id: "gf-1".to_string(),
            fence_name: "Depot".to_string(),
            device_id: "D".to_string(),
            device_name: "Truck 1".to_string(),
            kind: TransitionKind::Entered,
            position: LatLng::new(24.7, 46.67),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(n),
        }
    }

    #[test]
    fn test_record_assigns_id_and_unread() {
        let mut log = EventLog::new();
        let event = log.record(transition(0));
        assert!(event.id.starts_with("gfe-"));
        assert!(!event.read);
        assert_eq!(event.kind, TransitionKind::Entered);
        assert_eq!(event.position(), LatLng::new(24.7, 46.67));
        assert_eq!(log.unread_count(), 1);
    }

    #[test]
    fn test_most_recent_first() {
        let mut log = EventLog::new();
        log.record(transition(0));
        log.record(transition(1));
        log.record(transition(2));

        let times: Vec<i64> = log.events().map(|e| e.timestamp.timestamp()).collect();
        assert!(times[0] > times[1] && times[1] > times[2]);
        assert_eq!(log.latest().unwrap().timestamp, transition(2).timestamp);
    }

    #[test]
    fn test_capacity_bound() {
        let mut log = EventLog::new();
        for n in 0..501 {
            log.record(transition(n));
        }
        assert_eq!(log.len(), 500);
        // The very first event was dropped, the newest is at the front
        assert_eq!(log.latest().unwrap().timestamp, transition(500).timestamp);
        assert_eq!(
            log.events().last().unwrap().timestamp,
            transition(1).timestamp
        );
    }

    #[test]
    fn test_ids_unique() {
        let mut log = EventLog::new();
        let a = log.record(transition(0)).id.clone();
        let b = log.record(transition(0)).id.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_mark_all_read_and_clear() {
        let mut log = EventLog::with_capacity(10);
        log.record(transition(0));
        log.record(transition(1));
        assert_eq!(log.unread_count(), 2);

        log.mark_all_read();
        assert_eq!(log.unread_count(), 0);
        assert!(log.events().all(|e| e.read));

        log.record(transition(2));
        assert_eq!(log.unread_count(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_from_events_truncates() {
        let mut log = EventLog::new();
        for n in 0..5 {
            log.record(transition(n));
        }
        let restored = EventLog::from_events(log.to_vec(), 3);
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.latest(), log.latest());
    }

    #[test]
    fn test_event_json_shape() {
        let mut log = EventLog::new();
        let event = log.record(transition(0));
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["kind"], "entered");
        assert_eq!(value["fenceId"], "gf-1");
        assert_eq!(value["deviceName"], "Truck 1");
        assert_eq!(value["read"], false);
        assert_eq!(value["timestamp"], "2024-06-01T12:00:00Z");
    }
}
