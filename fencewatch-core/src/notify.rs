//! User Notifications
//!
//! The detector has no knowledge of how notifications reach the user. Hosts
//! implement [`Notifier`] over whatever facility they have (desktop
//! notifications, a message queue, a log line).

use crate::events::{GeofenceEvent, TransitionKind};

/// Best-effort notification sink.
///
/// Implementations must not block and must not fail: dispatch problems are
/// handled (or dropped) inside the implementation.
pub trait Notifier {
    fn notify(&self, title: &str, body: &str);
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, title: &str, body: &str) {
        (**self).notify(title, body)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, title: &str, body: &str) {
        (**self).notify(title, body)
    }
}

/// A notification message ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Title and body describing a geofence event
    pub fn for_event(event: &GeofenceEvent) -> Self {
        match event.kind {
            TransitionKind::Entered => Notification {
                title: format!("Geofence Entered: {}", event.fence_name),
                body: format!("{} entered the geofence zone.", event.device_name),
            },
            TransitionKind::Exited => Notification {
                title: format!("Geofence Exited: {}", event.fence_name),
                body: format!("{} left the geofence zone.", event.device_name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(kind: TransitionKind) -> GeofenceEvent {
        GeofenceEvent {
            id: "gfe-1-0".to_string(),
            fence_id: "F".to_string(),
            fence_name: "Depot".to_string(),
            device_id: "D".to_string(),
            device_name: "Truck 7".to_string(),
            kind,
            lat: 24.7,
            lng: 46.67,
            timestamp: Utc::now(),
            read: false,
        }
    }

    #[test]
    fn test_entered_text() {
        let n = Notification::for_event(&event(TransitionKind::Entered));
        assert_eq!(n.title, "Geofence Entered: Depot");
        assert_eq!(n.body, "Truck 7 entered the geofence zone.");
    }

    #[test]
    fn test_exited_text() {
        let n = Notification::for_event(&event(TransitionKind::Exited));
        assert_eq!(n.title, "Geofence Exited: Depot");
        assert_eq!(n.body, "Truck 7 left the geofence zone.");
    }
}
