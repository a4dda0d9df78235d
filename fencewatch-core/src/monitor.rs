//! Geofence Monitor
//!
//! Ties the detector, the event log and a notifier together. One call to
//! [`GeofenceMonitor::process`] is one polling cycle.

use chrono::{DateTime, Utc};

use crate::detector::TransitionDetector;
use crate::device::DeviceSample;
use crate::events::{EventLog, GeofenceEvent};
use crate::geofence::Geofence;
use crate::notify::{Notification, Notifier};

pub struct GeofenceMonitor<N: Notifier> {
    detector: TransitionDetector,
    events: EventLog,
    notifier: N,
}

impl<N: Notifier> GeofenceMonitor<N> {
    pub fn new(notifier: N) -> Self {
        GeofenceMonitor::with_event_log(notifier, EventLog::new())
    }

    /// Create a monitor that records into an existing (e.g. restored) log
    pub fn with_event_log(notifier: N, events: EventLog) -> Self {
        GeofenceMonitor {
            detector: TransitionDetector::new(),
            events,
            notifier,
        }
    }

    /// Evaluate one batch of positions.
    ///
    /// Each reported transition is recorded in the log and then handed to
    /// the notifier, in emission order. Returns the number of events recorded.
    pub fn process(
        &mut self,
        devices: &[DeviceSample],
        fences: &[Geofence],
        now: DateTime<Utc>,
    ) -> usize {
        let transitions = self.detector.evaluate(devices, fences, now);
        let count = transitions.len();

        for transition in transitions {
            let event = self.events.record(transition);
            let notification = Notification::for_event(event);
            self.notifier.notify(&notification.title, &notification.body);
        }
        count
    }

    /// The `count` most recently recorded events, most recent first
    pub fn recent(&self, count: usize) -> Vec<&GeofenceEvent> {
        self.events.events().take(count).collect()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    pub fn detector(&self) -> &TransitionDetector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut TransitionDetector {
        &mut self.detector
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}
