//! Geofence Transition Detector
//!
//! Tracks, per device, which fences currently contain it and turns changes in
//! containment between two evaluations into entry/exit transitions.
//!
//! # State machine
//!
//! For every (device, fence) pair that is evaluated:
//!
//! | was inside | is inside | state change  | reported when policy is |
//! |------------|-----------|---------------|-------------------------|
//! | no         | yes       | add fence     | `Enter` or `Both`       |
//! | yes        | no        | remove fence  | `Exit` or `Both`        |
//! | same       | same      | none          | never                   |
//!
//! A pair is skipped when the fence is disabled, scoped to another device, or
//! when either side has no coordinates. Skipping is silent: the feed is an
//! unreliable polling source and partial data is normal.
//!
//! # Priming
//!
//! Containment is not persisted. The first time a device is seen with a
//! position, and the first cycle after a disabled fence is enabled again
//! (or scoped back to a device it skipped), containment is recorded without reporting an entry, since there is no
//! prior state to compare against. A fence that appears for the first time
//! is evaluated normally. Exits are only possible from recorded state, so
//! they are always real crossings.
//!
//! State is kept only for the devices passed to the latest evaluation; a
//! device that drops out of the list is forgotten and primed again when it
//! comes back.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use fencewatch_core::detector::TransitionDetector;
//! use fencewatch_core::device::DeviceSample;
//! use fencewatch_core::geo::LatLng;
//! use fencewatch_core::geofence::Geofence;
//!
//! let fences = vec![Geofence::new("F", "Depot", LatLng::new(24.7, 46.67), 500.0)];
//! let mut detector = TransitionDetector::new();
//!
//! // First sighting inside the fence: recorded silently
//! let at_depot = vec![DeviceSample::new("D").at(24.7, 46.67)];
//! assert!(detector.evaluate(&at_depot, &fences, Utc::now()).is_empty());
//!
//! // Leaving the fence is reported once
//! let away = vec![DeviceSample::new("D").at(24.8, 46.67)];
//! assert_eq!(detector.evaluate(&away, &fences, Utc::now()).len(), 1);
//! assert!(detector.evaluate(&away, &fences, Utc::now()).is_empty());
//! ```

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::device::DeviceSample;
use crate::events::{Transition, TransitionKind};
use crate::geo::LatLng;
use crate::geofence::Geofence;

/// Per-device containment tracker
#[derive(Debug, Clone, Default)]
pub struct TransitionDetector {
    /// Device id -> ids of the fences currently containing it
    inside: HashMap<String, HashSet<String>>,
    /// Fences that were listed but not evaluable in the previous cycle
    inactive_fences: HashSet<String>,
    /// Device id -> fences that were scoped to other devices in the previous cycle
    out_of_scope: HashMap<String, HashSet<String>>,
}

/// Name shown for the device in an event
fn resolve_device_name(fence: &Geofence, device: &DeviceSample) -> String {
    match &fence.device_name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => device.display_name().to_string(),
    }
}

fn transition(
    kind: TransitionKind,
    fence: &Geofence,
    device: &DeviceSample,
    position: LatLng,
    now: DateTime<Utc>,
) -> Transition {
    Transition {
        fence_id: fence.id.clone(),
        fence_name: fence.name.clone(),
        device_id: device.id.clone(),
        device_name: resolve_device_name(fence, device),
        kind,
        position,
        timestamp: now,
    }
}

impl TransitionDetector {
    pub fn new() -> Self {
        TransitionDetector::default()
    }

    /// Run one evaluation cycle.
    ///
    /// Returns the reported transitions in (device, fence) iteration order.
    /// Transitions filtered out by a fence's trigger policy still update
    /// containment state.
    pub fn evaluate(
        &mut self,
        devices: &[DeviceSample],
        fences: &[Geofence],
        now: DateTime<Utc>,
    ) -> Vec<Transition> {
        let active = self.prune_fences(fences);
        self.prune_devices(devices);
        let mut transitions = Vec::new();
        let mut out_of_scope: HashMap<String, HashSet<String>> = HashMap::new();

        for device in devices {
            let position = match device.position() {
                Some(p) if !device.id.is_empty() => p,
                _ => {
                    log::trace!("Skipping device '{}' without position", device.id);
                    continue;
                }
            };

            let first_sighting = !self.inside.contains_key(&device.id);
            let inside = self.inside.entry(device.id.clone()).or_default();
            let skipped = self.out_of_scope.get(&device.id);

            for fence in fences {
                if !active.contains(&fence.id) {
                    continue;
                }
                if !fence.applies_to(&device.id) {
                    // Scope may have changed; never keep a fence for a device it no longer covers
                    inside.remove(&fence.id);
                    out_of_scope
                        .entry(device.id.clone())
                        .or_default()
                        .insert(fence.id.clone());
                    continue;
                }

                let is_inside = fence.contains(&position);
                let was_inside = inside.contains(&fence.id);

                let kind = match (is_inside, was_inside) {
                    (true, false) => {
                        inside.insert(fence.id.clone());
                        let primed = first_sighting
                            || self.inactive_fences.contains(&fence.id)
                            || skipped.map_or(false, |ids| ids.contains(&fence.id));
                        if primed {
                            log::debug!(
                                "{}: already inside '{}' on first evaluation",
                                device.id,
                                fence.name
                            );
                            continue;
                        }
                        TransitionKind::Entered
                    }
                    (false, true) => {
                        inside.remove(&fence.id);
                        TransitionKind::Exited
                    }
                    _ => continue,
                };

                if !fence.trigger_policy.allows(kind) {
                    log::debug!(
                        "{}: {} '{}' (not reported, policy {})",
                        device.id,
                        kind,
                        fence.name,
                        fence.trigger_policy
                    );
                    continue;
                }

                log::debug!("{}: {} '{}'", device.id, kind, fence.name);
                transitions.push(transition(kind, fence, device, position, now));
            }
        }

        self.inactive_fences = fences
            .iter()
            .filter(|f| !active.contains(&f.id))
            .map(|f| f.id.clone())
            .collect();
        self.out_of_scope = out_of_scope;
        transitions
    }

    /// Drop containment of fences that are deleted, disabled or have no center.
    ///
    /// Returns the ids of the fences that remain evaluable.
    pub fn prune_fences(&mut self, fences: &[Geofence]) -> HashSet<String> {
        let active: HashSet<String> = fences
            .iter()
            .filter(|f| f.enabled && f.center().is_some())
            .map(|f| f.id.clone())
            .collect();

        for fence_ids in self.inside.values_mut() {
            fence_ids.retain(|id| active.contains(id));
        }
        active
    }

    /// Drop state of devices missing from `devices`.
    ///
    /// Devices listed without a position keep their state.
    pub fn prune_devices(&mut self, devices: &[DeviceSample]) {
        let present: HashSet<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        self.inside.retain(|id, _| present.contains(id.as_str()));
    }

    /// Whether `device_id` is currently recorded inside `fence_id`
    pub fn is_inside(&self, device_id: &str, fence_id: &str) -> bool {
        self.inside
            .get(device_id)
            .map_or(false, |fences| fences.contains(fence_id))
    }

    /// Fences currently containing `device_id`, in no particular order
    pub fn inside_fences(&self, device_id: &str) -> Vec<&str> {
        self.inside
            .get(device_id)
            .map(|fences| fences.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of devices with recorded state
    pub fn tracked_devices(&self) -> usize {
        self.inside.len()
    }

    /// Forget a device; its next sighting is treated as a first sighting
    pub fn forget_device(&mut self, device_id: &str) -> bool {
        self.inside.remove(device_id).is_some()
    }

    /// Forget all state, as after a restart
    pub fn reset(&mut self) {
        self.inside.clear();
        self.inactive_fences.clear();
        self.out_of_scope.clear();
    }
}
