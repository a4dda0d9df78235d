use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::TransitionKind;
use crate::geo::LatLng;

/// Display colors assigned to new fences in rotation
pub const FENCE_COLORS: [&str; 8] = [
    "#00d4aa", // teal (default)
    "#8b5cf6", // purple
    "#f59e0b", // amber
    "#ef4444", // red
    "#3b82f6", // blue
    "#ec4899", // pink
    "#10b981", // emerald
    "#f97316", // orange
];

/// Which transitions of a fence produce a notification
///
/// Containment is tracked for every enabled fence regardless of policy;
/// the policy only filters which transitions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerPolicy {
    /// Report entries only
    #[serde(alias = "in")]
    Enter,
    /// Report exits only
    #[serde(alias = "out")]
    Exit,
    /// Report entries and exits
    #[serde(alias = "in,out")]
    Both,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        TriggerPolicy::Both
    }
}

impl TriggerPolicy {
    /// Whether a transition of `kind` is reported under this policy
    pub fn allows(&self, kind: TransitionKind) -> bool {
        match (self, kind) {
            (TriggerPolicy::Both, _) => true,
            (TriggerPolicy::Enter, TransitionKind::Entered) => true,
            (TriggerPolicy::Exit, TransitionKind::Exited) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TriggerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TriggerPolicy::Enter => "enter",
            TriggerPolicy::Exit => "exit",
            TriggerPolicy::Both => "both",
        };
        write!(f, "{}", s)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_color() -> String {
    FENCE_COLORS[0].to_string()
}

/// A circular geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    /// Unique fence ID (e.g., "gf-1718000000000-3")
    pub id: String,

    /// Human-readable name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Center latitude in degrees
    #[serde(default)]
    pub lat: Option<f64>,

    /// Center longitude in degrees
    #[serde(default)]
    pub lng: Option<f64>,

    /// Radius in meters
    pub radius: f64,

    #[serde(default)]
    pub trigger_policy: TriggerPolicy,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Restrict the fence to a single device; `None` applies to all devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Display name of the scoped device, preferred over the feed's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Geofence {
    /// Create an enabled fence that reports both transitions for all devices.
    ///
    /// `created_at` is left at the Unix epoch; use [`Geofence::created`] or
    /// [`GeofenceStore::add`](crate::geofence::GeofenceStore::add) for a real
    /// creation time.
    pub fn new(id: &str, name: &str, center: LatLng, radius: f64) -> Self {
        Geofence {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            lat: Some(center.lat),
            lng: Some(center.lng),
            radius,
            trigger_policy: TriggerPolicy::Both,
            enabled: true,
            device_id: None,
            device_name: None,
            color: default_color(),
            created_at: DateTime::<Utc>::default(),
            updated_at: None,
        }
    }

    /// Set the creation time
    pub fn created(mut self, now: DateTime<Utc>) -> Self {
        self.created_at = now;
        self
    }

    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.trigger_policy = policy;
        self
    }

    /// Restrict this fence to one device
    pub fn scoped_to(mut self, device_id: &str) -> Self {
        self.device_id = Some(device_id.to_string());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Fence center, if both coordinates are set
    pub fn center(&self) -> Option<LatLng> {
        LatLng::from_parts(self.lat, self.lng)
    }

    /// Whether this fence is evaluated for `device_id`
    pub fn applies_to(&self, device_id: &str) -> bool {
        match &self.device_id {
            Some(scope) => scope == device_id,
            None => true,
        }
    }

    /// Distance from the fence center in meters, `None` without a center
    pub fn distance_from_center(&self, point: &LatLng) -> Option<f64> {
        self.center().map(|c| c.distance_to(point))
    }

    /// Membership test: a point on the boundary is inside.
    ///
    /// A fence without a center never contains anything. NaN distances
    /// compare false and are therefore outside.
    pub fn contains(&self, point: &LatLng) -> bool {
        match self.distance_from_center(point) {
            Some(distance) => distance <= self.radius,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::haversine_distance;

    fn depot() -> Geofence {
        Geofence::new("gf-1", "Depot", LatLng::new(24.7, 46.67), 500.0)
    }

    #[test]
    fn test_contains_center() {
        assert!(depot().contains(&LatLng::new(24.7, 46.67)));
    }

    #[test]
    fn test_boundary_is_inside() {
        let center = LatLng::new(24.7, 46.67);
        let edge = LatLng::new(24.703, 46.67);
        let mut fence = depot();
        fence.radius = haversine_distance(center, edge);
        assert!(fence.contains(&edge));

        // Anything strictly beyond the radius is outside
        fence.radius -= 0.001;
        assert!(!fence.contains(&edge));
    }

    #[test]
    fn test_outside_radius() {
        // About 11.1 km north
        assert!(!depot().contains(&LatLng::new(24.8, 46.67)));
    }

    #[test]
    fn test_missing_center_never_matches() {
        let mut fence = depot();
        fence.lng = None;
        assert!(!fence.contains(&LatLng::new(24.7, 46.67)));
        assert_eq!(fence.distance_from_center(&LatLng::new(24.7, 46.67)), None);
    }

    #[test]
    fn test_nan_point_is_outside() {
        assert!(!depot().contains(&LatLng::new(f64::NAN, 46.67)));
    }

    #[test]
    fn test_created_timestamp() {
        assert_eq!(depot().created_at.timestamp(), 0);

        let now = Utc::now();
        let fence = depot().created(now);
        assert_eq!(fence.created_at, now);
        assert_eq!(fence.updated_at, None);
    }

    #[test]
    fn test_applies_to() {
        let all = depot();
        assert!(all.applies_to("A"));
        assert!(all.applies_to("B"));

        let scoped = depot().scoped_to("A");
        assert!(scoped.applies_to("A"));
        assert!(!scoped.applies_to("B"));
    }

    #[test]
    fn test_policy_allows() {
        assert!(TriggerPolicy::Enter.allows(TransitionKind::Entered));
        assert!(!TriggerPolicy::Enter.allows(TransitionKind::Exited));
        assert!(!TriggerPolicy::Exit.allows(TransitionKind::Entered));
        assert!(TriggerPolicy::Exit.allows(TransitionKind::Exited));
        assert!(TriggerPolicy::Both.allows(TransitionKind::Entered));
        assert!(TriggerPolicy::Both.allows(TransitionKind::Exited));
    }

    #[test]
    fn test_deserialize_legacy_policy_names() {
        let json = r#"{
            "id": "gf-1",
            "name": "Yard",
            "lat": 24.7,
            "lng": 46.67,
            "radius": 250,
            "triggerPolicy": "in,out",
            "deviceId": "860000000000001"
        }"#;
        let fence: Geofence = serde_json::from_str(json).unwrap();
        assert_eq!(fence.trigger_policy, TriggerPolicy::Both);
        assert!(fence.enabled);
        assert_eq!(fence.color, FENCE_COLORS[0]);
        assert_eq!(fence.device_id.as_deref(), Some("860000000000001"));

        let p: TriggerPolicy = serde_json::from_str("\"out\"").unwrap();
        assert_eq!(p, TriggerPolicy::Exit);
        let p: TriggerPolicy = serde_json::from_str("\"enter\"").unwrap();
        assert_eq!(p, TriggerPolicy::Enter);
    }

    #[test]
    fn test_serialize_camel_case() {
        let fence = depot().scoped_to("A").with_policy(TriggerPolicy::Exit);
        let value = serde_json::to_value(&fence).unwrap();
        assert_eq!(value["triggerPolicy"], "exit");
        assert_eq!(value["deviceId"], "A");
        assert!(value.get("updatedAt").is_none());
    }
}
