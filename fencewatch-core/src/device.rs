//! Device Position Samples
//!
//! Types for the latest known position of each tracked device. Samples come
//! from an unreliable external feed, so every field except the identifier is
//! optional and the registry tolerates partial updates.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::LatLng;

/// Parse a feed timestamp: RFC 3339, or "YYYY-MM-DD HH:MM:SS" taken as UTC
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

// Feeds send numbers either as JSON numbers or as strings; anything else is dropped
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

/// Latest known state of one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSample {
    /// Stable device key (IMEI)
    #[serde(alias = "imei")]
    pub id: String,

    /// Display name
    #[serde(default, alias = "deviceName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,

    /// GPS fix time reported by the device
    #[serde(
        default,
        alias = "gpsTime",
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    /// Speed in km/h
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl DeviceSample {
    pub fn new(id: &str) -> Self {
        DeviceSample {
            id: id.to_string(),
            name: None,
            lat: None,
            lng: None,
            timestamp: None,
            speed: None,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Position, if both coordinates are known
    pub fn position(&self) -> Option<LatLng> {
        LatLng::from_parts(self.lat, self.lng)
    }

    /// A sample takes part in detection only with an id and a position
    pub fn is_locatable(&self) -> bool {
        !self.id.is_empty() && self.position().is_some()
    }

    /// Name shown to the user: the display name, or the id without one
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name.as_str(),
            _ => self.id.as_str(),
        }
    }

    /// Merge a location update into this sample.
    ///
    /// Position fields present in `update` replace ours; the display name
    /// is never overwritten once known.
    pub fn merge_location(&mut self, update: &DeviceSample) {
        if update.lat.is_some() {
            self.lat = update.lat;
        }
        if update.lng.is_some() {
            self.lng = update.lng;
        }
        if update.timestamp.is_some() {
            self.timestamp = update.timestamp;
        }
        if update.speed.is_some() {
            self.speed = update.speed;
        }
        if self.name.is_none() {
            self.name = update.name.clone();
        }
    }
}

/// Roster of known devices with their latest positions, in roster order
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceSample>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry::default()
    }

    /// Replace the roster
    pub fn set_devices(&mut self, devices: Vec<DeviceSample>) {
        self.devices = devices;
    }

    /// Merge location updates into known devices.
    ///
    /// Updates for ids not on the roster are ignored. Returns the number of
    /// devices updated.
    pub fn update_locations(&mut self, updates: &[DeviceSample]) -> usize {
        let mut updated = 0;
        for device in self.devices.iter_mut() {
            if let Some(update) = updates.iter().find(|u| u.id == device.id) {
                device.merge_location(update);
                updated += 1;
            }
        }
        updated
    }

    /// Merge a sample into a known device or append it to the roster
    pub fn upsert(&mut self, sample: DeviceSample) {
        match self.devices.iter_mut().find(|d| d.id == sample.id) {
            Some(device) => device.merge_location(&sample),
            None => self.devices.push(sample),
        }
    }

    pub fn get(&self, id: &str) -> Option<&DeviceSample> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn samples(&self) -> &[DeviceSample] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locatable() {
        assert!(DeviceSample::new("A").at(1.0, 2.0).is_locatable());
        assert!(!DeviceSample::new("A").is_locatable());
        assert!(!DeviceSample::new("").at(1.0, 2.0).is_locatable());

        let mut half = DeviceSample::new("A");
        half.lat = Some(1.0);
        assert!(!half.is_locatable());
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(DeviceSample::new("A").display_name(), "A");
        assert_eq!(DeviceSample::new("A").named("Truck").display_name(), "Truck");
        assert_eq!(DeviceSample::new("A").named("").display_name(), "A");
    }

    #[test]
    fn test_update_locations_keeps_names() {
        let mut registry = DeviceRegistry::new();
        registry.set_devices(vec![
            DeviceSample::new("A").named("Truck A"),
            DeviceSample::new("B").named("Truck B").at(1.0, 1.0),
        ]);

        let updates = vec![
            DeviceSample::new("A").named("860000000000001").at(24.7, 46.67),
            DeviceSample::new("C").at(0.0, 0.0),
        ];
        assert_eq!(registry.update_locations(&updates), 1);

        let a = registry.get("A").unwrap();
        assert_eq!(a.display_name(), "Truck A");
        assert_eq!(a.position(), Some(LatLng::new(24.7, 46.67)));

        // Untouched device keeps its old position, unknown device ignored
        assert_eq!(registry.get("B").unwrap().position(), Some(LatLng::new(1.0, 1.0)));
        assert!(registry.get("C").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_partial_update_keeps_last_position() {
        let mut registry = DeviceRegistry::new();
        registry.set_devices(vec![DeviceSample::new("A").at(1.0, 2.0)]);

        let mut update = DeviceSample::new("A");
        update.speed = Some(42.0);
        registry.update_locations(&[update]);

        let a = registry.get("A").unwrap();
        assert_eq!(a.position(), Some(LatLng::new(1.0, 2.0)));
        assert_eq!(a.speed, Some(42.0));
    }

    #[test]
    fn test_upsert() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(DeviceSample::new("A").at(1.0, 1.0));
        registry.upsert(DeviceSample::new("B"));
        registry.upsert(DeviceSample::new("A").at(2.0, 2.0));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.samples()[0].position(), Some(LatLng::new(2.0, 2.0)));
    }

    #[test]
    fn test_deserialize_sparse_sample() {
        let sample: DeviceSample = serde_json::from_str(r#"{"id": "A"}"#).unwrap();
        assert_eq!(sample, DeviceSample::new("A"));

        let sample: DeviceSample = serde_json::from_str(
            r#"{"id": "A", "lat": 24.7, "lng": 46.67, "speed": 12.5,
                "timestamp": "2024-06-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(sample.is_locatable());
        assert_eq!(sample.speed, Some(12.5));
    }

    #[test]
    fn test_deserialize_vendor_fields() {
        let sample: DeviceSample = serde_json::from_str(
            r#"{"imei": "860000000000001", "deviceName": "Truck 7",
                "lat": "24.7", "lng": "46.67", "speed": "",
                "gpsTime": "2024-06-01 12:00:00", "status": "1"}"#,
        )
        .unwrap();
        assert_eq!(sample.id, "860000000000001");
        assert_eq!(sample.display_name(), "Truck 7");
        assert_eq!(sample.position(), Some(LatLng::new(24.7, 46.67)));
        assert_eq!(sample.speed, None);
        assert_eq!(sample.timestamp, parse_timestamp("2024-06-01T12:00:00Z"));
        assert!(sample.timestamp.is_some());
    }

    #[test]
    fn test_unparseable_values_become_none() {
        let sample: DeviceSample = serde_json::from_str(
            r#"{"id": "A", "lat": null, "lng": true, "timestamp": "yesterday"}"#,
        )
        .unwrap();
        assert_eq!(sample, DeviceSample::new("A"));
    }
}
