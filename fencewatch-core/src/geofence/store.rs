use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fence::{Geofence, TriggerPolicy, FENCE_COLORS};
use crate::error::GeofenceError;

/// Fields supplied by the user when creating a fence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGeofence {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
    #[serde(default)]
    pub trigger_policy: TriggerPolicy,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    /// Palette color is picked when `None`
    #[serde(default)]
    pub color: Option<String>,
    /// Defaults to enabled when `None`
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Partial update of a fence; `None` leaves the field unchanged.
///
/// The nested options on `device_id` and `device_name` distinguish
/// "leave as is" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct GeofencePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    pub trigger_policy: Option<TriggerPolicy>,
    pub enabled: Option<bool>,
    pub device_id: Option<Option<String>>,
    pub device_name: Option<Option<String>>,
    pub color: Option<String>,
}

fn validate_radius(radius: f64) -> Result<(), GeofenceError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(GeofenceError::InvalidRadius(radius))
    }
}

fn validate_lat(lat: f64) -> Result<(), GeofenceError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(GeofenceError::InvalidLatitude(lat))
    }
}

fn validate_lng(lng: f64) -> Result<(), GeofenceError> {
    if (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        Err(GeofenceError::InvalidLongitude(lng))
    }
}

/// The user-maintained list of geofences
///
/// Fences keep their insertion order, which is also the order the
/// detector evaluates them in.
#[derive(Debug, Clone, Default)]
pub struct GeofenceStore {
    fences: Vec<Geofence>,
    next_seq: u64,
}

impl GeofenceStore {
    pub fn new() -> Self {
        GeofenceStore::default()
    }

    pub fn from_fences(fences: Vec<Geofence>) -> Self {
        let next_seq = fences.len() as u64;
        GeofenceStore { fences, next_seq }
    }

    /// Load a store from a JSON array of fences
    pub fn from_json(json: &str) -> Result<Self, GeofenceError> {
        let fences: Vec<Geofence> = serde_json::from_str(json)?;
        Ok(GeofenceStore::from_fences(fences))
    }

    /// Serialize all fences as a pretty-printed JSON array
    pub fn to_json(&self) -> Result<String, GeofenceError> {
        Ok(serde_json::to_string_pretty(&self.fences)?)
    }

    pub fn list(&self) -> &[Geofence] {
        &self.fences
    }

    pub fn get(&self, id: &str) -> Option<&Geofence> {
        self.fences.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    fn generate_id(&mut self, now: DateTime<Utc>) -> String {
        loop {
            let id = format!("gf-{}-{}", now.timestamp_millis(), self.next_seq);
            self.next_seq += 1;
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Create a fence and append it to the list
    pub fn add(&mut self, new: NewGeofence, now: DateTime<Utc>) -> Result<&Geofence, GeofenceError> {
        validate_lat(new.lat)?;
        validate_lng(new.lng)?;
        validate_radius(new.radius)?;

        let id = self.generate_id(now);
        let color = new
            .color
            .unwrap_or_else(|| FENCE_COLORS[self.fences.len() % FENCE_COLORS.len()].to_string());

        self.fences.push(Geofence {
            id,
            name: new.name,
            description: new.description,
            lat: Some(new.lat),
            lng: Some(new.lng),
            radius: new.radius,
            trigger_policy: new.trigger_policy,
            enabled: new.enabled.unwrap_or(true),
            device_id: new.device_id,
            device_name: new.device_name,
            color,
            created_at: now,
            updated_at: None,
        });

        Ok(&self.fences[self.fences.len() - 1])
    }

    /// Apply a partial update to an existing fence
    pub fn update(
        &mut self,
        id: &str,
        patch: GeofencePatch,
        now: DateTime<Utc>,
    ) -> Result<&Geofence, GeofenceError> {
        if let Some(lat) = patch.lat {
            validate_lat(lat)?;
        }
        if let Some(lng) = patch.lng {
            validate_lng(lng)?;
        }
        if let Some(radius) = patch.radius {
            validate_radius(radius)?;
        }

        let fence = self
            .fences
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| GeofenceError::NotFound(id.to_string()))?;

        if let Some(name) = patch.name {
            fence.name = name;
        }
        if let Some(description) = patch.description {
            fence.description = description;
        }
        if let Some(lat) = patch.lat {
            fence.lat = Some(lat);
        }
        if let Some(lng) = patch.lng {
            fence.lng = Some(lng);
        }
        if let Some(radius) = patch.radius {
            fence.radius = radius;
        }
        if let Some(policy) = patch.trigger_policy {
            fence.trigger_policy = policy;
        }
        if let Some(enabled) = patch.enabled {
            fence.enabled = enabled;
        }
        if let Some(device_id) = patch.device_id {
            fence.device_id = device_id;
        }
        if let Some(device_name) = patch.device_name {
            fence.device_name = device_name;
        }
        if let Some(color) = patch.color {
            fence.color = color;
        }
        fence.updated_at = Some(now);

        Ok(fence)
    }

    pub fn remove(&mut self, id: &str) -> Result<Geofence, GeofenceError> {
        let index = self
            .fences
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| GeofenceError::NotFound(id.to_string()))?;
        Ok(self.fences.remove(index))
    }

    /// Flip the enabled flag, returning the new value
    pub fn toggle(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool, GeofenceError> {
        let fence = self
            .fences
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| GeofenceError::NotFound(id.to_string()))?;
        fence.enabled = !fence.enabled;
        fence.updated_at = Some(now);
        Ok(fence.enabled)
    }

    pub fn clear(&mut self) {
        self.fences.clear();
    }
}
