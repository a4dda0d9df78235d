use thiserror::Error;

/// Errors from geofence store operations
#[derive(Error, Debug)]
pub enum GeofenceError {
    #[error("Geofence '{0}' not found")]
    NotFound(String),
    #[error("Invalid radius {0}, must be a positive number of meters")]
    InvalidRadius(f64),
    #[error("Latitude {0} out of range [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Longitude {0} out of range [-180, 180]")]
    InvalidLongitude(f64),
    #[error("Malformed geofence list: {0}")]
    Json(#[from] serde_json::Error),
}
