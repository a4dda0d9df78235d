//! Fencewatch Core
//!
//! Platform-independent geofence transition detection for fleet tracking.
//! This crate does no I/O: positions and fences are handed in by the host,
//! events and notifications are handed back out.
//!
//! # Modules
//!
//! - [`geo`]: haversine distance
//! - [`geofence`]: circular fences, membership test and the fence store
//! - [`device`]: device position samples and the device roster
//! - [`detector`]: per-device containment state machine
//! - [`events`]: bounded event log with read tracking
//! - [`notify`]: notifier abstraction and notification text
//! - [`monitor`]: one polling cycle end to end
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use fencewatch_core::{DeviceSample, Geofence, GeofenceMonitor, LatLng, NullNotifier};
//!
//! let fences = vec![Geofence::new("F", "Depot", LatLng::new(24.7, 46.67), 500.0)];
//! let mut monitor = GeofenceMonitor::new(NullNotifier);
//!
//! monitor.process(&[DeviceSample::new("D").at(24.8, 46.67)], &fences, Utc::now());
//! let recorded = monitor.process(&[DeviceSample::new("D").at(24.7, 46.67)], &fences, Utc::now());
//!
//! assert_eq!(recorded, 1);
//! assert_eq!(monitor.events().unread_count(), 1);
//! ```

pub mod detector;
pub mod device;
pub mod error;
pub mod events;
pub mod geo;
pub mod geofence;
pub mod monitor;
pub mod notify;

pub use detector::TransitionDetector;
pub use device::{DeviceRegistry, DeviceSample};
pub use error::GeofenceError;
pub use events::{EventLog, GeofenceEvent, Transition, TransitionKind, DEFAULT_EVENT_CAPACITY};
pub use geo::{haversine_distance, LatLng, EARTH_RADIUS_M};
pub use geofence::{Geofence, GeofencePatch, GeofenceStore, NewGeofence, TriggerPolicy};
pub use monitor::GeofenceMonitor;
pub use notify::{Notification, Notifier, NullNotifier};
