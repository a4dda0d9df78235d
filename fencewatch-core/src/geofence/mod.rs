//! Circular Geofences
//!
//! This module provides the geofence model and the membership test used by
//! the transition detector, plus the user-maintained fence store.
//!
//! # Features
//!
//! - Circular zones defined by center and radius in meters
//! - Per-fence trigger policy (entry, exit or both)
//! - Optional restriction to a single device
//! - Enable/disable without deleting the fence
//!
//! # Example
//!
//! ```rust
//! use fencewatch_core::geo::LatLng;
//! use fencewatch_core::geofence::{Geofence, TriggerPolicy};
//!
//! let depot = Geofence::new("gf-1", "Depot", LatLng::new(24.7, 46.67), 500.0)
//!     .with_policy(TriggerPolicy::Enter);
//!
//! assert!(depot.contains(&LatLng::new(24.7, 46.67)));
//! assert!(!depot.contains(&LatLng::new(24.8, 46.67)));
//! ```

mod fence;
mod store;

pub use fence::*;
pub use store::*;
