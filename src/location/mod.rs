//! User location: fixes from the provider, the persisted last-known position
//! and the continuous watch subscription.

pub mod cache;
pub mod watch;

use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use watch::{LocationWatch, WatchId};

/// Options passed with every position request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationOptions {
    /// Give up on a fix after this long
    pub timeout: Duration,
    /// Oldest cached fix the provider may return; zero forces a fresh one
    pub maximum_age: Duration,
    pub high_accuracy: bool,
}

/// One reading from the location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub position: LatLng,
    /// Degrees clockwise from true north, when the device reports one
    pub heading: Option<f64>,
    /// Accuracy radius in meters
    pub accuracy: Option<f64>,
}

impl LocationFix {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            heading: None,
            accuracy: None,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }
}

/// Last known position of the user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub position: LatLng,
    pub heading: Option<f64>,
}

impl UserLocation {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            heading: None,
        }
    }
}

impl From<LocationFix> for UserLocation {
    fn from(fix: LocationFix) -> Self {
        Self {
            position: fix.position,
            heading: fix.heading.map(|h| h.rem_euclid(360.0)),
        }
    }
}
