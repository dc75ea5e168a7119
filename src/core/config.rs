//! Configuration system for proximity rules and location handling
//!
//! A hierarchical configuration: pick a preset profile or supply custom
//! values, either in code or as JSON.

use crate::{
    core::{constants::*, geo::LatLng},
    location::LocationOptions,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserProfile {
    /// Walking distance around the user
    Default,
    /// Wider radii and free panning, for sparse areas
    Relaxed,
    Custom(BrowserConfig),
}

impl BrowserProfile {
    pub fn resolve(&self) -> BrowserConfig {
        match self {
            Self::Default => BrowserConfig::default(),
            Self::Relaxed => BrowserConfig {
                proximity: ProximityConfig {
                    nearby_radius_meters: 5_000.0,
                    pan_restriction_side_meters: 10_000.0,
                    recenter_leash_meters: 7_500.0,
                    strict_bounds: false,
                },
                ..BrowserConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for BrowserProfile {
    fn default() -> Self {
        Self::Default
    }
}

/// Distances that decide what is shown and where the map may go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    pub nearby_radius_meters: f64,
    pub pan_restriction_side_meters: f64,
    pub recenter_leash_meters: f64,
    pub strict_bounds: bool,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            nearby_radius_meters: NEARBY_RADIUS_METERS,
            pan_restriction_side_meters: PAN_RESTRICTION_SIDE_METERS,
            recenter_leash_meters: RECENTER_LEASH_METERS,
            strict_bounds: true,
        }
    }
}

/// Geolocation request settings and the fallback used when they fail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
    pub high_accuracy: bool,
    pub fallback: LatLng,
    pub cache_key: String,
}

impl LocationConfig {
    pub fn options(&self) -> LocationOptions {
        LocationOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            maximum_age: Duration::from_millis(self.maximum_age_ms),
            high_accuracy: self.high_accuracy,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: LOCATION_TIMEOUT_MS,
            maximum_age_ms: LOCATION_MAXIMUM_AGE_MS,
            high_accuracy: true,
            fallback: LatLng::from(DEFAULT_LOCATION),
            cache_key: USER_LOCATION_CACHE_KEY.to_string(),
        }
    }
}

/// Initial camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub proximity: ProximityConfig,
    pub location: LocationConfig,
    pub view: ViewConfig,
}

impl BrowserConfig {
    /// Parses a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.proximity;
        for (name, value) in [
            ("nearby_radius_meters", p.nearby_radius_meters),
            ("pan_restriction_side_meters", p.pan_restriction_side_meters),
            ("recenter_leash_meters", p.recenter_leash_meters),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        self.location
            .fallback
            .validate()
            .map_err(|e| Error::Config(format!("fallback location: {e}")))?;
        if self.location.cache_key.is_empty() {
            return Err(Error::Config("cache_key must not be empty".to_string()));
        }
        if self.view.min_zoom > self.view.max_zoom {
            return Err(Error::Config(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.view.min_zoom, self.view.max_zoom
            )));
        }
        Ok(())
    }
}
