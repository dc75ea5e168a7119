use crate::core::{
    constants::{MAX_ZOOM, MIN_ZOOM},
    geo::{LatLng, LatLngBounds},
};
use serde::{Deserialize, Serialize};

/// Base map style reported by the map widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    #[default]
    Roadmap,
    Satellite,
    Hybrid,
    Terrain,
}

/// Manages the current view of the map: center, zoom and pan restriction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
    /// Region the center may not leave
    restriction: Option<LatLngBounds>,
    /// Rigid enforcement of the restriction (no overscroll)
    strict_bounds: bool,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            restriction: None,
            strict_bounds: false,
        }
    }

    /// Sets or lifts the pan restriction, pulling the center inside when strict
    pub fn set_restriction(&mut self, bounds: Option<LatLngBounds>, strict_bounds: bool) {
        self.restriction = bounds;
        self.strict_bounds = strict_bounds;
        self.center = self.clamp_center(self.center);
    }

    pub fn restriction(&self) -> Option<&LatLngBounds> {
        self.restriction.as_ref()
    }

    pub fn strict_bounds(&self) -> bool {
        self.strict_bounds
    }

    /// Sets the center of the viewport with bounds checking
    pub fn set_center(&mut self, center: LatLng) {
        self.center = self.clamp_center(center);
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    fn clamp_center(&self, center: LatLng) -> LatLng {
        match (&self.restriction, self.strict_bounds) {
            (Some(bounds), true) => bounds.clamp(&center),
            _ => center,
        }
    }
}
