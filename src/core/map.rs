use crate::{
    core::{
        geo::{LatLng, LatLngBounds},
        viewport::{MapType, Viewport},
    },
    input::handler::{Dialogs, Session, ViewState},
    layers::marker::Marker,
    location::UserLocation,
};
use serde::Serialize;

/// Everything the map widget and the surrounding chrome render from.
///
/// Built fresh from the session and viewport; never mutated by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
    pub map_type: MapType,
    /// Region the map may not be panned out of
    pub restriction: Option<LatLngBounds>,
    pub strict_bounds: bool,
    pub user_location: Option<UserLocation>,
    pub markers: Vec<Marker>,
    pub view_state: ViewState,
    pub dialogs: Dialogs,
    pub banner: Option<String>,
    pub location_error: Option<String>,
    /// Cursor hint for the map: a crosshair while dropping a pin
    pub crosshair: bool,
}

impl MapView {
    pub fn new(session: &Session, viewport: &Viewport, location_error: Option<&str>) -> Self {
        Self {
            center: viewport.center,
            zoom: viewport.zoom,
            map_type: session.map_type(),
            restriction: viewport.restriction().copied(),
            strict_bounds: viewport.strict_bounds(),
            user_location: session.user_location().copied(),
            markers: session.markers(),
            view_state: session.view().clone(),
            dialogs: session.dialogs().clone(),
            banner: session.banner().map(str::to_string),
            location_error: location_error.map(str::to_string),
            crosshair: session.view().is_adding_pin(),
        }
    }

    pub fn marker(&self, listing_id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.listing_id == listing_id)
    }
}
