//! Distance rules deciding what the user sees and where the map may go.

use crate::{
    core::{
        config::ProximityConfig,
        geo::{distance_meters, square_bounds, LatLng, LatLngBounds},
    },
    data::listing::Listing,
    input::handler::ViewState,
};

/// Inclusive radius check
pub fn is_nearby(user: &LatLng, position: &LatLng, radius_meters: f64) -> bool {
    distance_meters(user, position) <= radius_meters
}

/// Linear nearby filter; [`crate::spatial::index::ListingIndex::nearby`] answers the same query
pub fn nearby_listings<'a>(
    listings: impl IntoIterator<Item = &'a Listing>,
    user: &LatLng,
    radius_meters: f64,
) -> Vec<&'a Listing> {
    listings
        .into_iter()
        .filter(|l| is_nearby(user, &l.position, radius_meters))
        .collect()
}

/// The square the map is held inside while browsing with a known location.
/// Adding a pin or modifying listings frees the map.
pub fn pan_restriction(
    view: &ViewState,
    user: Option<&LatLng>,
    config: &ProximityConfig,
) -> Option<LatLngBounds> {
    match (view, user) {
        (ViewState::Browsing, Some(user)) => {
            Some(square_bounds(user, config.pan_restriction_side_meters))
        }
        _ => None,
    }
}

/// Soft leash: where to snap the map after a drag ending at `map_center`, if anywhere
pub fn recenter_target(
    view: &ViewState,
    user: Option<&LatLng>,
    map_center: &LatLng,
    config: &ProximityConfig,
) -> Option<LatLng> {
    let user = user?;
    if !view.is_browsing() {
        return None;
    }
    (distance_meters(user, map_center) > config.recenter_leash_meters).then_some(*user)
}
