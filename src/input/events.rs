use crate::{
    core::{geo::LatLng, viewport::MapType},
    data::listing::ListingId,
};
use serde::{Deserialize, Serialize};

/// User interactions delivered by the map widget and the surrounding buttons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    /// "Add New Property" button
    AddPropertyClicked,
    /// "Cancel Adding Pin" button
    CancelAddingPin,
    /// "Modify My Listings" toggle
    ModifyListingsClicked,
    /// Click on the map background
    MapClicked { lat_lng: LatLng },
    MarkerClicked { listing_id: ListingId },
    MarkerDragEnded { listing_id: ListingId, position: LatLng },
    /// The user finished panning the map
    MapDragEnded { center: LatLng },
    /// "Edit details" on the selected listing
    EditDetailsClicked,
    /// Cancel or close on the listing form
    FormClosed,
    OpenAccountDialog,
    CloseAccountDialog,
    OpenAuthDialog,
    CloseAuthDialog,
    /// Close button on the error banner
    DismissError,
    MapTypeChanged { map_type: MapType },
    /// Show every listing instead of the nearby ones
    ToggleShowAll,
    ToggleFavoritesOnly,
    Logout,
}

impl UiEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::AddPropertyClicked => "add_property",
            UiEvent::CancelAddingPin => "cancel_adding_pin",
            UiEvent::ModifyListingsClicked => "modify_listings",
            UiEvent::MapClicked { .. } => "map_click",
            UiEvent::MarkerClicked { .. } => "marker_click",
            UiEvent::MarkerDragEnded { .. } => "marker_drag_end",
            UiEvent::MapDragEnded { .. } => "map_drag_end",
            UiEvent::EditDetailsClicked => "edit_details",
            UiEvent::FormClosed => "form_closed",
            UiEvent::OpenAccountDialog => "open_account",
            UiEvent::CloseAccountDialog => "close_account",
            UiEvent::OpenAuthDialog => "open_auth",
            UiEvent::CloseAuthDialog => "close_auth",
            UiEvent::DismissError => "dismiss_error",
            UiEvent::MapTypeChanged { .. } => "map_type_changed",
            UiEvent::ToggleShowAll => "toggle_show_all",
            UiEvent::ToggleFavoritesOnly => "toggle_favorites_only",
            UiEvent::Logout => "logout",
        }
    }
}

/// Side effects requested by the state machine. The session controller
/// carries them out against the external services.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show the creation form for a pin at `position`
    OpenCreateForm { position: LatLng },
    /// Show the form pre-filled with an owned listing
    OpenEditForm { listing_id: ListingId },
    /// Write a dragged listing's new coordinate to the store
    PersistPosition { listing_id: ListingId, position: LatLng },
    /// Snap the map back to `center`
    Recenter { center: LatLng },
    /// End the auth session; user state is cleared once it succeeds
    SignOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_deserialize_from_widget_json() {
        let event: UiEvent = serde_json::from_str(
            r#"{ "type": "markerDragEnded", "listing_id": "listing-1", "position": { "lat": 1.0, "lng": 2.0 } }"#,
        )
        .unwrap();
        assert_eq!(
            event,
            UiEvent::MarkerDragEnded {
                listing_id: "listing-1".to_string(),
                position: LatLng::new(1.0, 2.0),
            }
        );
        assert_eq!(event.name(), "marker_drag_end");

        let event: UiEvent = serde_json::from_str(r#"{ "type": "logout" }"#).unwrap();
        assert_eq!(event, UiEvent::Logout);
    }
}
