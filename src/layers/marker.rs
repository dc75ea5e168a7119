use crate::{
    core::geo::LatLng,
    data::listing::{Listing, ListingId, ListingKind},
    input::handler::Session,
};
use serde::{Deserialize, Serialize};

/// What the map widget needs to draw one listing pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub listing_id: ListingId,
    pub position: LatLng,
    pub title: String,
    pub kind: ListingKind,
    pub price: f64,
    /// Only the listing under relocation, and only for its owner
    pub draggable: bool,
    pub favorite: bool,
    pub owned: bool,
    pub selected: bool,
}

impl Marker {
    pub fn for_listing(listing: &Listing, session: &Session) -> Self {
        Self {
            listing_id: listing.id.clone(),
            position: listing.position,
            title: listing.title.clone(),
            kind: listing.kind,
            price: listing.price,
            draggable: session.can_drag(&listing.id),
            favorite: session.is_favorite(&listing.id),
            owned: listing.is_owned_by(session.user_id()),
            selected: session.selected() == Some(listing.id.as_str()),
        }
    }

    /// Short popup text, e.g. "Loft · For Rent · 3500"
    pub fn popup_text(&self) -> String {
        format!("{} · {} · {}", self.title, self.kind, self.price)
    }
}
