use crate::{
    core::{
        config::ProximityConfig,
        geo::{LatLng, LatLngBounds},
        viewport::MapType,
    },
    data::{
        favorite::FavoriteSet,
        listing::{Listing, ListingId},
        user::User,
    },
    input::events::{Effect, UiEvent},
    layers::marker::Marker,
    location::UserLocation,
    prelude::HashSet,
    spatial::{index::ListingIndex, proximity},
};
use serde::{Deserialize, Serialize};

/// The single active interaction mode of the map
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "listingId", rename_all = "camelCase")]
pub enum ViewState {
    /// Looking around; markers open details
    #[default]
    Browsing,
    /// The next map click drops a pin for a new listing
    AddingPin,
    /// Own markers are selectable for relocation
    ModifyingOwnListings,
    /// This listing's marker is draggable
    EditingLocation(ListingId),
}

impl ViewState {
    pub fn is_browsing(&self) -> bool {
        matches!(self, ViewState::Browsing)
    }

    pub fn is_adding_pin(&self) -> bool {
        matches!(self, ViewState::AddingPin)
    }

    /// Modify mode, including the relocation sub-mode
    pub fn is_modifying(&self) -> bool {
        matches!(
            self,
            ViewState::ModifyingOwnListings | ViewState::EditingLocation(_)
        )
    }

    pub fn editing_listing(&self) -> Option<&str> {
        match self {
            ViewState::EditingLocation(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

/// Which listing form is open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum FormMode {
    Create { position: LatLng },
    Edit { listing_id: ListingId },
}

/// Dialog flags; these are orthogonal to the view state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dialogs {
    pub form: Option<FormMode>,
    /// Inline error of the listing form
    pub form_error: Option<String>,
    pub account: bool,
    pub auth: bool,
    /// Inline error of the auth dialog; the typed fields stay as they are
    pub auth_error: Option<String>,
    pub auth_message: Option<String>,
}

/// Session-scoped UI state, updated only through [`Session::update`] and the
/// controller hooks below.
///
/// Favorites are held once as a set of ids; marker flags are derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    view: ViewState,
    dialogs: Dialogs,
    selected: Option<ListingId>,
    banner: Option<String>,
    user: Option<User>,
    favorites: FavoriteSet,
    listings: Vec<Listing>,
    #[serde(skip)]
    index: ListingIndex,
    user_location: Option<UserLocation>,
    show_all: bool,
    favorites_only: bool,
    map_type: MapType,
    proximity: ProximityConfig,
}

impl Session {
    pub fn new(proximity: ProximityConfig) -> Self {
        Self {
            view: ViewState::default(),
            dialogs: Dialogs::default(),
            selected: None,
            banner: None,
            user: None,
            favorites: FavoriteSet::new(),
            listings: Vec::new(),
            index: ListingIndex::new(),
            user_location: None,
            show_all: false,
            favorites_only: false,
            map_type: MapType::default(),
            proximity,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn dialogs(&self) -> &Dialogs {
        &self.dialogs
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_listing(&self) -> Option<&Listing> {
        self.selected.as_deref().and_then(|id| self.listing(id))
    }

    /// Dismissible error banner
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.uid.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn favorites(&self) -> &FavoriteSet {
        &self.favorites
    }

    pub fn is_favorite(&self, listing_id: &str) -> bool {
        self.favorites.contains(listing_id)
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn listing(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    pub fn user_location(&self) -> Option<&UserLocation> {
        self.user_location.as_ref()
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn favorites_only(&self) -> bool {
        self.favorites_only
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn proximity(&self) -> &ProximityConfig {
        &self.proximity
    }

    /// A listing may be dragged only by its owner, and only while it is the
    /// one being relocated.
    pub fn can_drag(&self, listing_id: &str) -> bool {
        self.view.editing_listing() == Some(listing_id)
            && self
                .listing(listing_id)
                .is_some_and(|l| l.is_owned_by(self.user_id()))
    }

    /// Applies one user event and returns the I/O the controller must perform
    pub fn update(&mut self, event: UiEvent) -> Vec<Effect> {
        log::debug!("event {} in {:?}", event.name(), self.view);
        let mut effects = Vec::new();

        match event {
            UiEvent::AddPropertyClicked => {
                if !self.is_authenticated() {
                    self.dialogs.auth = true;
                } else if !self.view.is_adding_pin() {
                    self.view = ViewState::AddingPin;
                    self.selected = None;
                    self.close_edit_form();
                }
            }
            UiEvent::CancelAddingPin => {
                if self.view.is_adding_pin() {
                    self.view = ViewState::Browsing;
                    if matches!(self.dialogs.form, Some(FormMode::Create { .. })) {
                        self.dialogs.form = None;
                        self.dialogs.form_error = None;
                    }
                }
            }
            UiEvent::ModifyListingsClicked => {
                if !self.is_authenticated() {
                    self.dialogs.auth = true;
                } else {
                    self.view = if self.view.is_modifying() {
                        ViewState::Browsing
                    } else {
                        ViewState::ModifyingOwnListings
                    };
                    self.selected = None;
                    self.close_edit_form();
                }
            }
            UiEvent::MapClicked { lat_lng } => match self.view {
                ViewState::AddingPin => match lat_lng.validate() {
                    Ok(position) => {
                        self.dialogs.form = Some(FormMode::Create { position });
                        self.dialogs.form_error = None;
                        effects.push(Effect::OpenCreateForm { position });
                    }
                    Err(e) => self.show_error(e.to_string()),
                },
                ViewState::Browsing => self.selected = None,
                ViewState::ModifyingOwnListings | ViewState::EditingLocation(_) => {}
            },
            UiEvent::MarkerClicked { listing_id } => self.marker_clicked(listing_id),
            UiEvent::MarkerDragEnded {
                listing_id,
                position,
            } => {
                if !self.can_drag(&listing_id) {
                    log::debug!("ignoring drag of listing {} in {:?}", listing_id, self.view);
                } else {
                    match position.validate() {
                        Ok(position) => effects.push(Effect::PersistPosition {
                            listing_id,
                            position,
                        }),
                        Err(e) => self.show_error(e.to_string()),
                    }
                }
            }
            UiEvent::MapDragEnded { center } => {
                let user = self.user_location.as_ref().map(|l| l.position);
                if let Some(target) =
                    proximity::recenter_target(&self.view, user.as_ref(), &center, &self.proximity)
                {
                    effects.push(Effect::Recenter { center: target });
                }
            }
            UiEvent::EditDetailsClicked => {
                let editable = self
                    .selected_listing()
                    .filter(|l| l.is_owned_by(self.user_id()))
                    .map(|l| l.id.clone());
                if let Some(listing_id) = editable {
                    self.dialogs.form = Some(FormMode::Edit {
                        listing_id: listing_id.clone(),
                    });
                    self.dialogs.form_error = None;
                    effects.push(Effect::OpenEditForm { listing_id });
                }
            }
            UiEvent::FormClosed => {
                self.dialogs.form = None;
                self.dialogs.form_error = None;
                self.banner = None;
                if matches!(self.view, ViewState::EditingLocation(_)) {
                    self.view = ViewState::ModifyingOwnListings;
                }
            }
            UiEvent::OpenAccountDialog => {
                if self.is_authenticated() {
                    self.dialogs.account = true;
                } else {
                    self.dialogs.auth = true;
                }
            }
            UiEvent::CloseAccountDialog => self.dialogs.account = false,
            UiEvent::OpenAuthDialog => self.dialogs.auth = true,
            UiEvent::CloseAuthDialog => self.close_auth_dialog(),
            UiEvent::DismissError => self.banner = None,
            UiEvent::MapTypeChanged { map_type } => self.map_type = map_type,
            UiEvent::ToggleShowAll => self.show_all = !self.show_all,
            UiEvent::ToggleFavoritesOnly => self.favorites_only = !self.favorites_only,
            // User state is cleared once the provider confirms the sign-out
            UiEvent::Logout => {
                if self.is_authenticated() {
                    effects.push(Effect::SignOut);
                } else {
                    self.reset_for_logout();
                }
            }
        }

        effects
    }

    fn marker_clicked(&mut self, listing_id: ListingId) {
        let owned = match self.listing(&listing_id) {
            Some(listing) => listing.is_owned_by(self.user_id()),
            None => {
                log::debug!("click on unknown marker {}", listing_id);
                return;
            }
        };

        match self.view {
            ViewState::Browsing => self.selected = Some(listing_id),
            ViewState::ModifyingOwnListings | ViewState::EditingLocation(_) => {
                if owned {
                    self.selected = Some(listing_id.clone());
                    self.view = ViewState::EditingLocation(listing_id);
                }
            }
            ViewState::AddingPin => {}
        }
    }

    fn close_edit_form(&mut self) {
        if matches!(self.dialogs.form, Some(FormMode::Edit { .. })) {
            self.dialogs.form = None;
            self.dialogs.form_error = None;
        }
    }

    /// Clears everything tied to the signed-in user. The listings cache survives.
    pub fn reset_for_logout(&mut self) {
        self.view = ViewState::Browsing;
        self.selected = None;
        self.user = None;
        self.favorites.clear();
        self.favorites_only = false;
        self.dialogs.form = None;
        self.dialogs.form_error = None;
        self.dialogs.account = false;
    }

    // --- controller hooks ------------------------------------------------------------------

    pub fn set_user(&mut self, user: Option<User>) {
        match user {
            Some(user) => {
                if self.user_id() != Some(user.uid.as_str()) {
                    self.favorites.clear();
                }
                self.user = Some(user);
            }
            None => self.reset_for_logout(),
        }
    }

    pub fn set_favorites(&mut self, favorites: FavoriteSet) {
        self.favorites = favorites;
    }

    pub fn set_favorite(&mut self, listing_id: &str, favorite: bool) {
        if favorite {
            self.favorites.insert(listing_id.to_string());
        } else {
            self.favorites.remove(listing_id);
        }
    }

    /// Swaps in a fresh copy of the listings collection
    pub fn replace_listings(&mut self, listings: Vec<Listing>) {
        self.listings = listings;
        self.rebuild_index();

        if self
            .selected
            .as_deref()
            .is_some_and(|id| self.listing(id).is_none())
        {
            self.selected = None;
        }
        if let Some(id) = self.view.editing_listing() {
            if self.listing(id).is_none() {
                self.view = ViewState::ModifyingOwnListings;
            }
        }
    }

    pub fn set_listing_position(&mut self, listing_id: &str, position: LatLng) {
        if let Some(listing) = self.listings.iter_mut().find(|l| l.id == listing_id) {
            self.index.remove(listing_id, listing.position);
            listing.position = position;
            self.index.insert(listing.id.clone(), position);
        }
    }

    pub fn remove_listing(&mut self, listing_id: &str) {
        if let Some(listing) = self.listing(listing_id) {
            let position = listing.position;
            self.index.remove(listing_id, position);
        }
        self.listings.retain(|l| l.id != listing_id);
        self.favorites.remove(listing_id);
        if self.selected.as_deref() == Some(listing_id) {
            self.selected = None;
        }
        if self.view.editing_listing() == Some(listing_id) {
            self.view = ViewState::ModifyingOwnListings;
        }
        if matches!(&self.dialogs.form, Some(FormMode::Edit { listing_id: id }) if id == listing_id)
        {
            self.dialogs.form = None;
            self.dialogs.form_error = None;
        }
    }

    pub fn set_user_location(&mut self, location: UserLocation) {
        self.user_location = Some(location);
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.banner = Some(message);
    }

    pub fn set_form_error(&mut self, message: impl Into<String>) {
        self.dialogs.form_error = Some(message.into());
    }

    pub fn set_auth_error(&mut self, message: impl Into<String>) {
        self.dialogs.auth = true;
        self.dialogs.auth_message = None;
        self.dialogs.auth_error = Some(message.into());
    }

    pub fn set_auth_message(&mut self, message: impl Into<String>) {
        self.dialogs.auth_error = None;
        self.dialogs.auth_message = Some(message.into());
    }

    pub fn close_auth_dialog(&mut self) {
        self.dialogs.auth = false;
        self.dialogs.auth_error = None;
        self.dialogs.auth_message = None;
    }

    pub fn close_account_dialog(&mut self) {
        self.dialogs.account = false;
    }

    /// A create or edit form was saved successfully
    pub fn form_submitted(&mut self) {
        self.dialogs.form = None;
        self.dialogs.form_error = None;
        self.view = match std::mem::take(&mut self.view) {
            ViewState::AddingPin => ViewState::Browsing,
            ViewState::EditingLocation(_) => ViewState::ModifyingOwnListings,
            other => other,
        };
    }

    fn rebuild_index(&mut self) {
        self.index = ListingIndex::from_listings(&self.listings);
    }

    // --- derived state ---------------------------------------------------------------------

    /// Listings within the nearby radius of the user
    pub fn nearby_listings(&self) -> Vec<&Listing> {
        let Some(location) = &self.user_location else {
            return Vec::new();
        };
        let ids: HashSet<ListingId> = self
            .index
            .nearby(&location.position, self.proximity.nearby_radius_meters)
            .into_iter()
            .collect();
        self.listings.iter().filter(|l| ids.contains(&l.id)).collect()
    }

    /// Listings the map should draw right now
    pub fn visible_listings(&self) -> Vec<&Listing> {
        let nearby: Option<HashSet<&str>> = match (&self.user_location, self.show_all) {
            (Some(_), false) => Some(
                self.nearby_listings()
                    .into_iter()
                    .map(|l| l.id.as_str())
                    .collect(),
            ),
            _ => None,
        };
        let uid = self.user_id();

        self.listings
            .iter()
            .filter(|l| !self.favorites_only || self.favorites.contains(&l.id))
            .filter(|l| match &nearby {
                None => true,
                Some(ids) => {
                    ids.contains(l.id.as_str()) || (self.view.is_modifying() && l.is_owned_by(uid))
                }
            })
            .collect()
    }

    /// Current pan restriction, if the user is browsing with a known location
    pub fn pan_restriction(&self) -> Option<LatLngBounds> {
        let user = self.user_location.as_ref().map(|l| l.position);
        proximity::pan_restriction(&self.view, user.as_ref(), &self.proximity)
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.visible_listings()
            .into_iter()
            .map(|listing| Marker::for_listing(listing, self))
            .collect()
    }
}
