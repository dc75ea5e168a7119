//! # Immocation
//!
//! Core of a location-based property listing browser: proximity filtering
//! around the user, a map interaction state machine, and the session
//! controller that ties them to location, storage and auth collaborators.

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod location;
pub mod prelude;
pub mod runtime;
pub mod services;
pub mod spatial;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    browser::Browser,
    builder::BrowserBuilder,
    config::{BrowserConfig, BrowserProfile},
    geo::{distance_meters, square_bounds, LatLng, LatLngBounds},
    map::MapView,
    viewport::{MapType, Viewport},
};

pub use data::{
    favorite::{FavoriteMark, FavoriteSet},
    listing::{Listing, ListingDraft, ListingFields, ListingId, ListingKind, NewListing},
    user::{IdentityProvider, User},
};

pub use input::{
    events::{Effect, UiEvent},
    handler::{Dialogs, FormMode, Session, ViewState},
};

pub use layers::marker::Marker;

pub use location::{LocationFix, LocationOptions, LocationWatch, UserLocation, WatchId};

pub use spatial::index::ListingIndex;

pub use traits::{AuthProvider, FavoriteStore, ListingStore, LocalCache, LocationProvider};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid email or password")]
    InvalidCredential,

    #[error("This operation requires a recent login")]
    RequiresRecentLogin,

    #[error("You must be logged in to add or edit a property.")]
    NotAuthenticated,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = BrowserError;
