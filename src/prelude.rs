//! Prelude module for common immocation types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use immocation::prelude::*;`

pub use crate::core::{
    browser::Browser,
    builder::BrowserBuilder,
    config::{BrowserConfig, BrowserProfile, LocationConfig, ProximityConfig, ViewConfig},
    geo::{distance_meters, square_bounds, LatLng, LatLngBounds},
    map::MapView,
    viewport::{MapType, Viewport},
};

pub use crate::data::{
    favorite::{FavoriteMark, FavoriteSet},
    listing::{
        Listing, ListingDraft, ListingFields, ListingId, ListingKind, NewListing, UserId,
    },
    user::{IdentityProvider, User},
};

pub use crate::input::{
    events::{Effect, UiEvent},
    handler::{Dialogs, FormMode, Session, ViewState},
};

pub use crate::layers::marker::Marker;

pub use crate::location::{LocationFix, LocationOptions, LocationWatch, UserLocation, WatchId};

pub use crate::services::{
    AuthMail, FileCache, MemoryAuth, MemoryCache, MemoryFavoriteStore, MemoryListingStore,
    ScriptedLocation, Services,
};

pub use crate::spatial::{index::ListingIndex, proximity};

pub use crate::traits::{AuthProvider, FavoriteStore, ListingStore, LocalCache, LocationProvider};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::{Error as BrowserError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
