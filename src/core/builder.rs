//! Browser builder for fluent configuration
//!
//! Collects a profile, optional overrides and the collaborators, then
//! assembles a [`Browser`].

use crate::{
    core::{
        browser::Browser,
        config::{BrowserConfig, BrowserProfile},
        geo::LatLng,
    },
    services::{
        MemoryAuth, MemoryCache, MemoryFavoriteStore, MemoryListingStore, ScriptedLocation,
        Services,
    },
    traits::{AuthProvider, FavoriteStore, ListingStore, LocalCache, LocationProvider},
    Error, Result,
};
use std::sync::Arc;

/// Builder for creating and configuring Browser instances
#[derive(Default)]
pub struct BrowserBuilder {
    profile: BrowserProfile,
    fallback: Option<LatLng>,
    zoom: Option<f64>,
    strict_bounds: Option<bool>,
    location: Option<Arc<dyn LocationProvider>>,
    listings: Option<Arc<dyn ListingStore>>,
    favorites: Option<Arc<dyn FavoriteStore>>,
    auth: Option<Arc<dyn AuthProvider>>,
    cache: Option<Arc<dyn LocalCache>>,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration profile
    pub fn with_profile(mut self, profile: BrowserProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Use a fully custom configuration
    pub fn with_config(mut self, config: BrowserConfig) -> Self {
        self.profile = BrowserProfile::Custom(config);
        self
    }

    /// Where the map opens when no position is known
    pub fn with_fallback_location(mut self, fallback: LatLng) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Toggle rigid enforcement of the pan restriction
    pub fn with_strict_bounds(mut self, strict: bool) -> Self {
        self.strict_bounds = Some(strict);
        self
    }

    pub fn location_provider(mut self, provider: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(provider);
        self
    }

    pub fn listing_store(mut self, store: Arc<dyn ListingStore>) -> Self {
        self.listings = Some(store);
        self
    }

    pub fn favorite_store(mut self, store: Arc<dyn FavoriteStore>) -> Self {
        self.favorites = Some(store);
        self
    }

    pub fn auth_provider(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn local_cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fill every collaborator that is still unset with an in-memory one.
    /// The location provider reports the fallback position.
    pub fn in_memory(mut self) -> Self {
        let fallback = self
            .fallback
            .unwrap_or_else(|| self.profile.resolve().location.fallback);
        if self.location.is_none() {
            self.location = Some(Arc::new(ScriptedLocation::fixed(fallback)));
        }
        if self.listings.is_none() {
            self.listings = Some(Arc::new(MemoryListingStore::new()));
        }
        if self.favorites.is_none() {
            self.favorites = Some(Arc::new(MemoryFavoriteStore::new()));
        }
        if self.auth.is_none() {
            self.auth = Some(Arc::new(MemoryAuth::new()));
        }
        if self.cache.is_none() {
            self.cache = Some(Arc::new(MemoryCache::new()));
        }
        self
    }

    /// Build the browser with the configured options
    pub fn build(self) -> Result<Browser> {
        let mut config = self.profile.resolve();
        if let Some(fallback) = self.fallback {
            config.location.fallback = fallback;
        }
        if let Some(zoom) = self.zoom {
            config.view.zoom = zoom;
        }
        if let Some(strict) = self.strict_bounds {
            config.proximity.strict_bounds = strict;
        }
        config.validate()?;

        let services = Services {
            location: self.location.ok_or_else(|| missing("location provider"))?,
            listings: self.listings.ok_or_else(|| missing("listing store"))?,
            favorites: self.favorites.ok_or_else(|| missing("favorite store"))?,
            auth: self.auth.ok_or_else(|| missing("auth provider"))?,
            cache: self.cache.ok_or_else(|| missing("local cache"))?,
        };

        log::debug!("Building browser with {:?}", config.proximity);
        Ok(Browser::new(config, services))
    }
}

fn missing(what: &str) -> Error {
    Error::Config(format!("no {} configured", what))
}
