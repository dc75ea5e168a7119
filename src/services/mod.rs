pub mod file_cache;
pub mod memory;

use crate::traits::{AuthProvider, FavoriteStore, ListingStore, LocalCache, LocationProvider};
use std::sync::Arc;

pub use file_cache::FileCache;
pub use memory::{
    AuthMail, MemoryAuth, MemoryCache, MemoryFavoriteStore, MemoryListingStore, ScriptedLocation,
};

/// The collaborators a browser session talks to
#[derive(Clone)]
pub struct Services {
    pub location: Arc<dyn LocationProvider>,
    pub listings: Arc<dyn ListingStore>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub cache: Arc<dyn LocalCache>,
}
