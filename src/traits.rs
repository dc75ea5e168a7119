//! Seams to the external collaborators
//!
//! The browser never talks to a geolocation API, document store or identity
//! provider directly; it goes through these traits. In-memory and file-backed
//! implementations live in [`crate::services`].

use crate::{
    core::geo::LatLng,
    data::{
        favorite::FavoriteMark,
        listing::{Listing, ListingFields, ListingId, NewListing},
        user::{IdentityProvider, User},
    },
    location::{LocationFix, LocationOptions, WatchId},
    Result,
};
use async_trait::async_trait;
use tokio::sync::{mpsc::UnboundedSender, watch};

/// Device geolocation
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Requests a single fresh fix
    async fn current_position(&self, options: &LocationOptions) -> Result<LocationFix>;

    /// Starts delivering fixes (or errors) into `sink` until cleared
    fn watch_position(
        &self,
        options: &LocationOptions,
        sink: UnboundedSender<Result<LocationFix>>,
    ) -> Result<WatchId>;

    /// Stops a watch. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);
}

/// The `properties` collection
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Listing>>;

    /// Listings whose `userId` equals `owner_id`
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Listing>>;

    async fn create(&self, listing: NewListing) -> Result<ListingId>;

    async fn update(&self, id: &str, fields: ListingFields) -> Result<()>;

    async fn update_position(&self, id: &str, position: LatLng) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// The `favorites` collection, keyed by `userId_listingId`
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FavoriteMark>>;

    async fn put(&self, mark: FavoriteMark) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User>;

    /// Creates an account and signs it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<User>;

    async fn send_email_verification(&self, user: &User) -> Result<()>;

    async fn send_password_reset(&self, email: &str) -> Result<()>;

    /// Popup sign-in through a federated provider
    async fn sign_in_with_provider(&self, provider: IdentityProvider) -> Result<User>;

    /// Whether `link` is a passwordless sign-in link issued by this provider
    fn is_sign_in_link(&self, link: &str) -> bool;

    /// Finishes a passwordless sign-in. The account's email counts as verified afterwards.
    async fn complete_email_link_sign_in(&self, email: &str, link: &str) -> Result<User>;

    async fn sign_out(&self) -> Result<()>;

    /// Deletes the signed-in account. Fails with `RequiresRecentLogin` on a stale session.
    async fn delete_user(&self) -> Result<()>;

    fn current_user(&self) -> Option<User>;

    /// Session-change notifications: the current user after every login or logout
    fn subscribe(&self) -> watch::Receiver<Option<User>>;
}

/// Small key-value string storage that survives restarts
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
