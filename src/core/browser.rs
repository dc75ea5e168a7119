//! The session controller: owns the state machine and performs its I/O.

use crate::{
    core::{
        config::BrowserConfig, constants::EMAIL_FOR_SIGN_IN_CACHE_KEY, geo::LatLng,
        map::MapView, viewport::Viewport,
    },
    data::{
        favorite::{FavoriteMark, FavoriteSet},
        listing::{Listing, ListingDraft, ListingId, NewListing},
        user::{IdentityProvider, User},
    },
    input::{
        events::{Effect, UiEvent},
        handler::{FormMode, Session},
    },
    location::{self, LocationFix, LocationWatch, UserLocation},
    services::Services,
    Error, Result,
};
use chrono::Utc;
use tokio::sync::{mpsc, watch};

pub const SIGN_UP_MESSAGE: &str = "Sign up successful! A verification email has been sent. \
     Please verify your email to fully activate your account.";
pub const RECENT_LOGIN_MESSAGE: &str =
    "Please sign out and sign in again before deleting your account.";
pub const EMAIL_NOT_PROVIDED_MESSAGE: &str = "Email not provided. Cannot complete sign-in.";
pub const EMAIL_VERIFIED_MESSAGE: &str = "Email verified successfully! You can now log in.";

/// Drives one user's browsing session.
///
/// All state changes go through `&mut self`; collaborators are reached through
/// the trait objects in [`Services`].
pub struct Browser {
    config: BrowserConfig,
    services: Services,
    session: Session,
    viewport: Viewport,
    location_error: Option<String>,
}

impl Browser {
    pub fn new(config: BrowserConfig, services: Services) -> Self {
        let mut viewport = Viewport::new(config.location.fallback, config.view.zoom);
        viewport.set_zoom_limits(config.view.min_zoom, config.view.max_zoom);

        Self {
            session: Session::new(config.proximity.clone()),
            viewport,
            config,
            services,
            location_error: None,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Message from the last failed location request, if any
    pub fn location_error(&self) -> Option<&str> {
        self.location_error.as_deref()
    }

    /// Snapshot for rendering
    pub fn view(&self) -> MapView {
        MapView::new(&self.session, &self.viewport, self.location_error.as_deref())
    }

    /// Restores the cached location, asks for a fresh fix, picks up the
    /// signed-in user and loads the listings.
    pub async fn start(&mut self) -> Result<()> {
        let key = self.config.location.cache_key.clone();
        if let Some(cached) = location::cache::load(self.services.cache.as_ref(), &key) {
            log::debug!("Restored cached location {:?}", cached.position);
            self.session.set_user_location(cached);
            self.viewport.set_center(cached.position);
        }

        match self.request_current_position().await {
            Ok(fix) => {
                self.apply_location(fix)?;
                self.viewport.set_center(fix.position);
            }
            Err(e) => {
                log::warn!("Location unavailable: {}", e);
                self.location_error = Some(e.to_string());
                if self.session.user_location().is_none() {
                    let fallback = self.config.location.fallback;
                    self.session.set_user_location(UserLocation::new(fallback));
                    self.viewport.set_center(fallback);
                }
            }
        }

        let user = self.services.auth.current_user();
        let favorites = self.auth_changed(user).await;
        let listings = self.refresh_listings().await;
        self.sync_viewport();
        favorites.and(listings)
    }

    async fn request_current_position(&self) -> Result<LocationFix> {
        let options = self.config.location.options();
        let provider = self.services.location.clone();
        let fix = tokio::time::timeout(options.timeout, provider.current_position(&options))
            .await
            .map_err(|_| {
                Error::LocationUnavailable(format!(
                    "no position fix within {} ms",
                    options.timeout.as_millis()
                ))
            })??;
        fix.position
            .validate()
            .map_err(|e| Error::LocationUnavailable(e.to_string()))?;
        Ok(fix)
    }

    /// Records a position fix and writes it to the local cache
    pub fn apply_location(&mut self, fix: LocationFix) -> Result<()> {
        fix.position.validate()?;
        let location = UserLocation::from(fix);

        let key = &self.config.location.cache_key;
        if let Err(e) = location::cache::store(self.services.cache.as_ref(), key, &location) {
            log::warn!("Failed to cache location: {}", e);
        }

        self.session.set_user_location(location);
        self.location_error = None;
        self.sync_viewport();
        Ok(())
    }

    /// Feeds one update from a [`LocationWatch`] into the session
    pub fn handle_location_update(&mut self, update: Result<LocationFix>) -> Result<()> {
        match update {
            Ok(fix) => self.apply_location(fix),
            Err(e) => {
                log::warn!("Location update failed: {}", e);
                self.location_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Applies every update already queued on the watch; returns how many were applied
    pub fn drain_location_updates(&mut self, watch: &mut LocationWatch) -> usize {
        let mut applied = 0;
        while let Some(update) = watch.try_next() {
            if self.handle_location_update(update).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Subscribes to continuous position updates
    pub fn watch_location(&self) -> Result<LocationWatch> {
        let (sender, updates) = mpsc::unbounded_channel();
        let options = self.config.location.options();
        let id = self.services.location.watch_position(&options, sender)?;
        log::info!("Watching location ({:?})", id);
        Ok(LocationWatch::new(id, self.services.location.clone(), updates))
    }

    pub async fn refresh_listings(&mut self) -> Result<()> {
        let store = self.services.listings.clone();
        let result = store.list_all().await;
        let listings = self.surface(result)?;
        log::debug!("Loaded {} listings", listings.len());
        self.session.replace_listings(listings);
        self.sync_viewport();
        Ok(())
    }

    /// The signed-in user's own listings, straight from the store
    pub async fn own_listings(&mut self) -> Result<Vec<Listing>> {
        let uid = self.require_user()?;
        let store = self.services.listings.clone();
        let result = store.list_by_owner(&uid).await;
        self.surface(result)
    }

    /// Reduces one UI event and carries out the resulting effects
    pub async fn handle(&mut self, event: UiEvent) -> Result<()> {
        if let UiEvent::MapDragEnded { center } = &event {
            self.viewport.set_center(*center);
        }

        let effects = self.session.update(event);
        let mut outcome = Ok(());
        for effect in effects {
            if let Err(e) = self.execute(effect).await {
                outcome = Err(e);
            }
        }
        self.sync_viewport();
        outcome
    }

    async fn execute(&mut self, effect: Effect) -> Result<()> {
        match effect {
            Effect::OpenCreateForm { position } => {
                log::debug!("Create form at {:?}", position);
                Ok(())
            }
            Effect::OpenEditForm { listing_id } => {
                log::debug!("Edit form for listing {}", listing_id);
                Ok(())
            }
            Effect::PersistPosition {
                listing_id,
                position,
            } => self.persist_position(&listing_id, position).await,
            Effect::Recenter { center } => {
                log::debug!("Recentering on {:?}", center);
                self.viewport.set_center(center);
                Ok(())
            }
            Effect::SignOut => {
                let auth = self.services.auth.clone();
                let result = auth.sign_out().await;
                self.surface(result)?;
                log::info!("Signed out");
                self.session.reset_for_logout();
                Ok(())
            }
        }
    }

    async fn persist_position(&mut self, listing_id: &str, position: LatLng) -> Result<()> {
        if !self.session.can_drag(listing_id) {
            log::warn!("Dropping stale relocation of listing {}", listing_id);
            return Ok(());
        }

        let store = self.services.listings.clone();
        let result = store.update_position(listing_id, position).await;
        self.surface(result)?;
        self.session.set_listing_position(listing_id, position);
        log::info!("Moved listing {} to {:?}", listing_id, position);
        Ok(())
    }

    // --- authentication --------------------------------------------------------------------

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        let auth = self.services.auth.clone();
        match auth.sign_in(email, password).await {
            Ok(user) => {
                log::info!("Signed in as {}", user.email);
                self.session.close_auth_dialog();
                if let Err(e) = self.auth_changed(Some(user.clone())).await {
                    log::debug!("Favorites not loaded after sign in: {}", e);
                }
                Ok(user)
            }
            Err(e) => {
                self.session.set_auth_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Creates the account, sends the verification email and signs the user in
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<User> {
        let auth = self.services.auth.clone();
        let result = async {
            let user = auth.sign_up(email, password).await?;
            auth.send_email_verification(&user).await?;
            Ok::<_, Error>(user)
        }
        .await;

        match result {
            Ok(user) => {
                log::info!("Signed up {}", user.email);
                self.session.set_auth_message(SIGN_UP_MESSAGE);
                if let Err(e) = self.auth_changed(Some(user.clone())).await {
                    log::debug!("Favorites not loaded after sign up: {}", e);
                }
                Ok(user)
            }
            Err(e) => {
                self.session.set_auth_error(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn send_password_reset(&mut self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            let message = "Please enter your email address to reset your password.";
            self.session.set_auth_error(message);
            return Err(Error::Validation(message.to_string()));
        }

        let auth = self.services.auth.clone();
        match auth.send_password_reset(email).await {
            Ok(()) => {
                log::info!("Password reset email sent to {}", email);
                self.session.close_auth_dialog();
                Ok(())
            }
            Err(e) => {
                self.session.set_auth_error(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn sign_in_with_provider(&mut self, provider: IdentityProvider) -> Result<User> {
        let auth = self.services.auth.clone();
        match auth.sign_in_with_provider(provider).await {
            Ok(user) => {
                log::info!("Signed in as {} with {}", user.email, provider);
                self.session.close_auth_dialog();
                if let Err(e) = self.auth_changed(Some(user.clone())).await {
                    log::debug!("Favorites not loaded after sign in: {}", e);
                }
                Ok(user)
            }
            Err(e) => {
                self.session
                    .set_auth_error(format!("Error signing in with {}: {}", provider, e));
                Err(e)
            }
        }
    }

    /// Keeps the address a sign-in link went to, for when the link is opened later
    pub fn remember_email_for_sign_in(&self, email: &str) -> Result<()> {
        self.services.cache.set(EMAIL_FOR_SIGN_IN_CACHE_KEY, email.trim())
    }

    /// Finishes a passwordless sign-in from the link the user opened.
    ///
    /// Returns `Ok(None)` when `link` is not a sign-in link. Without an explicit
    /// `email` the remembered address is used; on success it is forgotten.
    pub async fn complete_email_link_sign_in(
        &mut self,
        link: &str,
        email: Option<&str>,
    ) -> Result<Option<User>> {
        let auth = self.services.auth.clone();
        if !auth.is_sign_in_link(link) {
            return Ok(None);
        }

        let cache = self.services.cache.clone();
        let email = match email {
            Some(email) => Some(email.trim().to_string()),
            None => cache.get(EMAIL_FOR_SIGN_IN_CACHE_KEY).unwrap_or_else(|e| {
                log::warn!("Failed to read the sign-in email: {}", e);
                None
            }),
        };
        let Some(email) = email.filter(|e| !e.is_empty()) else {
            self.session.set_auth_error(EMAIL_NOT_PROVIDED_MESSAGE);
            return Err(Error::Validation(EMAIL_NOT_PROVIDED_MESSAGE.to_string()));
        };

        self.session.update(UiEvent::OpenAuthDialog);
        self.session.set_auth_message("Completing sign-in...");
        match auth.complete_email_link_sign_in(&email, link).await {
            Ok(user) => {
                if let Err(e) = cache.remove(EMAIL_FOR_SIGN_IN_CACHE_KEY) {
                    log::warn!("Failed to forget the sign-in email: {}", e);
                }
                log::info!("Signed in as {} from an email link", user.email);
                self.session.set_auth_message(EMAIL_VERIFIED_MESSAGE);
                if let Err(e) = self.auth_changed(Some(user.clone())).await {
                    log::debug!("Favorites not loaded after link sign in: {}", e);
                }
                Ok(Some(user))
            }
            Err(e) => {
                self.session
                    .set_auth_error(format!("Error verifying email: {}", e));
                Err(e)
            }
        }
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        self.handle(UiEvent::Logout).await
    }

    /// Stream of auth state changes from the provider
    pub fn auth_changes(&self) -> watch::Receiver<Option<User>> {
        self.services.auth.subscribe()
    }

    /// Applies the latest state published on `changes` since it was last read.
    /// Returns `true` when the signed-in user changed.
    pub async fn apply_auth_change(
        &mut self,
        changes: &mut watch::Receiver<Option<User>>,
    ) -> Result<bool> {
        if !changes.has_changed().unwrap_or(false) {
            return Ok(false);
        }
        let user = changes.borrow_and_update().clone();
        let uid = user.as_ref().map(|u| u.uid.as_str());
        if uid == self.session.user_id() {
            return Ok(false);
        }
        self.auth_changed(user).await?;
        Ok(true)
    }

    /// Follows an auth state change: reloads favorites on login, clears user state on logout
    pub async fn auth_changed(&mut self, user: Option<User>) -> Result<()> {
        match user {
            Some(user) => {
                self.session.set_user(Some(user));
                self.load_favorites().await?;
            }
            None => {
                if self.session.is_authenticated() {
                    log::info!("Signed out");
                }
                self.session.reset_for_logout();
            }
        }
        self.sync_viewport();
        Ok(())
    }

    async fn load_favorites(&mut self) -> Result<()> {
        let Some(uid) = self.session.user_id().map(str::to_string) else {
            return Ok(());
        };
        let store = self.services.favorites.clone();
        let result = store.list_for_user(&uid).await;
        let marks = self.surface(result)?;
        log::debug!("Loaded {} favorites for {}", marks.len(), uid);
        self.session.set_favorites(FavoriteSet::from_marks(&marks));
        Ok(())
    }

    // --- listings --------------------------------------------------------------------------

    /// Field values for the open form: blank at the dropped pin, or the edited listing
    pub fn form_draft(&self) -> Option<ListingDraft> {
        match self.session.dialogs().form.as_ref()? {
            FormMode::Create { position } => Some(ListingDraft::new(*position)),
            FormMode::Edit { listing_id } => {
                self.session.listing(listing_id).map(ListingDraft::from_listing)
            }
        }
    }

    /// Saves the open form. Failures stay in the form as its inline error.
    pub async fn submit_form(&mut self, draft: ListingDraft) -> Result<ListingId> {
        let result = self.save_form(draft).await;
        match &result {
            Ok(id) => {
                log::info!("Saved listing {}", id);
                self.session.form_submitted();
                if let Err(e) = self.refresh_listings().await {
                    log::debug!("Listings not refreshed after save: {}", e);
                }
            }
            Err(e) => self.session.set_form_error(e.to_string()),
        }
        self.sync_viewport();
        result
    }

    async fn save_form(&mut self, draft: ListingDraft) -> Result<ListingId> {
        let uid = self.require_user()?;
        let fields = draft.validate()?;
        let store = self.services.listings.clone();

        match self.session.dialogs().form.clone() {
            Some(FormMode::Create { .. }) => {
                store
                    .create(NewListing {
                        fields,
                        owner_id: uid,
                        created_at: Utc::now(),
                    })
                    .await
            }
            Some(FormMode::Edit { listing_id }) => {
                let owned = self
                    .session
                    .listing(&listing_id)
                    .is_some_and(|l| l.is_owned_by(Some(&uid)));
                if !owned {
                    return Err(Error::PermissionDenied(format!(
                        "listing {} belongs to another user",
                        listing_id
                    )));
                }
                store.update(&listing_id, fields).await?;
                Ok(listing_id)
            }
            None => Err(Error::Validation("no listing form is open".to_string())),
        }
    }

    /// Deletes an own listing. Returns `false` when nothing was deleted.
    pub async fn delete_listing(&mut self, listing_id: &str, confirmed: bool) -> Result<bool> {
        if !confirmed {
            return Ok(false);
        }
        let owned = self
            .session
            .listing(listing_id)
            .is_some_and(|l| l.is_owned_by(self.session.user_id()));
        if !owned {
            log::warn!("Refusing to delete listing {} not owned by the user", listing_id);
            return Ok(false);
        }

        let store = self.services.listings.clone();
        let result = store.delete(listing_id).await;
        self.surface(result)?;
        log::info!("Deleted listing {}", listing_id);
        self.session.remove_listing(listing_id);
        self.sync_viewport();
        Ok(true)
    }

    /// Flips the favorite mark of a listing; returns the new state
    pub async fn toggle_favorite(&mut self, listing_id: &str) -> Result<bool> {
        let Some(uid) = self.session.user_id().map(str::to_string) else {
            self.session.update(UiEvent::OpenAuthDialog);
            return Err(Error::NotAuthenticated);
        };
        if self.session.listing(listing_id).is_none() {
            return Err(Error::Validation(format!("unknown listing {}", listing_id)));
        }

        let mark = FavoriteMark::new(uid, listing_id);
        let favorite = !self.session.is_favorite(listing_id);
        let store = self.services.favorites.clone();
        let result = if favorite {
            store.put(mark).await
        } else {
            store.delete(&mark.key()).await
        };
        self.surface(result)?;

        // Local set follows the last completed write
        self.session.set_favorite(listing_id, favorite);
        Ok(favorite)
    }

    /// Deletes the auth account, then the listings and favorites it owned.
    /// Nothing is removed when the provider refuses the deletion.
    pub async fn delete_account(&mut self, confirmed: bool) -> Result<bool> {
        if !confirmed {
            return Ok(false);
        }
        let uid = self.require_user()?;

        let auth = self.services.auth.clone();
        match auth.delete_user().await {
            Ok(()) => log::info!("Deleted account {}", uid),
            Err(Error::RequiresRecentLogin) => {
                self.session.show_error(RECENT_LOGIN_MESSAGE);
                return Err(Error::RequiresRecentLogin);
            }
            Err(e) => {
                self.session.show_error(e.to_string());
                return Err(e);
            }
        }

        self.session.close_account_dialog();
        self.session.reset_for_logout();
        let cleanup = self.delete_user_data(&uid).await;
        if let Err(e) = self.refresh_listings().await {
            log::debug!("Listings not refreshed after account deletion: {}", e);
        }
        if let Err(e) = &cleanup {
            self.session.show_error(format!(
                "Account deleted, but some of its data could not be removed: {}",
                e
            ));
        }
        self.sync_viewport();
        cleanup.map(|()| true)
    }

    async fn delete_user_data(&self, uid: &str) -> Result<()> {
        let listings = self.services.listings.clone();
        let favorites = self.services.favorites.clone();
        for listing in listings.list_by_owner(uid).await? {
            listings.delete(&listing.id).await?;
        }
        for mark in favorites.list_for_user(uid).await? {
            favorites.delete(&mark.key()).await?;
        }
        log::debug!("Removed listings and favorites of {}", uid);
        Ok(())
    }

    // --- helpers ---------------------------------------------------------------------------

    fn require_user(&self) -> Result<String> {
        self.session
            .user_id()
            .map(str::to_string)
            .ok_or(Error::NotAuthenticated)
    }

    /// Puts a failed store call on the banner and hands the result back
    fn surface<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.session.show_error(e.to_string());
        }
        result
    }

    fn sync_viewport(&mut self) {
        let restriction = self.session.pan_restriction();
        self.viewport
            .set_restriction(restriction, self.config.proximity.strict_bounds);
    }
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("viewport", &self.viewport)
            .field("location_error", &self.location_error)
            .finish()
    }
}
