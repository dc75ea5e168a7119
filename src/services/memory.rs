//! In-process implementations of the collaborator traits.
//!
//! They back the demo binary and the tests, and behave like the hosted
//! services where it matters: documents get generated ids, auth sessions can
//! go stale, and every store can be switched offline to exercise error paths.

use crate::{
    core::{
        constants::{FAVORITES_COLLECTION, PROPERTIES_COLLECTION},
        geo::LatLng,
    },
    data::{
        favorite::FavoriteMark,
        listing::{Listing, ListingFields, ListingId, NewListing},
        user::{IdentityProvider, User},
    },
    location::{LocationFix, LocationOptions, WatchId},
    prelude::HashMap,
    runtime::{self, AsyncHandle},
    traits::{AuthProvider, FavoriteStore, ListingStore, LocalCache, LocationProvider},
    Error, Result,
};
use async_trait::async_trait;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};
use tokio::sync::{mpsc::UnboundedSender, watch};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Store("in-memory store lock poisoned".to_string()))
}

fn unreachable_store(collection: &str) -> Error {
    Error::Store(format!("collection '{collection}' is unreachable"))
}

// --- listings -----------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryListingStore {
    docs: Mutex<Vec<Listing>>,
    next_id: AtomicU64,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(listings: Vec<Listing>) -> Self {
        Self {
            next_id: AtomicU64::new(listings.len() as u64),
            docs: Mutex::new(listings),
            ..Self::default()
        }
    }

    /// Makes every subsequent call fail with a store error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &str) -> Option<Listing> {
        lock(&self.docs)
            .ok()?
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(unreachable_store(PROPERTIES_COLLECTION))
        } else {
            Ok(())
        }
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Listing)) -> Result<()> {
        self.check_online()?;
        let mut docs = lock(&self.docs)?;
        let listing = docs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| {
                Error::Store(format!("no document '{id}' in '{PROPERTIES_COLLECTION}'"))
            })?;
        f(listing);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn list_all(&self) -> Result<Vec<Listing>> {
        self.check_online()?;
        Ok(lock(&self.docs)?.clone())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Listing>> {
        self.check_online()?;
        Ok(lock(&self.docs)?
            .iter()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create(&self, listing: NewListing) -> Result<ListingId> {
        self.check_online()?;
        let mut docs = lock(&self.docs)?;
        // Seeded documents may already hold generated-looking ids
        let id = loop {
            let id = format!("listing-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            if !docs.iter().any(|l| l.id == id) {
                break id;
            }
        };
        docs.push(listing.into_listing(id.clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn update(&self, id: &str, fields: ListingFields) -> Result<()> {
        self.modify(id, |listing| listing.apply(fields))
    }

    async fn update_position(&self, id: &str, position: LatLng) -> Result<()> {
        self.modify(id, |listing| listing.position = position)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check_online()?;
        let mut docs = lock(&self.docs)?;
        let before = docs.len();
        docs.retain(|l| l.id != id);
        if docs.len() == before {
            return Err(Error::Store(format!("no document with id '{id}'")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// --- favorites ----------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryFavoriteStore {
    docs: Mutex<HashMap<String, FavoriteMark>>,
    offline: AtomicBool,
}

impl MemoryFavoriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.docs)
            .map(|docs| docs.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        lock(&self.docs).map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(unreachable_store(FAVORITES_COLLECTION))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FavoriteStore for MemoryFavoriteStore {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FavoriteMark>> {
        self.check_online()?;
        let mut marks: Vec<_> = lock(&self.docs)?
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        marks.sort_by(|a, b| a.listing_id.cmp(&b.listing_id));
        Ok(marks)
    }

    async fn put(&self, mark: FavoriteMark) -> Result<()> {
        self.check_online()?;
        lock(&self.docs)?.insert(mark.key(), mark);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_online()?;
        lock(&self.docs)?.remove(key);
        Ok(())
    }
}

// --- auth ---------------------------------------------------------------------------------------

/// Mail the auth provider would have sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMail {
    Verification { email: String },
    PasswordReset { email: String },
    SignInLink { email: String, link: String },
}

const SIGN_IN_LINK_BASE: &str = "https://immocation.test/finishSignIn?oobCode=";

#[derive(Debug)]
struct Account {
    /// `None` for accounts that never set a password
    password: Option<String>,
    user: User,
}

pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    state: watch::Sender<Option<User>>,
    recent_login: AtomicBool,
    offline: AtomicBool,
    next_uid: AtomicU64,
    outbox: Mutex<Vec<AuthMail>>,
    popups: Mutex<HashMap<IdentityProvider, String>>,
    sign_in_links: Mutex<HashMap<String, String>>,
    next_code: AtomicU64,
}

impl MemoryAuth {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::default()),
            state,
            recent_login: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            next_uid: AtomicU64::new(0),
            outbox: Mutex::new(Vec::new()),
            popups: Mutex::new(HashMap::default()),
            sign_in_links: Mutex::new(HashMap::default()),
            next_code: AtomicU64::new(0),
        }
    }

    /// Registers an account without signing it in
    pub fn add_account(&self, email: &str, password: &str) -> Result<User> {
        let mut accounts = lock(&self.accounts)?;
        if accounts.contains_key(email) {
            return Err(Error::Auth(format!("{email} is already in use")));
        }
        let user = User::new(self.fresh_uid(), email);
        accounts.insert(
            email.to_string(),
            Account {
                password: Some(password.to_string()),
                user: user.clone(),
            },
        );
        Ok(user)
    }

    /// Marks the current session as too old for sensitive operations
    pub fn expire_session(&self) {
        self.recent_login.store(false, Ordering::SeqCst);
    }

    /// Makes every subsequent call fail like a dropped connection
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The account a provider popup picks. Without one the popup is closed unanswered.
    pub fn set_popup_account(&self, provider: IdentityProvider, email: &str) -> Result<()> {
        lock(&self.popups)?.insert(provider, email.to_string());
        Ok(())
    }

    /// Mails a passwordless sign-in link to `email` and returns it
    pub fn issue_sign_in_link(&self, email: &str) -> Result<String> {
        self.check_online()?;
        let code = format!("{:06}", self.next_code.fetch_add(1, Ordering::SeqCst) + 1);
        let link = format!("{SIGN_IN_LINK_BASE}{code}");
        lock(&self.sign_in_links)?.insert(code, email.to_string());
        self.post(AuthMail::SignInLink {
            email: email.to_string(),
            link: link.clone(),
        })?;
        Ok(link)
    }

    pub fn sent_mail(&self) -> Vec<AuthMail> {
        lock(&self.outbox).map(|o| o.clone()).unwrap_or_default()
    }

    fn fresh_uid(&self) -> String {
        format!("user-{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::Auth("network request failed".to_string()))
        } else {
            Ok(())
        }
    }

    /// Looks up or creates the account for `email` and marks its address verified
    fn verified_account(&self, email: &str) -> Result<User> {
        let mut accounts = lock(&self.accounts)?;
        let account = accounts.entry(email.to_string()).or_insert_with(|| Account {
            password: None,
            user: User::new(self.fresh_uid(), email),
        });
        account.user.email_verified = true;
        Ok(account.user.clone())
    }

    fn establish(&self, user: User) -> User {
        self.recent_login.store(true, Ordering::SeqCst);
        self.state.send_replace(Some(user.clone()));
        user
    }

    fn post(&self, mail: AuthMail) -> Result<()> {
        lock(&self.outbox)?.push(mail);
        Ok(())
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        self.check_online()?;
        let user = {
            let accounts = lock(&self.accounts)?;
            match accounts.get(email) {
                Some(account) if account.password.as_deref() == Some(password) => {
                    account.user.clone()
                }
                _ => return Err(Error::InvalidCredential),
            }
        };
        Ok(self.establish(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        self.check_online()?;
        if !email.contains('@') {
            return Err(Error::Auth(format!("'{email}' is not a valid email address")));
        }
        if password.chars().count() < 6 {
            return Err(Error::Auth(
                "Password should be at least 6 characters".to_string(),
            ));
        }
        let user = self.add_account(email, password)?;
        Ok(self.establish(user))
    }

    async fn send_email_verification(&self, user: &User) -> Result<()> {
        self.check_online()?;
        self.post(AuthMail::Verification {
            email: user.email.clone(),
        })
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        self.check_online()?;
        if !lock(&self.accounts)?.contains_key(email) {
            return Err(Error::Auth(format!("No account found for {email}")));
        }
        self.post(AuthMail::PasswordReset {
            email: email.to_string(),
        })
    }

    async fn sign_in_with_provider(&self, provider: IdentityProvider) -> Result<User> {
        self.check_online()?;
        let email = lock(&self.popups)?
            .get(&provider)
            .cloned()
            .ok_or_else(|| Error::Auth("the sign-in popup was closed".to_string()))?;
        let user = self.verified_account(&email)?;
        Ok(self.establish(user))
    }

    fn is_sign_in_link(&self, link: &str) -> bool {
        link.strip_prefix(SIGN_IN_LINK_BASE)
            .is_some_and(|code| !code.is_empty())
    }

    async fn complete_email_link_sign_in(&self, email: &str, link: &str) -> Result<User> {
        self.check_online()?;
        let code = link
            .strip_prefix(SIGN_IN_LINK_BASE)
            .ok_or_else(|| Error::Auth("not a sign-in link".to_string()))?;
        {
            let mut links = lock(&self.sign_in_links)?;
            match links.get(code).cloned() {
                Some(sent_to) if sent_to == email => {
                    links.remove(code);
                }
                Some(_) => {
                    return Err(Error::Auth(
                        "the email does not match the sign-in link".to_string(),
                    ))
                }
                None => {
                    return Err(Error::Auth(
                        "the sign-in link is invalid or has expired".to_string(),
                    ))
                }
            }
        }
        let user = self.verified_account(email)?;
        Ok(self.establish(user))
    }

    async fn sign_out(&self) -> Result<()> {
        self.check_online()?;
        self.recent_login.store(false, Ordering::SeqCst);
        self.state.send_replace(None);
        Ok(())
    }

    async fn delete_user(&self) -> Result<()> {
        self.check_online()?;
        let user = self.current_user().ok_or(Error::NotAuthenticated)?;
        if !self.recent_login.load(Ordering::SeqCst) {
            return Err(Error::RequiresRecentLogin);
        }
        lock(&self.accounts)?.remove(&user.email);
        self.sign_out().await
    }

    fn current_user(&self) -> Option<User> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.state.subscribe()
    }
}

// --- location -----------------------------------------------------------------------------------

/// Location provider replaying a fixed script
pub struct ScriptedLocation {
    fix: Mutex<Option<LocationFix>>,
    failure: String,
    delay: Duration,
    updates: Vec<LocationFix>,
    interval: Duration,
    watches: Mutex<HashMap<u64, Box<dyn AsyncHandle>>>,
    next_id: AtomicU64,
}

impl ScriptedLocation {
    /// Always answers with `position`
    pub fn fixed(position: LatLng) -> Self {
        Self::with_fix(Some(LocationFix::new(position)), String::new())
    }

    /// Fails every request with `message`, like a denied permission prompt
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_fix(None, message.into())
    }

    fn with_fix(fix: Option<LocationFix>, failure: String) -> Self {
        Self {
            fix: Mutex::new(fix),
            failure,
            delay: Duration::ZERO,
            updates: Vec::new(),
            interval: Duration::from_millis(10),
            watches: Mutex::new(HashMap::default()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Delays every current-position answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fixes delivered to each watch, one per `interval`
    pub fn with_updates(mut self, updates: Vec<LocationFix>, interval: Duration) -> Self {
        self.updates = updates;
        self.interval = interval;
        self
    }

    pub fn set_fix(&self, fix: Option<LocationFix>) {
        if let Ok(mut current) = self.fix.lock() {
            *current = fix;
        }
    }

    /// Watches started and not yet cleared
    pub fn active_watches(&self) -> usize {
        self.watches.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocation {
    async fn current_position(&self, _options: &LocationOptions) -> Result<LocationFix> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let fix = *lock(&self.fix)?;
        fix.ok_or_else(|| Error::LocationUnavailable(self.failure.clone()))
    }

    fn watch_position(
        &self,
        _options: &LocationOptions,
        sink: UnboundedSender<Result<LocationFix>>,
    ) -> Result<WatchId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let updates = self.updates.clone();
        let interval = self.interval;
        let handle = runtime::spawn(async move {
            for fix in updates {
                tokio::time::sleep(interval).await;
                if sink.send(Ok(fix)).is_err() {
                    break;
                }
            }
        });
        lock(&self.watches)?.insert(id, handle);
        Ok(WatchId(id))
    }

    fn clear_watch(&self, id: WatchId) {
        if let Ok(mut watches) = self.watches.lock() {
            if let Some(handle) = watches.remove(&id.0) {
                handle.cancel();
            }
        }
    }
}

// --- local cache --------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::listing::{ListingDraft, ListingKind};
    use chrono::Utc;

    fn new_listing(owner: &str) -> NewListing {
        let draft = ListingDraft {
            title: "Studio".to_string(),
            description: "Near the park".to_string(),
            price: "1200".to_string(),
            kind: ListingKind::Rent,
            link: String::new(),
            position: LatLng::new(40.0, -74.0),
        };
        NewListing {
            fields: draft.validate().unwrap(),
            owner_id: owner.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_listing_store_crud() {
        let store = MemoryListingStore::new();
        let id = store.create(new_listing("user-1")).await.unwrap();
        store.create(new_listing("user-2")).await.unwrap();

        assert_eq!(store.list_all().await.unwrap().len(), 2);
        assert_eq!(store.list_by_owner("user-1").await.unwrap().len(), 1);

        store
            .update_position(&id, LatLng::new(41.0, -73.0))
            .await
            .unwrap();
        assert_eq!(store.get(&id).unwrap().position, LatLng::new(41.0, -73.0));

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).is_none());
        assert!(matches!(store.delete(&id).await, Err(Error::Store(_))));
        assert_eq!(store.write_count(), 4);
    }

    #[tokio::test]
    async fn test_offline_store_fails_without_writing() {
        let store = MemoryListingStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.create(new_listing("user-1")).await,
            Err(Error::Store(_))
        ));
        store.set_offline(false);
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_auth_flows() {
        let auth = MemoryAuth::new();
        let mut changes = auth.subscribe();

        assert!(matches!(
            auth.sign_up("a@example.com", "123").await,
            Err(Error::Auth(_))
        ));
        let user = auth.sign_up("a@example.com", "secret1").await.unwrap();
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().clone(), Some(user.clone()));

        auth.sign_out().await.unwrap();
        assert_eq!(auth.current_user(), None);
        assert!(matches!(
            auth.sign_in("a@example.com", "wrong").await,
            Err(Error::InvalidCredential)
        ));
        assert_eq!(auth.sign_in("a@example.com", "secret1").await.unwrap(), user);

        auth.expire_session();
        assert!(matches!(auth.delete_user().await, Err(Error::RequiresRecentLogin)));
        auth.sign_in("a@example.com", "secret1").await.unwrap();
        auth.delete_user().await.unwrap();
        assert!(auth.sign_in("a@example.com", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_seeded_store_generates_fresh_ids() {
        let seeded = new_listing("user-1").into_listing("listing-1".to_string());
        let store = MemoryListingStore::with_listings(vec![seeded]);

        let first = store.create(new_listing("user-2")).await.unwrap();
        let second = store.create(new_listing("user-2")).await.unwrap();
        assert_ne!(first, "listing-1");
        assert_ne!(first, second);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
        assert_eq!(store.get("listing-1").unwrap().owner_id, "user-1");
    }

    #[tokio::test]
    async fn test_provider_popup_sign_in() {
        let auth = MemoryAuth::new();
        assert!(matches!(
            auth.sign_in_with_provider(IdentityProvider::Google).await,
            Err(Error::Auth(_))
        ));

        auth.set_popup_account(IdentityProvider::Google, "g@example.com")
            .unwrap();
        let user = auth
            .sign_in_with_provider(IdentityProvider::Google)
            .await
            .unwrap();
        assert!(user.email_verified);
        assert_eq!(auth.current_user(), Some(user.clone()));

        // Same account on the next popup, and no password to sign in with
        auth.sign_out().await.unwrap();
        let again = auth
            .sign_in_with_provider(IdentityProvider::Google)
            .await
            .unwrap();
        assert_eq!(again.uid, user.uid);
        assert!(auth.sign_in("g@example.com", "").await.is_err());
    }

    #[tokio::test]
    async fn test_sign_in_link_is_single_use() {
        let auth = MemoryAuth::new();
        let link = auth.issue_sign_in_link("l@example.com").unwrap();
        assert!(auth.is_sign_in_link(&link));
        assert!(!auth.is_sign_in_link("https://immocation.test/"));
        assert!(matches!(
            auth.sent_mail().last(),
            Some(AuthMail::SignInLink { email, .. }) if email == "l@example.com"
        ));

        assert!(auth
            .complete_email_link_sign_in("other@example.com", &link)
            .await
            .is_err());
        let user = auth
            .complete_email_link_sign_in("l@example.com", &link)
            .await
            .unwrap();
        assert!(user.email_verified);

        auth.sign_out().await.unwrap();
        assert!(auth
            .complete_email_link_sign_in("l@example.com", &link)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_offline_auth_keeps_session() {
        let auth = MemoryAuth::new();
        let user = auth.sign_up("a@example.com", "secret1").await.unwrap();

        auth.set_offline(true);
        assert!(matches!(auth.sign_out().await, Err(Error::Auth(_))));
        assert_eq!(auth.current_user(), Some(user));

        auth.set_offline(false);
        auth.sign_out().await.unwrap();
        assert_eq!(auth.current_user(), None);
    }

    #[tokio::test]
    async fn test_scripted_watch_delivers_and_clears() {
        let provider = ScriptedLocation::fixed(LatLng::new(0.0, 0.0)).with_updates(
            vec![LocationFix::new(LatLng::new(1.0, 1.0))],
            Duration::from_millis(1),
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let options = crate::core::config::LocationConfig::default().options();
        let id = provider.watch_position(&options, tx).unwrap();
        assert_eq!(provider.active_watches(), 1);

        let fix = rx.recv().await.unwrap().unwrap();
        assert_eq!(fix.position, LatLng::new(1.0, 1.0));

        provider.clear_watch(id);
        assert_eq!(provider.active_watches(), 0);
    }
}
