use chrono::Utc;
use immocation::prelude::*;

/// Integration tests driving a full browser session over in-memory services
#[cfg(test)]
mod session_tests {
    use super::*;

    const HOME: LatLng = LatLng {
        lat: 40.7128,
        lng: -74.0060,
    };
    const EMAIL: &str = "owner@example.com";
    const PASSWORD: &str = "hunter22";

    struct Fixture {
        browser: Browser,
        listings: Arc<MemoryListingStore>,
        favorites: Arc<MemoryFavoriteStore>,
        auth: Arc<MemoryAuth>,
        cache: Arc<MemoryCache>,
        location: Arc<ScriptedLocation>,
        user: User,
    }

    fn fixture(location: ScriptedLocation) -> Fixture {
        let listings = Arc::new(MemoryListingStore::new());
        let favorites = Arc::new(MemoryFavoriteStore::new());
        let auth = Arc::new(MemoryAuth::new());
        let cache = Arc::new(MemoryCache::new());
        let location = Arc::new(location);
        let user = auth.add_account(EMAIL, PASSWORD).unwrap();

        let browser = BrowserBuilder::new()
            .location_provider(location.clone())
            .listing_store(listings.clone())
            .favorite_store(favorites.clone())
            .auth_provider(auth.clone())
            .local_cache(cache.clone())
            .build()
            .unwrap();

        Fixture {
            browser,
            listings,
            favorites,
            auth,
            cache,
            location,
            user,
        }
    }

    fn offset(meters_north: f64) -> LatLng {
        LatLng::new(HOME.lat + meters_north / 111_194.9, HOME.lng)
    }

    async fn seed(store: &MemoryListingStore, owner: &str, position: LatLng) -> ListingId {
        store
            .create(NewListing {
                fields: ListingFields {
                    title: format!("Listing of {}", owner),
                    description: String::new(),
                    price: 990.0,
                    kind: ListingKind::Rent,
                    external_link: None,
                    position,
                },
                owner_id: owner.to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    /// A location request that never answers times out and falls back
    #[tokio::test(start_paused = true)]
    async fn test_slow_location_times_out_to_default() {
        let mut f = fixture(
            ScriptedLocation::fixed(offset(50.0)).with_delay(Duration::from_secs(30)),
        );
        f.browser.start().await.unwrap();

        let error = f.browser.location_error().unwrap();
        assert!(error.contains("5000 ms"), "{}", error);
        assert_eq!(f.browser.session().user_location().unwrap().position, HOME);
    }

    /// A cached position survives a failed fix and nothing overwrites it
    #[tokio::test]
    async fn test_cached_location_is_used_when_fix_fails() {
        let cached = LatLng::new(48.8566, 2.3522);
        let mut f = fixture(ScriptedLocation::unavailable("denied"));
        f.cache
            .set(
                "userLocation",
                &serde_json::to_string(&UserLocation::new(cached)).unwrap(),
            )
            .unwrap();
        f.browser.start().await.unwrap();

        assert!(f.browser.location_error().is_some());
        assert_eq!(f.browser.session().user_location().unwrap().position, cached);
        assert_eq!(f.browser.viewport().center, cached);
    }

    /// Only listings within 1000 m are drawn until "show all" is toggled
    #[tokio::test]
    async fn test_nearby_filter_and_show_all() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        seed(&f.listings, "a", offset(999.0)).await;
        seed(&f.listings, "b", offset(1_001.0)).await;
        seed(&f.listings, "c", offset(5_000.0)).await;
        f.browser.start().await.unwrap();

        assert_eq!(f.browser.view().markers.len(), 1);
        assert!(f.browser.view().restriction.is_some());

        f.browser.handle(UiEvent::ToggleShowAll).await.unwrap();
        assert_eq!(f.browser.view().markers.len(), 3);
    }

    /// Location watch updates the session and the cache; cancelling clears it
    #[tokio::test]
    async fn test_watch_updates_cache_and_cancel_clears_watch() {
        let step = offset(200.0);
        let mut f = fixture(
            ScriptedLocation::fixed(HOME)
                .with_updates(vec![LocationFix::new(step)], Duration::from_millis(5)),
        );
        f.browser.start().await.unwrap();

        let mut watch = f.browser.watch_location().unwrap();
        assert_eq!(f.location.active_watches(), 1);

        let update = watch.next().await.unwrap();
        f.browser.handle_location_update(update).unwrap();
        assert_eq!(f.browser.session().user_location().unwrap().position, step);

        let cached: UserLocation =
            serde_json::from_str(&f.cache.get("userLocation").unwrap().unwrap()).unwrap();
        assert_eq!(cached.position, step);

        watch.cancel();
        assert!(watch.is_cancelled());
        assert_eq!(f.location.active_watches(), 0);
        assert!(watch.next().await.is_none());
    }

    /// Dropping the watch handle tears the provider watch down
    #[tokio::test]
    async fn test_dropped_watch_is_cleared() {
        let f = fixture(ScriptedLocation::fixed(HOME));
        {
            let _watch = f.browser.watch_location().unwrap();
            assert_eq!(f.location.active_watches(), 1);
        }
        assert_eq!(f.location.active_watches(), 0);
    }

    /// "Modify My Listings" toggles back to browsing
    #[tokio::test]
    async fn test_modify_toggle_round_trip() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();

        f.browser.handle(UiEvent::ModifyListingsClicked).await.unwrap();
        assert_eq!(
            f.browser.session().view(),
            &ViewState::ModifyingOwnListings
        );
        assert!(f.browser.view().restriction.is_none());

        f.browser.handle(UiEvent::ModifyListingsClicked).await.unwrap();
        assert!(f.browser.session().view().is_browsing());
    }

    /// Dragging someone else's marker never reaches the store
    #[tokio::test]
    async fn test_foreign_drag_does_not_move_listing() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let own = seed(&f.listings, &f.user.uid, offset(100.0)).await;
        let foreign = seed(&f.listings, "neighbour", offset(300.0)).await;
        let writes = f.listings.write_count();

        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        f.browser.handle(UiEvent::ModifyListingsClicked).await.unwrap();
        f.browser
            .handle(UiEvent::MarkerClicked {
                listing_id: foreign.clone(),
            })
            .await
            .unwrap();
        assert_eq!(
            f.browser.session().view(),
            &ViewState::ModifyingOwnListings
        );

        f.browser
            .handle(UiEvent::MarkerClicked {
                listing_id: own.clone(),
            })
            .await
            .unwrap();
        assert!(f.browser.view().marker(&own).unwrap().draggable);
        assert!(!f.browser.view().marker(&foreign).unwrap().draggable);

        f.browser
            .handle(UiEvent::MarkerDragEnded {
                listing_id: foreign.clone(),
                position: offset(400.0),
            })
            .await
            .unwrap();

        assert_eq!(f.listings.write_count(), writes);
        assert_eq!(f.listings.get(&foreign).unwrap().position, offset(300.0));
        assert_eq!(
            f.browser.session().listing(&foreign).unwrap().position,
            offset(300.0)
        );
    }

    /// Favorites load on login, toggle through the store, and clear on logout
    #[tokio::test]
    async fn test_favorites_follow_auth_state() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let id = seed(&f.listings, "someone", offset(10.0)).await;
        f.browser.start().await.unwrap();

        assert!(matches!(
            f.browser.toggle_favorite(&id).await,
            Err(BrowserError::NotAuthenticated)
        ));
        assert!(f.browser.session().dialogs().auth);

        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert!(f.browser.toggle_favorite(&id).await.unwrap());
        assert!(f.favorites.contains(&FavoriteMark::new(f.user.uid.clone(), id.clone()).key()));
        assert!(f.browser.view().marker(&id).unwrap().favorite);

        f.browser.sign_out().await.unwrap();
        assert!(f.browser.session().favorites().is_empty());
        assert_eq!(f.auth.current_user(), None);

        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        assert!(f.browser.session().is_favorite(&id));

        assert!(!f.browser.toggle_favorite(&id).await.unwrap());
        assert!(f.favorites.is_empty());
    }

    /// Logout clears user state but keeps the listings cache
    #[tokio::test]
    async fn test_logout_keeps_listings() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let own = seed(&f.listings, &f.user.uid, offset(10.0)).await;
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        f.browser.toggle_favorite(&own).await.unwrap();
        f.browser.handle(UiEvent::ModifyListingsClicked).await.unwrap();
        f.browser
            .handle(UiEvent::MarkerClicked {
                listing_id: own.clone(),
            })
            .await
            .unwrap();

        f.browser.handle(UiEvent::Logout).await.unwrap();

        let session = f.browser.session();
        assert!(session.view().is_browsing());
        assert!(session.selected().is_none());
        assert!(session.favorites().is_empty());
        assert!(session.user().is_none());
        assert_eq!(session.listings().len(), 1);
    }

    /// Saving an edit form updates the listing and returns to modify mode
    #[tokio::test]
    async fn test_edit_listing_details() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let own = seed(&f.listings, &f.user.uid, offset(10.0)).await;
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();

        f.browser.handle(UiEvent::ModifyListingsClicked).await.unwrap();
        f.browser
            .handle(UiEvent::MarkerClicked {
                listing_id: own.clone(),
            })
            .await
            .unwrap();
        f.browser.handle(UiEvent::EditDetailsClicked).await.unwrap();

        let mut draft = f.browser.form_draft().unwrap();
        draft.price = "abc".to_string();
        assert!(f.browser.submit_form(draft.clone()).await.is_err());
        assert!(f.browser.session().dialogs().form_error.is_some());

        draft.price = "1250".to_string();
        draft.kind = ListingKind::Sale;
        f.browser.submit_form(draft).await.unwrap();

        assert_eq!(
            f.browser.session().view(),
            &ViewState::ModifyingOwnListings
        );
        let stored = f.listings.get(&own).unwrap();
        assert_eq!(stored.price, 1250.0);
        assert_eq!(stored.kind, ListingKind::Sale);
    }

    /// Deleting needs confirmation and ownership
    #[tokio::test]
    async fn test_delete_listing_requires_confirmation_and_ownership() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let own = seed(&f.listings, &f.user.uid, offset(10.0)).await;
        let foreign = seed(&f.listings, "neighbour", offset(20.0)).await;
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();

        assert!(!f.browser.delete_listing(&own, false).await.unwrap());
        assert!(!f.browser.delete_listing(&foreign, true).await.unwrap());
        assert!(f.browser.delete_listing(&own, true).await.unwrap());

        assert!(f.listings.get(&own).is_none());
        assert!(f.listings.get(&foreign).is_some());
        assert!(f.browser.session().listing(&own).is_none());
    }

    /// A stale session cannot delete the account, and nothing of it is removed
    #[tokio::test]
    async fn test_delete_account_needs_recent_login() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let own = seed(&f.listings, &f.user.uid, offset(10.0)).await;
        let other = seed(&f.listings, "neighbour", offset(20.0)).await;
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        f.browser.toggle_favorite(&other).await.unwrap();
        let writes = f.listings.write_count();
        f.auth.expire_session();

        let err = f.browser.delete_account(true).await.unwrap_err();
        assert!(matches!(err, BrowserError::RequiresRecentLogin));
        assert!(f.browser.session().banner().is_some());
        assert!(f.browser.session().is_authenticated());
        assert!(f.browser.session().is_favorite(&other));

        assert!(f.listings.get(&own).is_some());
        assert_eq!(f.listings.write_count(), writes);
        assert!(f.favorites.contains(&FavoriteMark::new(f.user.uid.clone(), other).key()));
        assert_eq!(f.auth.current_user(), Some(f.user.clone()));
    }

    /// Data cleanup failing after the account is gone is reported, not rolled back
    #[tokio::test]
    async fn test_delete_account_reports_leftover_data() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let own = seed(&f.listings, &f.user.uid, offset(10.0)).await;
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        f.listings.set_offline(true);

        assert!(f.browser.delete_account(true).await.is_err());
        assert!(!f.browser.session().is_authenticated());
        assert_eq!(f.auth.current_user(), None);
        let banner = f.browser.session().banner().unwrap();
        assert!(banner.starts_with("Account deleted"), "{}", banner);

        f.listings.set_offline(false);
        assert!(f.listings.get(&own).is_some());
    }

    /// A failed sign-out keeps the user signed in and shows the error
    #[tokio::test]
    async fn test_failed_sign_out_keeps_session() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let id = seed(&f.listings, "someone", offset(10.0)).await;
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        f.browser.toggle_favorite(&id).await.unwrap();
        f.auth.set_offline(true);

        assert!(f.browser.sign_out().await.is_err());
        let session = f.browser.session();
        assert!(session.is_authenticated());
        assert!(session.is_favorite(&id));
        assert!(session.banner().unwrap().contains("network request failed"));
        assert_eq!(f.auth.current_user(), Some(f.user.clone()));

        f.auth.set_offline(false);
        f.browser.sign_out().await.unwrap();
        assert!(!f.browser.session().is_authenticated());
        assert!(f.browser.session().favorites().is_empty());
    }

    /// A session the provider ends on its own clears the user state
    #[tokio::test]
    async fn test_provider_sign_out_is_applied() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        let own = seed(&f.listings, &f.user.uid, offset(10.0)).await;
        f.browser.start().await.unwrap();
        let mut changes = f.browser.auth_changes();

        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        f.browser.toggle_favorite(&own).await.unwrap();
        // Already reflected by the browser
        assert!(!f.browser.apply_auth_change(&mut changes).await.unwrap());

        f.browser.handle(UiEvent::ModifyListingsClicked).await.unwrap();
        f.browser
            .handle(UiEvent::MarkerClicked {
                listing_id: own.clone(),
            })
            .await
            .unwrap();
        assert!(f.browser.session().can_drag(&own));

        f.auth.sign_out().await.unwrap();
        assert!(f.browser.session().is_authenticated());

        assert!(f.browser.apply_auth_change(&mut changes).await.unwrap());
        let session = f.browser.session();
        assert!(session.user().is_none());
        assert!(session.favorites().is_empty());
        assert!(session.view().is_browsing());
        assert!(!session.can_drag(&own));
        assert!(!f.browser.apply_auth_change(&mut changes).await.unwrap());
    }

    /// Google popup sign-in closes the dialog; a closed popup reports the provider
    #[tokio::test]
    async fn test_sign_in_with_google() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        f.browser.start().await.unwrap();
        f.browser.handle(UiEvent::OpenAuthDialog).await.unwrap();

        assert!(f
            .browser
            .sign_in_with_provider(IdentityProvider::Google)
            .await
            .is_err());
        let error = f.browser.session().dialogs().auth_error.clone().unwrap();
        assert!(error.starts_with("Error signing in with Google: "), "{}", error);
        assert!(!f.browser.session().is_authenticated());

        f.auth
            .set_popup_account(IdentityProvider::Google, "g@example.com")
            .unwrap();
        let user = f
            .browser
            .sign_in_with_provider(IdentityProvider::Google)
            .await
            .unwrap();
        assert_eq!(f.browser.session().user(), Some(&user));
        assert!(!f.browser.session().dialogs().auth);
    }

    /// An opened sign-in link completes with the remembered address and forgets it
    #[tokio::test]
    async fn test_email_link_sign_in() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        f.browser.start().await.unwrap();

        let not_a_link = "https://immocation.test/";
        assert_eq!(
            f.browser
                .complete_email_link_sign_in(not_a_link, None)
                .await
                .unwrap(),
            None
        );

        let link = f.auth.issue_sign_in_link("link@example.com").unwrap();
        assert!(matches!(
            f.browser.complete_email_link_sign_in(&link, None).await,
            Err(BrowserError::Validation(_))
        ));
        assert_eq!(
            f.browser.session().dialogs().auth_error.as_deref(),
            Some("Email not provided. Cannot complete sign-in.")
        );

        f.browser
            .remember_email_for_sign_in("link@example.com")
            .unwrap();
        let user = f
            .browser
            .complete_email_link_sign_in(&link, None)
            .await
            .unwrap()
            .unwrap();
        assert!(user.email_verified);
        assert!(f.browser.session().is_authenticated());
        assert_eq!(
            f.browser.session().dialogs().auth_message.as_deref(),
            Some("Email verified successfully! You can now log in.")
        );
        assert_eq!(f.cache.get("emailForSignIn").unwrap(), None);

        // Links are single use
        f.browser.sign_out().await.unwrap();
        assert!(f
            .browser
            .complete_email_link_sign_in(&link, Some("link@example.com"))
            .await
            .is_err());
        let error = f.browser.session().dialogs().auth_error.clone().unwrap();
        assert!(error.starts_with("Error verifying email: "), "{}", error);
    }

    /// A fresh session deletes the user's data and the account
    #[tokio::test]
    async fn test_delete_account_removes_user_data() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        seed(&f.listings, &f.user.uid, offset(10.0)).await;
        let other = seed(&f.listings, "neighbour", offset(20.0)).await;
        f.browser.start().await.unwrap();
        f.browser.sign_in(EMAIL, PASSWORD).await.unwrap();
        f.browser.toggle_favorite(&other).await.unwrap();

        assert!(!f.browser.delete_account(false).await.unwrap());
        assert!(f.browser.delete_account(true).await.unwrap());

        assert!(!f.browser.session().is_authenticated());
        assert_eq!(f.browser.session().listings().len(), 1);
        assert!(f.favorites.is_empty());
        assert!(f.browser.sign_in(EMAIL, PASSWORD).await.is_err());
        assert!(f.browser.session().dialogs().auth_error.is_some());
    }

    /// Sign up sends the verification mail; reset needs an address
    #[tokio::test]
    async fn test_sign_up_and_password_reset() {
        let mut f = fixture(ScriptedLocation::fixed(HOME));
        f.browser.start().await.unwrap();

        f.browser.sign_up("new@example.com", "abcdef").await.unwrap();
        assert!(f.browser.session().dialogs().auth_message.is_some());
        assert_eq!(
            f.auth.sent_mail(),
            vec![AuthMail::Verification {
                email: "new@example.com".to_string()
            }]
        );

        assert!(matches!(
            f.browser.send_password_reset("  ").await,
            Err(BrowserError::Validation(_))
        ));
        f.browser.send_password_reset(EMAIL).await.unwrap();
        assert!(!f.browser.session().dialogs().auth);
        assert_eq!(f.auth.sent_mail().len(), 2);
    }
}
