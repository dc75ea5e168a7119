use anyhow::Context;
use immocation::prelude::*;

const DEMO_EMAIL: &str = "demo@immocation.test";
const DEMO_PASSWORD: &str = "demo-password";

/// Headless property browser: runs a scripted session over in-memory services
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => BrowserConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => BrowserConfig::default(),
    };
    let home = config.location.fallback;

    let listings = Arc::new(MemoryListingStore::new());
    seed_listings(listings.as_ref(), home).await?;

    let auth = Arc::new(MemoryAuth::new());
    auth.add_account(DEMO_EMAIL, DEMO_PASSWORD)?;

    let walk = (1..=3)
        .map(|step| LocationFix::new(LatLng::new(home.lat + 0.0005 * step as f64, home.lng)))
        .collect();
    let location =
        ScriptedLocation::fixed(home).with_updates(walk, Duration::from_millis(50));

    let mut browser = BrowserBuilder::new()
        .with_config(config)
        .location_provider(Arc::new(location))
        .listing_store(listings.clone())
        .auth_provider(auth.clone())
        .in_memory()
        .build()?;

    browser.start().await?;
    report("started", &browser);

    browser.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await?;
    report("signed in", &browser);

    // Drop a pin a little east of home and save a listing there
    browser.handle(UiEvent::AddPropertyClicked).await?;
    let pin = LatLng::new(home.lat, home.lng + 0.002);
    browser.handle(UiEvent::MapClicked { lat_lng: pin }).await?;
    let mut draft = browser
        .form_draft()
        .context("create form did not open")?;
    draft.title = "Sunny two-room flat".to_string();
    draft.description = "Fourth floor, balcony".to_string();
    draft.price = "2400".to_string();
    let created = browser.submit_form(draft).await?;
    println!("created listing {}", created);

    let favorite = browser.toggle_favorite(&created).await?;
    println!("favorite {}: {}", created, favorite);

    // Move the new listing a few meters north
    browser.handle(UiEvent::ModifyListingsClicked).await?;
    browser
        .handle(UiEvent::MarkerClicked {
            listing_id: created.clone(),
        })
        .await?;
    let moved = LatLng::new(pin.lat + 0.0003, pin.lng);
    browser
        .handle(UiEvent::MarkerDragEnded {
            listing_id: created.clone(),
            position: moved,
        })
        .await?;
    browser.handle(UiEvent::ModifyListingsClicked).await?;
    report("relocated", &browser);

    let mut watch = browser.watch_location()?;
    for _ in 0..3 {
        match watch.next().await {
            Some(update) => {
                if let Err(e) = browser.handle_location_update(update) {
                    log::warn!("skipping location update: {}", e);
                }
            }
            None => break,
        }
    }
    watch.cancel();
    report("walked", &browser);

    browser.sign_out().await?;
    report("signed out", &browser);

    // Passwordless sign-in: the link is opened later, the address comes from the cache
    let link = auth.issue_sign_in_link(DEMO_EMAIL)?;
    browser.remember_email_for_sign_in(DEMO_EMAIL)?;
    if let Some(user) = browser.complete_email_link_sign_in(&link, None).await? {
        println!("signed in from link as {} (verified: {})", user.email, user.email_verified);
    }

    // The provider ends the session without going through the browser
    let mut auth_changes = browser.auth_changes();
    auth.sign_out().await?;
    if browser.apply_auth_change(&mut auth_changes).await? {
        report("session ended", &browser);
    }

    Ok(())
}

async fn seed_listings(store: &MemoryListingStore, home: LatLng) -> anyhow::Result<()> {
    let seeds = [
        ("Corner studio", ListingKind::Rent, 1_650.0, 0.003, 0.0),
        ("Loft with terrace", ListingKind::Sale, 845_000.0, -0.004, 0.003),
        ("Riverside house", ListingKind::Sale, 1_290_000.0, 0.05, 0.04),
    ];
    for (title, kind, price, dlat, dlng) in seeds {
        store
            .create(NewListing {
                fields: ListingFields {
                    title: title.to_string(),
                    description: String::new(),
                    price,
                    kind,
                    external_link: None,
                    position: LatLng::new(home.lat + dlat, home.lng + dlng),
                },
                owner_id: "seed-owner".to_string(),
                created_at: chrono::Utc::now(),
            })
            .await?;
    }
    Ok(())
}

fn report(stage: &str, browser: &Browser) {
    let view = browser.view();
    println!(
        "[{}] mode={:?} center=({:.5}, {:.5}) markers={}",
        stage,
        view.view_state,
        view.center.lat,
        view.center.lng,
        view.markers.len()
    );
    for marker in &view.markers {
        let mut flags = Vec::new();
        if marker.owned {
            flags.push("own");
        }
        if marker.favorite {
            flags.push("favorite");
        }
        if marker.draggable {
            flags.push("draggable");
        }
        println!("    {} [{}]", marker.popup_text(), flags.join(","));
    }
    if let Some(banner) = &view.banner {
        println!("    banner: {}", banner);
    }
    if let Some(error) = &view.location_error {
        println!("    location: {}", error);
    }
}
