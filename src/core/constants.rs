//! Core constants for proximity rules, location handling and store layout.
//! Keeping them in a single place makes it easier to tweak the browser's magic numbers.

/// Mean Earth radius used by the haversine distance, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Flat-Earth conversion factor: meters spanned by one degree of latitude
/// (and one degree of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_319.9;

/// Listings within this distance of the user are shown by default (inclusive).
pub const NEARBY_RADIUS_METERS: f64 = 1_000.0;

/// Side of the square the map is allowed to pan within while browsing.
pub const PAN_RESTRICTION_SIDE_METERS: f64 = 2_000.0;

/// Dragging the map further than this from the user snaps it back.
pub const RECENTER_LEASH_METERS: f64 = 1_500.0;

/// Fallback position when geolocation is denied or unsupported (New York City).
pub const DEFAULT_LOCATION: (f64, f64) = (40.7128, -74.0060);

/// Initial zoom level of the map.
pub const DEFAULT_ZOOM: f64 = 13.0;

/// Zoom limits accepted by the viewport.
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 21.0;

/// Accept-first-fix timeout for a current position request.
pub const LOCATION_TIMEOUT_MS: u64 = 5_000;

/// Maximum age of a cached fix; zero disallows cached fixes.
pub const LOCATION_MAXIMUM_AGE_MS: u64 = 0;

/// Local cache key holding the last known user location.
pub const USER_LOCATION_CACHE_KEY: &str = "userLocation";

/// Local cache key holding the email a sign-in link was sent to.
pub const EMAIL_FOR_SIGN_IN_CACHE_KEY: &str = "emailForSignIn";

/// Document store collection names.
pub const PROPERTIES_COLLECTION: &str = "properties";
pub const FAVORITES_COLLECTION: &str = "favorites";
