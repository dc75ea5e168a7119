use crate::{
    core::geo::{distance_meters, square_bounds, LatLng, LatLngBounds},
    data::listing::{Listing, ListingId},
};

use rstar::{RTree, RTreeObject, AABB};

/// The flat-Earth box is a little tighter than the haversine circle it has to
/// cover; widen the candidate box so no in-radius listing is missed.
const CANDIDATE_MARGIN: f64 = 1.05;

/// A listing position stored in the R-tree, as `[lng, lat]`
#[derive(Debug, Clone, PartialEq)]
struct IndexedListing {
    id: ListingId,
    position: LatLng,
}

impl RTreeObject for IndexedListing {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.position.lng, self.position.lat])
    }
}

fn envelope(west: f64, south: f64, east: f64, north: f64) -> AABB<[f64; 2]> {
    AABB::from_corners([west, south], [east, north])
}

/// Envelopes covering `bounds` in stored coordinates.
///
/// A box running past ±180° is split in two, one part on each side of the
/// antimeridian. A box reaching a pole covers every longitude.
fn envelopes_of(bounds: &LatLngBounds) -> Vec<AABB<[f64; 2]>> {
    let south = bounds.south().max(-90.0);
    let north = bounds.north().min(90.0);
    let (west, east) = (bounds.west(), bounds.east());

    if bounds.south() <= -90.0 || bounds.north() >= 90.0 || east - west >= 360.0 {
        vec![envelope(-180.0, south, 180.0, north)]
    } else if west < -180.0 {
        vec![
            envelope(west + 360.0, south, 180.0, north),
            envelope(-180.0, south, east, north),
        ]
    } else if east > 180.0 {
        vec![
            envelope(west, south, 180.0, north),
            envelope(-180.0, south, east - 360.0, north),
        ]
    } else {
        vec![envelope(west, south, east, north)]
    }
}

/// R-tree over listing positions for bounding-box and radius queries
#[derive(Debug, Clone, Default)]
pub struct ListingIndex {
    rtree: RTree<IndexedListing>,
}

impl ListingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_listings(listings: &[Listing]) -> Self {
        let items = listings
            .iter()
            .map(|l| IndexedListing {
                id: l.id.clone(),
                position: l.position,
            })
            .collect();
        Self {
            rtree: RTree::bulk_load(items),
        }
    }

    pub fn insert(&mut self, id: ListingId, position: LatLng) {
        self.rtree.insert(IndexedListing { id, position });
    }

    pub fn remove(&mut self, id: &str, position: LatLng) -> bool {
        self.rtree
            .remove(&IndexedListing {
                id: id.to_string(),
                position,
            })
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of listings within `radius_meters` (inclusive) of `center`
    pub fn nearby(&self, center: &LatLng, radius_meters: f64) -> Vec<ListingId> {
        let candidates = square_bounds(center, 2.0 * radius_meters * CANDIDATE_MARGIN);
        envelopes_of(&candidates)
            .iter()
            .flat_map(|envelope| self.rtree.locate_in_envelope(envelope))
            .filter(|item| distance_meters(center, &item.position) <= radius_meters)
            .map(|item| item.id.clone())
            .collect()
    }
}
