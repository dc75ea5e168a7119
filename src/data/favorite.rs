use crate::{
    data::listing::{ListingId, UserId},
    prelude::HashSet,
};
use serde::{Deserialize, Serialize};

/// A user's mark on a listing. Identity is the pair, keyed as `userId_listingId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteMark {
    pub user_id: UserId,
    #[serde(rename = "propertyId")]
    pub listing_id: ListingId,
}

impl FavoriteMark {
    pub fn new(user_id: impl Into<UserId>, listing_id: impl Into<ListingId>) -> Self {
        Self {
            user_id: user_id.into(),
            listing_id: listing_id.into(),
        }
    }

    /// Document key of the mark
    pub fn key(&self) -> String {
        format!("{}_{}", self.user_id, self.listing_id)
    }
}

/// Listing ids the current user has favorited.
///
/// The only place favorite state lives; flags on markers are computed from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoriteSet {
    ids: HashSet<ListingId>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_marks<'a>(marks: impl IntoIterator<Item = &'a FavoriteMark>) -> Self {
        Self {
            ids: marks.into_iter().map(|m| m.listing_id.clone()).collect(),
        }
    }

    pub fn contains(&self, listing_id: &str) -> bool {
        self.ids.contains(listing_id)
    }

    pub fn insert(&mut self, listing_id: ListingId) -> bool {
        self.ids.insert(listing_id)
    }

    pub fn remove(&mut self, listing_id: &str) -> bool {
        self.ids.remove(listing_id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListingId> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key() {
        let mark = FavoriteMark::new("user-1", "listing-9");
        assert_eq!(mark.key(), "user-1_listing-9");
    }

    #[test]
    fn test_set_from_marks() {
        let marks = vec![
            FavoriteMark::new("u", "a"),
            FavoriteMark::new("u", "b"),
            FavoriteMark::new("u", "a"),
        ];
        let mut set = FavoriteSet::from_marks(&marks);
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
        assert!(set.remove("a"));
        assert!(!set.contains("a"));
        set.clear();
        assert!(set.is_empty());
    }
}
