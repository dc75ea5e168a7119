use crate::{core::geo::LatLng, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Document identifier of a listing
pub type ListingId = String;

/// Identifier of an authenticated user
pub type UserId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Sale,
    #[default]
    Rent,
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sale => write!(f, "For Sale"),
            Self::Rent => write!(f, "For Rent"),
        }
    }
}

impl FromStr for ListingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(Self::Sale),
            "rent" => Ok(Self::Rent),
            other => Err(Error::Validation(format!("unknown listing type '{other}'"))),
        }
    }
}

/// A property offered for sale or rent, pinned on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: ListingKind,
    #[serde(rename = "link", default, skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
    pub position: LatLng,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// True when `user_id` is the listing's owner
    pub fn is_owned_by(&self, user_id: Option<&str>) -> bool {
        user_id.is_some_and(|uid| uid == self.owner_id)
    }

    /// Overwrites the editable fields
    pub fn apply(&mut self, fields: ListingFields) {
        self.title = fields.title;
        self.description = fields.description;
        self.price = fields.price;
        self.kind = fields.kind;
        self.external_link = fields.external_link;
        self.position = fields.position;
    }
}

/// Validated, editable part of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingFields {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub kind: ListingKind,
    pub external_link: Option<String>,
    pub position: LatLng,
}

/// Payload for creating a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub fields: ListingFields,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl NewListing {
    pub fn into_listing(self, id: ListingId) -> Listing {
        let ListingFields {
            title,
            description,
            price,
            kind,
            external_link,
            position,
        } = self.fields;
        Listing {
            id,
            title,
            description,
            price,
            kind,
            external_link,
            position,
            owner_id: self.owner_id,
            created_at: self.created_at,
        }
    }
}

/// Raw values of the listing form, as typed by the user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: String,
    pub kind: ListingKind,
    pub link: String,
    pub position: LatLng,
}

impl ListingDraft {
    /// Empty form for a pin dropped at `position`
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Form pre-filled from an existing listing
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: listing.price.to_string(),
            kind: listing.kind,
            link: listing.external_link.clone().unwrap_or_default(),
            position: listing.position,
        }
    }

    pub fn validate(&self) -> Result<ListingFields> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::Validation("Description is required".to_string()));
        }
        let price: f64 = self
            .price
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("'{}' is not a valid price", self.price)))?;
        if !price.is_finite() || price < 0.0 {
            return Err(Error::Validation(format!("'{}' is not a valid price", self.price)));
        }
        let link = self.link.trim();

        Ok(ListingFields {
            title: title.to_string(),
            description: description.to_string(),
            price,
            kind: self.kind,
            external_link: (!link.is_empty()).then(|| link.to_string()),
            position: self.position.validate()?,
        })
    }
}
