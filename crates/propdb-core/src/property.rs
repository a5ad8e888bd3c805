//! Listing domain types shared by the server, the database layer and the client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Kind of real estate a listing describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    House,
    Apartment,
    Condo,
    Townhouse,
    Land,
}

impl PropertyType {
    pub const ALL: [PropertyType; 5] = [
        PropertyType::House,
        PropertyType::Apartment,
        PropertyType::Condo,
        PropertyType::Townhouse,
        PropertyType::Land,
    ];

    /// Wire literal, e.g. `"House"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::House => "House",
            PropertyType::Apartment => "Apartment",
            PropertyType::Condo => "Condo",
            PropertyType::Townhouse => "Townhouse",
            PropertyType::Land => "Land",
        }
    }

    /// Case-insensitive match against the closed literal set.
    #[must_use]
    pub fn from_literal(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_literal(s).ok_or_else(|| CoreError::InvalidPropertyType(s.to_owned()))
    }
}

/// Market status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyStatus {
    ForSale,
    ForRent,
    Sold,
    Pending,
}

impl PropertyStatus {
    pub const ALL: [PropertyStatus; 4] = [
        PropertyStatus::ForSale,
        PropertyStatus::ForRent,
        PropertyStatus::Sold,
        PropertyStatus::Pending,
    ];

    /// Wire literal, e.g. `"for-sale"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyStatus::ForSale => "for-sale",
            PropertyStatus::ForRent => "for-rent",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Pending => "pending",
        }
    }

    /// Case-insensitive match against the closed literal set.
    #[must_use]
    pub fn from_literal(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_literal(s).ok_or_else(|| CoreError::InvalidStatus(s.to_owned()))
    }
}

/// A single listing as served by the backend.
///
/// Only the backend mutates listings; this type is a read model plus the
/// shape returned from create/update calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sqft: u32,
    pub image_url: Option<String>,
    pub property_type: PropertyType,
    pub status: PropertyStatus,
    pub year_built: Option<i32>,
    pub lot_size_sqft: Option<u32>,
    pub parking_spaces: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page of a listing search.
///
/// `next_cursor` is the offset of the following page, absent on the last page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyPage {
    pub items: Vec<Property>,
    pub next_cursor: Option<u64>,
}
