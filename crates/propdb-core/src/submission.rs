//! Create/update payload validation for listings.
//!
//! Unlike search filters, enum literals here are strict: a submission with
//! an unknown `property_type` or `status` is rejected.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::property::{Property, PropertyStatus, PropertyType};
use crate::ValidationErrors;

pub const MIN_YEAR_BUILT: i32 = 1800;
pub const MAX_TITLE_LEN: usize = 200;

/// Listing create payload as submitted by a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySubmission {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub area_sqft: i64,
    pub image_url: Option<String>,
    pub property_type: String,
    pub status: String,
    pub year_built: Option<i32>,
    pub lot_size_sqft: Option<i64>,
    pub parking_spaces: Option<i64>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// A submission that passed validation, with typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
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
    pub amenities: Vec<String>,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value" (PATCH semantics).
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub city: Option<Option<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub state: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_sqft: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub year_built: Option<Option<i32>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub lot_size_sqft: Option<Option<i64>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub parking_spaces: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
}

/// A present-but-null JSON field becomes `Some(None)`; an absent field stays
/// `None` through `#[serde(default)]`.
#[allow(clippy::option_option)]
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A validated sparse update. `None` leaves the stored value untouched.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
    pub city: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area_sqft: Option<u32>,
    pub image_url: Option<Option<String>>,
    pub property_type: Option<PropertyType>,
    pub status: Option<PropertyStatus>,
    pub year_built: Option<Option<i32>>,
    pub lot_size_sqft: Option<Option<u32>>,
    pub parking_spaces: Option<Option<u32>>,
    pub amenities: Option<Vec<String>>,
}

impl PropertySubmission {
    /// Validate against the current calendar year.
    ///
    /// # Errors
    ///
    /// Returns all field-level failures.
    pub fn validate(&self) -> Result<NewProperty, ValidationErrors> {
        self.validate_for_year(Utc::now().year())
    }

    /// Validate with an explicit upper bound for `year_built`.
    ///
    /// # Errors
    ///
    /// Returns all field-level failures.
    pub fn validate_for_year(&self, current_year: i32) -> Result<NewProperty, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = check_title(&self.title, &mut errors);
        let description = check_required("description", &self.description, &mut errors);
        let location = check_required("location", &self.location, &mut errors);
        check_price(self.price, &mut errors);
        let bedrooms = check_count("bedrooms", self.bedrooms, &mut errors);
        let bathrooms = check_count("bathrooms", self.bathrooms, &mut errors);
        let area_sqft = check_count("area_sqft", self.area_sqft, &mut errors);
        let lot_size_sqft = self
            .lot_size_sqft
            .map(|v| check_count("lot_size_sqft", v, &mut errors));
        let parking_spaces = self
            .parking_spaces
            .map(|v| check_count("parking_spaces", v, &mut errors));
        if let Some(year) = self.year_built {
            check_year(year, current_year, &mut errors);
        }
        let property_type = check_property_type(&self.property_type, &mut errors);
        let status = check_status(&self.status, &mut errors);

        errors.into_result(NewProperty {
            title,
            description,
            price: self.price,
            location,
            city: trimmed_opt(self.city.as_deref()),
            state: trimmed_opt(self.state.as_deref()),
            bedrooms,
            bathrooms,
            area_sqft,
            image_url: trimmed_opt(self.image_url.as_deref()),
            // Fallbacks never escape: an unparsed literal always recorded an error.
            property_type: property_type.unwrap_or(PropertyType::House),
            status: status.unwrap_or(PropertyStatus::ForSale),
            year_built: self.year_built,
            lot_size_sqft,
            parking_spaces,
            amenities: clean_amenities(&self.amenities),
        })
    }
}

impl PropertyUpdate {
    /// Validate only the fields present in the update.
    ///
    /// # Errors
    ///
    /// Returns all field-level failures.
    pub fn validate(&self) -> Result<PropertyChanges, ValidationErrors> {
        self.validate_for_year(Utc::now().year())
    }

    /// # Errors
    ///
    /// Returns all field-level failures.
    pub fn validate_for_year(
        &self,
        current_year: i32,
    ) -> Result<PropertyChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.as_deref().map(|t| check_title(t, &mut errors));
        let description = self
            .description
            .as_deref()
            .map(|d| check_required("description", d, &mut errors));
        let location = self
            .location
            .as_deref()
            .map(|l| check_required("location", l, &mut errors));
        if let Some(price) = self.price {
            check_price(price, &mut errors);
        }
        let bedrooms = self
            .bedrooms
            .map(|v| check_count("bedrooms", v, &mut errors));
        let bathrooms = self
            .bathrooms
            .map(|v| check_count("bathrooms", v, &mut errors));
        let area_sqft = self
            .area_sqft
            .map(|v| check_count("area_sqft", v, &mut errors));
        let lot_size_sqft = self
            .lot_size_sqft
            .map(|opt| opt.map(|v| check_count("lot_size_sqft", v, &mut errors)));
        let parking_spaces = self
            .parking_spaces
            .map(|opt| opt.map(|v| check_count("parking_spaces", v, &mut errors)));
        if let Some(Some(year)) = self.year_built {
            check_year(year, current_year, &mut errors);
        }
        let property_type = self
            .property_type
            .as_deref()
            .and_then(|t| check_property_type(t, &mut errors));
        let status = self
            .status
            .as_deref()
            .and_then(|s| check_status(s, &mut errors));

        errors.into_result(PropertyChanges {
            title,
            description,
            price: self.price,
            location,
            city: self.city.as_ref().map(|c| trimmed_opt(c.as_deref())),
            state: self.state.as_ref().map(|s| trimmed_opt(s.as_deref())),
            bedrooms,
            bathrooms,
            area_sqft,
            image_url: self.image_url.as_ref().map(|u| trimmed_opt(u.as_deref())),
            property_type,
            status,
            year_built: self.year_built,
            lot_size_sqft,
            parking_spaces,
            amenities: self.amenities.as_deref().map(clean_amenities),
        })
    }
}

impl PropertyChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields of `property` named by this update.
    pub fn apply_to(&self, property: &mut Property) {
        fn set<T: Clone>(slot: &mut T, value: Option<&T>) {
            if let Some(v) = value {
                slot.clone_from(v);
            }
        }

        set(&mut property.title, self.title.as_ref());
        set(&mut property.description, self.description.as_ref());
        set(&mut property.price, self.price.as_ref());
        set(&mut property.location, self.location.as_ref());
        set(&mut property.city, self.city.as_ref());
        set(&mut property.state, self.state.as_ref());
        set(&mut property.bedrooms, self.bedrooms.as_ref());
        set(&mut property.bathrooms, self.bathrooms.as_ref());
        set(&mut property.area_sqft, self.area_sqft.as_ref());
        set(&mut property.image_url, self.image_url.as_ref());
        set(&mut property.property_type, self.property_type.as_ref());
        set(&mut property.status, self.status.as_ref());
        set(&mut property.year_built, self.year_built.as_ref());
        set(&mut property.lot_size_sqft, self.lot_size_sqft.as_ref());
        set(&mut property.parking_spaces, self.parking_spaces.as_ref());
        set(&mut property.amenities, self.amenities.as_ref());
    }
}

fn check_title(value: &str, errors: &mut ValidationErrors) -> String {
    let title = check_required("title", value, errors);
    if title.chars().count() > MAX_TITLE_LEN {
        errors.push("title", format!("must be at most {MAX_TITLE_LEN} characters"));
    }
    title
}

fn check_required(field: &str, value: &str, errors: &mut ValidationErrors) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "is required");
    }
    trimmed.to_owned()
}

fn check_price(price: Decimal, errors: &mut ValidationErrors) {
    if price.is_sign_negative() && !price.is_zero() {
        errors.push("price", "must not be negative");
    }
}

fn check_count(field: &str, value: i64, errors: &mut ValidationErrors) -> u32 {
    if value < 0 {
        errors.push(field, "must not be negative");
        return 0;
    }
    u32::try_from(value).unwrap_or_else(|_| {
        errors.push(field, "is too large");
        0
    })
}

fn check_year(year: i32, current_year: i32, errors: &mut ValidationErrors) {
    if !(MIN_YEAR_BUILT..=current_year).contains(&year) {
        errors.push(
            "year_built",
            format!("must be between {MIN_YEAR_BUILT} and {current_year}"),
        );
    }
}

fn check_property_type(value: &str, errors: &mut ValidationErrors) -> Option<PropertyType> {
    let parsed = PropertyType::from_literal(value);
    if parsed.is_none() {
        errors.push(
            "property_type",
            format!("must be one of House, Apartment, Condo, Townhouse, Land; got '{value}'"),
        );
    }
    parsed
}

fn check_status(value: &str, errors: &mut ValidationErrors) -> Option<PropertyStatus> {
    let parsed = PropertyStatus::from_literal(value);
    if parsed.is_none() {
        errors.push(
            "status",
            format!("must be one of for-sale, for-rent, sold, pending; got '{value}'"),
        );
    }
    parsed
}

fn trimmed_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn clean_amenities(amenities: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(amenities.len());
    for a in amenities {
        let a = a.trim();
        if !a.is_empty() && !out.iter().any(|seen| seen.eq_ignore_ascii_case(a)) {
            out.push(a.to_owned());
        }
    }
    out
}
