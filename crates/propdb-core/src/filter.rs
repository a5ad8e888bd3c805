//! Filter normalization: raw form strings to typed search criteria, and
//! typed criteria back to string-encoded wire parameters.
//!
//! The same [`RawFilter`] shape is the query string of the list endpoint, so
//! the server and the client run identical validation.

use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::postprocess::SortOption;
use crate::property::{Property, PropertyStatus, PropertyType};
use crate::ValidationErrors;

/// Filter state exactly as it comes out of form controls or a query string.
///
/// Every field is free text; blank means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFilter {
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_bedrooms: Option<String>,
    pub min_bathrooms: Option<String>,
    pub property_type: Option<String>,
    pub location: Option<String>,
    /// Comma-separated status literals.
    pub status: Option<String>,
}

/// Validated, typed search constraints. `None`/empty means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_bedrooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
    pub property_type: Option<PropertyType>,
    pub location: Option<String>,
    pub statuses: BTreeSet<PropertyStatus>,
}

/// List-endpoint query string: a [`RawFilter`] plus sort and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawListQuery {
    #[serde(flatten)]
    pub filter: RawFilter,
    pub sort: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

/// A fully normalized list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub criteria: FilterCriteria,
    pub sort: SortOption,
    pub cursor: Option<u64>,
    pub limit: Option<u32>,
}

impl RawFilter {
    /// Validate and type every field.
    ///
    /// Numeric fields reject non-numeric and negative input. Unknown enum
    /// literals are dropped rather than rejected, so stale UI state degrades
    /// to "no constraint".
    ///
    /// # Errors
    ///
    /// Returns every field-level failure found, not just the first.
    pub fn normalize(&self) -> Result<FilterCriteria, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let min_price = parse_price("min_price", self.min_price.as_deref(), &mut errors);
        let max_price = parse_price("max_price", self.max_price.as_deref(), &mut errors);
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                errors.push("max_price", "must not be less than min_price");
            }
        }

        let min_bedrooms = parse_count("min_bedrooms", self.min_bedrooms.as_deref(), &mut errors);
        let min_bathrooms =
            parse_count("min_bathrooms", self.min_bathrooms.as_deref(), &mut errors);

        let property_type = non_blank(self.property_type.as_deref()).and_then(|raw| {
            let parsed = PropertyType::from_literal(raw);
            if parsed.is_none() {
                tracing::debug!(value = raw, "dropping unknown property_type filter");
            }
            parsed
        });

        let statuses = non_blank(self.status.as_deref())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .filter_map(|s| {
                        let parsed = PropertyStatus::from_literal(s);
                        if parsed.is_none() {
                            tracing::debug!(value = s, "dropping unknown status filter");
                        }
                        parsed
                    })
                    .collect()
            })
            .unwrap_or_default();

        let location = non_blank(self.location.as_deref()).map(ToOwned::to_owned);

        errors.into_result(FilterCriteria {
            min_price,
            max_price,
            min_bedrooms,
            min_bathrooms,
            property_type,
            location,
            statuses,
        })
    }
}

impl RawListQuery {
    /// Normalize the filter and parse sort/cursor/limit.
    ///
    /// An unknown sort key falls back to the default order, matching the
    /// tolerance applied to enum filter fields.
    ///
    /// # Errors
    ///
    /// Returns field-level failures from the filter and from `cursor`/`limit`.
    pub fn normalize(&self) -> Result<ListQuery, ValidationErrors> {
        let (criteria, mut errors) = match self.filter.normalize() {
            Ok(c) => (c, ValidationErrors::new()),
            Err(e) => (FilterCriteria::default(), e),
        };

        let sort = non_blank(self.sort.as_deref())
            .and_then(|raw| {
                let parsed = SortOption::from_literal(raw);
                if parsed.is_none() {
                    tracing::debug!(value = raw, "unknown sort key, using default order");
                }
                parsed
            })
            .unwrap_or_default();

        let cursor = parse_count("cursor", self.cursor.as_deref(), &mut errors).map(u64::from);
        let limit = parse_count("limit", self.limit.as_deref(), &mut errors);

        errors.into_result(ListQuery {
            criteria,
            sort,
            cursor,
            limit,
        })
    }
}

impl FilterCriteria {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Client-side re-check of a listing against these constraints.
    ///
    /// Location matching is a case-insensitive substring test over the
    /// address, city and state.
    #[must_use]
    pub fn matches(&self, property: &Property) -> bool {
        if self.min_price.is_some_and(|min| property.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| property.price > max) {
            return false;
        }
        if self.min_bedrooms.is_some_and(|n| property.bedrooms < n) {
            return false;
        }
        if self.min_bathrooms.is_some_and(|n| property.bathrooms < n) {
            return false;
        }
        if self
            .property_type
            .is_some_and(|t| property.property_type != t)
        {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&property.status) {
            return false;
        }
        if let Some(needle) = &self.location {
            let needle = needle.to_lowercase();
            let haystacks = [
                Some(property.location.as_str()),
                property.city.as_deref(),
                property.state.as_deref(),
            ];
            if !haystacks
                .into_iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }

    /// String-encoded wire parameters, omitting absent constraints.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = self.min_price {
            pairs.push(("min_price", v.normalize().to_string()));
        }
        if let Some(v) = self.max_price {
            pairs.push(("max_price", v.normalize().to_string()));
        }
        if let Some(v) = self.min_bedrooms {
            pairs.push(("min_bedrooms", v.to_string()));
        }
        if let Some(v) = self.min_bathrooms {
            pairs.push(("min_bathrooms", v.to_string()));
        }
        if let Some(t) = self.property_type {
            pairs.push(("property_type", t.as_str().to_owned()));
        }
        if let Some(loc) = &self.location {
            pairs.push(("location", loc.clone()));
        }
        if !self.statuses.is_empty() {
            let joined = self
                .statuses
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("status", joined));
        }
        pairs
    }
}

impl ListQuery {
    #[must_use]
    pub fn new(criteria: FilterCriteria, sort: SortOption) -> Self {
        Self {
            criteria,
            sort,
            cursor: None,
            limit: None,
        }
    }

    /// Filter pairs plus `sort`, `cursor` and `limit`.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self.criteria.to_query_pairs();
        pairs.push(("sort", self.sort.as_str().to_owned()));
        if let Some(cursor) = self.cursor {
            pairs.push(("cursor", cursor.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_price(field: &str, raw: Option<&str>, errors: &mut ValidationErrors) -> Option<Decimal> {
    let raw = non_blank(raw)?;
    let cleaned: String = raw
        .strip_prefix('$')
        .unwrap_or(raw)
        .chars()
        .filter(|c| *c != ',')
        .collect();

    match Decimal::from_str(cleaned.trim()) {
        Ok(v) if v.is_sign_negative() && !v.is_zero() => {
            errors.push(field, "must not be negative");
            None
        }
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(field, format!("must be a number, got '{raw}'"));
            None
        }
    }
}

/// Parses a non-negative whole number; a trailing `+` ("3+") is accepted.
fn parse_count(field: &str, raw: Option<&str>, errors: &mut ValidationErrors) -> Option<u32> {
    let raw = non_blank(raw)?;
    let digits = raw.strip_suffix('+').unwrap_or(raw).trim();

    match digits.parse::<i64>() {
        Ok(v) if v < 0 => {
            errors.push(field, "must not be negative");
            None
        }
        Ok(v) => {
            if let Ok(v) = u32::try_from(v) {
                Some(v)
            } else {
                errors.push(field, "is too large");
                None
            }
        }
        Err(_) => {
            errors.push(field, format!("must be a whole number, got '{raw}'"));
            None
        }
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
