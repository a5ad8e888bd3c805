//! Client-side ordering, favorites filtering and paging of fetched listings.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::property::{Property, PropertyStatus};
use crate::CoreError;

/// Result ordering. Ties always keep the input order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
    Oldest,
}

impl SortOption {
    pub const ALL: [SortOption; 4] = [
        SortOption::PriceAsc,
        SortOption::PriceDesc,
        SortOption::Newest,
        SortOption::Oldest,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::PriceAsc => "price-asc",
            SortOption::PriceDesc => "price-desc",
            SortOption::Newest => "newest",
            SortOption::Oldest => "oldest",
        }
    }

    #[must_use]
    pub fn from_literal(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_literal(s).ok_or_else(|| CoreError::InvalidSort(s.to_owned()))
    }
}

/// Why a processed view came out empty.
///
/// The favorites cases are distinct from `NoProperties` so a caller can say
/// "you have no favorites yet" instead of "nothing matched".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The fetched page itself was empty.
    NoProperties,
    /// Favorites filtering is on and the favorites set is empty.
    NoFavorites,
    /// Favorites exist but none of them are on this page.
    NoFavoriteMatches,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostProcessed {
    pub items: Vec<Property>,
    pub empty_reason: Option<EmptyReason>,
}

/// Reorder and optionally favorites-filter a fetched page.
///
/// With `favorites == None` the output is a permutation of `items`. With
/// `Some(set)` only listings whose id is in `set` survive; an empty set
/// yields an empty result.
#[must_use]
pub fn process(
    items: &[Property],
    sort: SortOption,
    favorites: Option<&HashSet<String>>,
) -> PostProcessed {
    let mut out: Vec<Property> = match favorites {
        Some(set) => items
            .iter()
            .filter(|p| set.contains(&p.id))
            .cloned()
            .collect(),
        None => items.to_vec(),
    };
    sort_properties(&mut out, sort);

    let empty_reason = if !out.is_empty() {
        None
    } else if items.is_empty() {
        Some(EmptyReason::NoProperties)
    } else {
        match favorites {
            Some(set) if set.is_empty() => Some(EmptyReason::NoFavorites),
            Some(_) => Some(EmptyReason::NoFavoriteMatches),
            None => Some(EmptyReason::NoProperties),
        }
    };

    PostProcessed {
        items: out,
        empty_reason,
    }
}

/// Stable in-place sort. Listings without `created_at` go last for both
/// date orders.
pub fn sort_properties(items: &mut [Property], sort: SortOption) {
    match sort {
        SortOption::PriceAsc => items.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOption::PriceDesc => items.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOption::Newest => items.sort_by(|a, b| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortOption::Oldest => items.sort_by(|a, b| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
}

/// A client-side page of an already-processed result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<'a, T> {
    pub items: &'a [T],
    /// 1-based page actually returned (clamped into range).
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice `items` into 1-based pages of `page_size`.
///
/// `page` is clamped to `1..=total_pages`; a zero `page_size` is treated as 1.
#[must_use]
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Paginated<'_, T> {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Paginated {
        items: &items[start.min(items.len())..end],
        page,
        total_pages,
        total_items: items.len(),
    }
}

/// Display price: whole dollars with thousands separators, `/mo` for rentals.
#[must_use]
pub fn format_price(price: Decimal, status: PropertyStatus) -> String {
    let rounded = price.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.trunc().abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let suffix = if status == PropertyStatus::ForRent {
        "/mo"
    } else {
        ""
    };
    format!("${grouped}{suffix}")
}

#[cfg(test)]
#[path = "postprocess_test.rs"]
mod tests;
