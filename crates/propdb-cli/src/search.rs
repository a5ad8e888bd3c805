//! `search` and `show` command handlers.
//!
//! `search` drives the same pipeline a UI would: the flags become one filter
//! edit on a [`SearchController`], and the settled view is paginated locally.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use propdb_client::{
    ClientError, FavoritesStore, PropertyApi, QueryResult, SearchController, SearchSettings,
    SearchView,
};
use propdb_core::{
    format_price, paginate, ClientConfig, EmptyReason, Property, RawFilter, SortOption,
};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Minimum price, e.g. 250000 or $250,000
    #[arg(long)]
    pub min_price: Option<String>,
    /// Maximum price
    #[arg(long)]
    pub max_price: Option<String>,
    #[arg(long)]
    pub min_bedrooms: Option<String>,
    #[arg(long)]
    pub min_bathrooms: Option<String>,
    /// House, Apartment, Condo, Townhouse or Land
    #[arg(long = "type")]
    pub property_type: Option<String>,
    /// Substring of the address, city or state
    #[arg(long)]
    pub location: Option<String>,
    /// Comma-separated statuses, e.g. for-sale,pending
    #[arg(long)]
    pub status: Option<String>,
    /// newest, oldest, price-asc or price-desc
    #[arg(long, default_value = "newest")]
    pub sort: String,
    /// Only show favorited listings
    #[arg(long)]
    pub favorites_only: bool,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    #[arg(long, default_value_t = 12)]
    pub page_size: usize,
}

impl SearchArgs {
    pub(crate) fn raw_filter(&self) -> RawFilter {
        RawFilter {
            min_price: self.min_price.clone(),
            max_price: self.max_price.clone(),
            min_bedrooms: self.min_bedrooms.clone(),
            min_bathrooms: self.min_bathrooms.clone(),
            property_type: self.property_type.clone(),
            location: self.location.clone(),
            status: self.status.clone(),
        }
    }

    pub(crate) fn sort_option(&self) -> SortOption {
        SortOption::from_literal(&self.sort).unwrap_or_else(|| {
            tracing::warn!(sort = %self.sort, "unknown sort key, using newest");
            SortOption::default()
        })
    }
}

/// Run one search and print the requested page.
///
/// # Errors
///
/// Returns an error if the filter is invalid or the fetch fails.
pub(crate) async fn run_search(
    api: Arc<dyn PropertyApi>,
    favorites: Arc<dyn FavoritesStore>,
    config: &ClientConfig,
    args: &SearchArgs,
) -> anyhow::Result<()> {
    // A single edit has no burst to coalesce.
    let settings = SearchSettings {
        debounce: Duration::ZERO,
        ..SearchSettings::from_config(config)
    };
    let controller = SearchController::spawn(api, Some(favorites), settings);
    controller.set_sort(args.sort_option());
    controller.set_favorites_only(args.favorites_only);
    controller.edit_filter(args.raw_filter());

    let mut views = controller.views();
    let mut view: SearchView = views
        .wait_for(|v| v.filter_errors.is_some() || v.results.is_settled())
        .await?
        .clone();

    // Pull server pages until the requested local page is covered.
    let wanted = args.page.max(1).saturating_mul(args.page_size.max(1));
    while let Some(cursor) = view.next_cursor {
        let loaded = view.results.value().map_or(0, |p| p.items.len());
        if loaded >= wanted {
            break;
        }
        tracing::debug!(cursor, "loading next page of listings");
        controller.load_more();
        view = views
            .wait_for(|v| {
                v.results.is_settled()
                    && (v.results.value().is_none() || v.next_cursor != Some(cursor))
            })
            .await?
            .clone();
    }

    if let Some(errors) = view.filter_errors {
        for field in &errors.fields {
            eprintln!("  --{}: {}", field.field.replace('_', "-"), field.message);
        }
        anyhow::bail!("invalid search filter");
    }

    match view.results {
        QueryResult::Success(processed) => {
            if let Some(reason) = processed.empty_reason {
                println!("{}", empty_message(reason));
                return Ok(());
            }
            let page = paginate(&processed.items, args.page, args.page_size);
            print_table(page.items);
            if view.next_cursor.is_some() {
                println!(
                    "page {} ({} listings loaded, more on the server)",
                    page.page, page.total_items
                );
            } else {
                println!(
                    "page {} of {} ({} listings)",
                    page.page, page.total_pages, page.total_items
                );
            }
        }
        QueryResult::NotFound => println!("{}", empty_message(EmptyReason::NoProperties)),
        QueryResult::Error { message, .. } => anyhow::bail!("search failed: {message}"),
        QueryResult::Idle | QueryResult::Loading => {
            anyhow::bail!("search ended before a result arrived");
        }
    }

    Ok(())
}

fn empty_message(reason: EmptyReason) -> &'static str {
    match reason {
        EmptyReason::NoProperties => "no listings match these filters",
        EmptyReason::NoFavorites => "you have no favorites yet",
        EmptyReason::NoFavoriteMatches => "none of your favorites match these filters",
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", value.chars().take(max).collect::<String>())
    } else {
        value.to_owned()
    }
}

fn print_table(items: &[Property]) {
    let header = format!(
        "{:<38}{:<11}{:<10}{:<14}{:<9}LOCATION",
        "ID", "TYPE", "STATUS", "PRICE", "BD/BA"
    );
    println!("{header}");
    for p in items {
        let location = match &p.city {
            Some(city) => format!("{}, {city}", p.location),
            None => p.location.clone(),
        };
        let beds_baths = format!("{}/{}", p.bedrooms, p.bathrooms);
        println!(
            "{:<38}{:<11}{:<10}{:<14}{:<9}{}",
            p.id,
            p.property_type.as_str(),
            p.status.as_str(),
            format_price(p.price, p.status),
            beds_baths,
            truncate(&location, 40)
        );
    }
}

/// Print one listing.
///
/// # Errors
///
/// Returns an error if the listing does not exist or the request fails.
pub(crate) async fn run_show(api: &dyn PropertyApi, id: &str) -> anyhow::Result<()> {
    let property = match api.get_property(id).await {
        Ok(property) => property,
        Err(ClientError::NotFound(_)) => anyhow::bail!("listing '{id}' not found"),
        Err(e) => return Err(e.into()),
    };

    println!("{}", property.title);
    println!(
        "{} | {} | {}",
        property.property_type,
        property.status,
        format_price(property.price, property.status)
    );
    let place: Vec<&str> = [
        Some(property.location.as_str()),
        property.city.as_deref(),
        property.state.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    println!("{}", place.join(", "));
    println!(
        "{} bd / {} ba / {} sqft",
        property.bedrooms, property.bathrooms, property.area_sqft
    );
    if let Some(year) = property.year_built {
        println!("Built {year}");
    }
    if let Some(lot) = property.lot_size_sqft {
        println!("Lot {lot} sqft");
    }
    if let Some(parking) = property.parking_spaces {
        println!("Parking {parking}");
    }
    if !property.amenities.is_empty() {
        println!("Amenities: {}", property.amenities.join(", "));
    }
    println!();
    println!("{}", property.description);

    Ok(())
}
