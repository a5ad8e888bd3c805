//! Live integration tests for propdb-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh Postgres database from the sqlx test harness. The
//! hosted schema is not managed here, so `fixtures/schema.sql` recreates it
//! before `fixtures/properties.sql` seeds four listings.
//!
//! Run with `DATABASE_URL` set and `cargo test -p propdb-db -- --ignored`.

use std::collections::BTreeSet;

use propdb_core::{
    FilterCriteria, PropertyChanges, PropertyStatus, PropertySubmission, PropertyType, SortOption,
};
use propdb_db::{
    add_favorite, create_property, delete_property, get_property, list_favorite_ids,
    list_properties, remove_favorite, update_property, DbError,
};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Section 1: Listing queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn list_without_filters_returns_everything_newest_first(pool: sqlx::PgPool) {
    let page = list_properties(&pool, &FilterCriteria::default(), SortOption::Newest, 0, 20)
        .await
        .expect("list_properties failed");

    let ids: Vec<&str> = page.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p-condo-1", "p-condo-2", "p-house-1", "p-apt-1"]);
    assert!(page.next_cursor.is_none());
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn list_applies_type_and_price_filters(pool: sqlx::PgPool) {
    let criteria = FilterCriteria {
        property_type: Some(PropertyType::Condo),
        max_price: Some(Decimal::from(200_000)),
        ..FilterCriteria::default()
    };
    let page = list_properties(&pool, &criteria, SortOption::PriceAsc, 0, 20)
        .await
        .expect("list_properties failed");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "p-condo-1");
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn list_matches_location_against_city_case_insensitively(pool: sqlx::PgPool) {
    let criteria = FilterCriteria {
        location: Some("shelby".to_string()),
        ..FilterCriteria::default()
    };
    let page = list_properties(&pool, &criteria, SortOption::Newest, 0, 20)
        .await
        .expect("list_properties failed");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "p-condo-2");
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn list_filters_by_status_set(pool: sqlx::PgPool) {
    let criteria = FilterCriteria {
        statuses: BTreeSet::from([PropertyStatus::ForRent, PropertyStatus::Pending]),
        ..FilterCriteria::default()
    };
    let page = list_properties(&pool, &criteria, SortOption::PriceDesc, 0, 20)
        .await
        .expect("list_properties failed");

    let ids: Vec<&str> = page.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p-condo-2", "p-apt-1"]);
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn list_pages_with_offset_cursor(pool: sqlx::PgPool) {
    let first = list_properties(&pool, &FilterCriteria::default(), SortOption::PriceAsc, 0, 3)
        .await
        .expect("first page");
    assert_eq!(first.items.len(), 3);
    assert_eq!(first.next_cursor, Some(3));

    let second = list_properties(&pool, &FilterCriteria::default(), SortOption::PriceAsc, 3, 3)
        .await
        .expect("second page");
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, "p-condo-2");
    assert!(second.next_cursor.is_none());
}

// ---------------------------------------------------------------------------
// Section 2: Single-row reads and writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn get_missing_property_is_not_found(pool: sqlx::PgPool) {
    let err = get_property(&pool, "nope").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = false, fixtures("schema"))]
#[ignore = "requires DATABASE_URL"]
async fn create_then_get_round_trips(pool: sqlx::PgPool) {
    let submission = PropertySubmission {
        title: "Corner townhouse".to_string(),
        description: "End unit, extra windows".to_string(),
        price: Decimal::new(61_250_000, 2),
        location: "1 Elm Ct".to_string(),
        city: Some("Ogdenville".to_string()),
        state: None,
        bedrooms: 3,
        bathrooms: 2,
        area_sqft: 1650,
        image_url: None,
        property_type: "townhouse".to_string(),
        status: "for-sale".to_string(),
        year_built: Some(2019),
        lot_size_sqft: None,
        parking_spaces: Some(2),
        amenities: vec!["Patio".to_string()],
    };
    let new = submission.validate().expect("valid submission");

    let created = create_property(&pool, &new)
        .await
        .expect("create_property failed");
    assert!(created.created_at.is_some());

    let fetched = get_property(&pool, &created.id)
        .await
        .expect("get_property failed");
    assert_eq!(fetched, created);
    assert_eq!(fetched.property_type, PropertyType::Townhouse);
    assert_eq!(fetched.price, Decimal::new(61_250_000, 2));
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn update_changes_only_named_fields(pool: sqlx::PgPool) {
    let changes = PropertyChanges {
        status: Some(PropertyStatus::Sold),
        city: Some(None),
        ..PropertyChanges::default()
    };
    let updated = update_property(&pool, "p-house-1", &changes)
        .await
        .expect("update_property failed");

    assert_eq!(updated.status, PropertyStatus::Sold);
    assert!(updated.city.is_none());
    assert_eq!(updated.bedrooms, 4);
    assert!(updated.updated_at > updated.created_at);
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn update_missing_property_is_not_found(pool: sqlx::PgPool) {
    let changes = PropertyChanges {
        bedrooms: Some(1),
        ..PropertyChanges::default()
    };
    let err = update_property(&pool, "nope", &changes).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn delete_cascades_to_favorites(pool: sqlx::PgPool) {
    add_favorite(&pool, "u-1", "p-condo-1")
        .await
        .expect("add_favorite failed");

    delete_property(&pool, "p-condo-1")
        .await
        .expect("delete_property failed");

    let ids = list_favorite_ids(&pool, "u-1").await.expect("list failed");
    assert!(ids.is_empty());
    assert!(matches!(
        delete_property(&pool, "p-condo-1").await,
        Err(DbError::NotFound)
    ));
}

// ---------------------------------------------------------------------------
// Section 3: Favorites
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn favorites_are_per_user_and_idempotent(pool: sqlx::PgPool) {
    add_favorite(&pool, "u-1", "p-house-1").await.expect("add");
    add_favorite(&pool, "u-1", "p-house-1").await.expect("re-add");
    add_favorite(&pool, "u-2", "p-apt-1").await.expect("add other user");

    let ids = list_favorite_ids(&pool, "u-1").await.expect("list");
    assert_eq!(ids, ["p-house-1"]);

    assert!(remove_favorite(&pool, "u-1", "p-house-1").await.expect("remove"));
    assert!(!remove_favorite(&pool, "u-1", "p-house-1").await.expect("remove again"));
    assert!(list_favorite_ids(&pool, "u-1").await.expect("list").is_empty());
}

#[sqlx::test(migrations = false, fixtures("schema", "properties"))]
#[ignore = "requires DATABASE_URL"]
async fn favoriting_unknown_property_is_not_found(pool: sqlx::PgPool) {
    let err = add_favorite(&pool, "u-1", "nope").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}
