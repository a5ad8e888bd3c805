//! Database operations for the `properties` table.
//!
//! The table is owned by the hosted backend; this module only reads and
//! writes rows. Enum columns hold the wire literals (`House`, `for-sale`).

use chrono::{DateTime, Utc};
use propdb_core::{
    FilterCriteria, NewProperty, Property, PropertyChanges, PropertyPage, PropertyStatus,
    PropertyType, SortOption,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const PROPERTY_COLUMNS: &str = "id, title, description, price, location, city, state, \
     bedrooms, bathrooms, area_sqft, image_url, property_type, status, year_built, \
     lot_size_sqft, parking_spaces, amenities, created_at, updated_at";

/// A row from the `properties` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PropertyRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_sqft: i32,
    pub image_url: Option<String>,
    pub property_type: String,
    pub status: String,
    pub year_built: Option<i32>,
    pub lot_size_sqft: Option<i32>,
    pub parking_spaces: Option<i32>,
    pub amenities: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = DbError;

    fn try_from(row: PropertyRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| DbError::InvalidRow {
            id: row.id.clone(),
            reason,
        };
        let count = |column: &str, value: i32| {
            u32::try_from(value).map_err(|_| invalid(format!("negative {column}: {value}")))
        };
        let optional_count =
            |column: &str, value: Option<i32>| value.map(|v| count(column, v)).transpose();

        if row.price.is_sign_negative() {
            return Err(invalid(format!("negative price: {}", row.price)));
        }
        let property_type = PropertyType::from_literal(&row.property_type)
            .ok_or_else(|| invalid(format!("unknown property_type '{}'", row.property_type)))?;
        let status = PropertyStatus::from_literal(&row.status)
            .ok_or_else(|| invalid(format!("unknown status '{}'", row.status)))?;

        let bedrooms = count("bedrooms", row.bedrooms)?;
        let bathrooms = count("bathrooms", row.bathrooms)?;
        let area_sqft = count("area_sqft", row.area_sqft)?;
        let lot_size_sqft = optional_count("lot_size_sqft", row.lot_size_sqft)?;
        let parking_spaces = optional_count("parking_spaces", row.parking_spaces)?;

        Ok(Property {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            location: row.location,
            city: row.city,
            state: row.state,
            bedrooms,
            bathrooms,
            area_sqft,
            image_url: row.image_url,
            property_type,
            status,
            year_built: row.year_built,
            lot_size_sqft,
            parking_spaces,
            amenities: row.amenities,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn order_by(sort: SortOption) -> &'static str {
    // `id` is the tiebreaker so equal keys page deterministically.
    match sort {
        SortOption::PriceAsc => "price ASC, id ASC",
        SortOption::PriceDesc => "price DESC, id ASC",
        SortOption::Newest => "created_at DESC NULLS LAST, id ASC",
        SortOption::Oldest => "created_at ASC NULLS LAST, id ASC",
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Returns one page of listings matching `criteria`, ordered by `sort`.
///
/// `offset` is the opaque cursor handed back as `next_cursor`; one extra row
/// is fetched to decide whether another page exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored row violates a domain invariant.
pub async fn list_properties(
    pool: &PgPool,
    criteria: &FilterCriteria,
    sort: SortOption,
    offset: u64,
    limit: u32,
) -> Result<PropertyPage, DbError> {
    let statuses: Option<Vec<String>> = if criteria.statuses.is_empty() {
        None
    } else {
        Some(
            criteria
                .statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        )
    };
    let sql = format!(
        "SELECT {PROPERTY_COLUMNS} \
         FROM properties \
         WHERE ($1::NUMERIC IS NULL OR price >= $1) \
           AND ($2::NUMERIC IS NULL OR price <= $2) \
           AND ($3::INTEGER IS NULL OR bedrooms >= $3) \
           AND ($4::INTEGER IS NULL OR bathrooms >= $4) \
           AND ($5::TEXT IS NULL OR property_type = $5) \
           AND ($6::TEXT IS NULL \
                OR strpos(lower(location), lower($6)) > 0 \
                OR strpos(lower(COALESCE(city, '')), lower($6)) > 0 \
                OR strpos(lower(COALESCE(state, '')), lower($6)) > 0) \
           AND ($7::TEXT[] IS NULL OR status = ANY($7)) \
         ORDER BY {} \
         OFFSET $8 LIMIT $9",
        order_by(sort)
    );

    let rows = sqlx::query_as::<_, PropertyRow>(&sql)
        .bind(criteria.min_price)
        .bind(criteria.max_price)
        .bind(criteria.min_bedrooms.map(to_i32))
        .bind(criteria.min_bathrooms.map(to_i32))
        .bind(criteria.property_type.map(PropertyType::as_str))
        .bind(criteria.location.as_deref())
        .bind(statuses)
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .bind(i64::from(limit) + 1)
        .fetch_all(pool)
        .await?;

    let has_more = rows.len() > limit as usize;
    let items = rows
        .into_iter()
        .take(limit as usize)
        .map(Property::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let next_cursor = has_more.then(|| offset + items.len() as u64);

    Ok(PropertyPage { items, next_cursor })
}

/// Returns a single listing by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has that id, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_property(pool: &PgPool, id: &str) -> Result<Property, DbError> {
    let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1");
    let row = sqlx::query_as::<_, PropertyRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Property::try_from(row)
}

/// Inserts a validated listing and returns the stored row.
///
/// The id is generated here as a v4 UUID string.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_property(pool: &PgPool, new: &NewProperty) -> Result<Property, DbError> {
    let sql = format!(
        "INSERT INTO properties \
             (id, title, description, price, location, city, state, bedrooms, bathrooms, \
              area_sqft, image_url, property_type, status, year_built, lot_size_sqft, \
              parking_spaces, amenities, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, \
                 $10, $11, $12, $13, $14, $15, \
                 $16, $17, NOW(), NOW()) \
         RETURNING {PROPERTY_COLUMNS}"
    );

    let row = sqlx::query_as::<_, PropertyRow>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.location)
        .bind(new.city.as_deref())
        .bind(new.state.as_deref())
        .bind(to_i32(new.bedrooms))
        .bind(to_i32(new.bathrooms))
        .bind(to_i32(new.area_sqft))
        .bind(new.image_url.as_deref())
        .bind(new.property_type.as_str())
        .bind(new.status.as_str())
        .bind(new.year_built)
        .bind(new.lot_size_sqft.map(to_i32))
        .bind(new.parking_spaces.map(to_i32))
        .bind(&new.amenities)
        .fetch_one(pool)
        .await?;

    tracing::info!(id = %row.id, "property created");
    Property::try_from(row)
}

/// Applies a sparse update and returns the stored row.
///
/// Reads the current row under `FOR UPDATE`, applies `changes` in memory,
/// and writes every column back in the same transaction. An empty change set
/// returns the current row unchanged.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has that id, or [`DbError::Sqlx`]
/// if a statement fails.
pub async fn update_property(
    pool: &PgPool,
    id: &str,
    changes: &PropertyChanges,
) -> Result<Property, DbError> {
    let mut tx = pool.begin().await?;

    let select = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1 FOR UPDATE");
    let current = sqlx::query_as::<_, PropertyRow>(&select)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;
    let mut property = Property::try_from(current)?;

    if changes.is_empty() {
        tx.commit().await?;
        return Ok(property);
    }
    changes.apply_to(&mut property);

    let update = format!(
        "UPDATE properties SET \
             title          = $2, \
             description    = $3, \
             price          = $4, \
             location       = $5, \
             city           = $6, \
             state          = $7, \
             bedrooms       = $8, \
             bathrooms      = $9, \
             area_sqft      = $10, \
             image_url      = $11, \
             property_type  = $12, \
             status         = $13, \
             year_built     = $14, \
             lot_size_sqft  = $15, \
             parking_spaces = $16, \
             amenities      = $17, \
             updated_at     = NOW() \
         WHERE id = $1 \
         RETURNING {PROPERTY_COLUMNS}"
    );
    let row = sqlx::query_as::<_, PropertyRow>(&update)
        .bind(id)
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.price)
        .bind(&property.location)
        .bind(property.city.as_deref())
        .bind(property.state.as_deref())
        .bind(to_i32(property.bedrooms))
        .bind(to_i32(property.bathrooms))
        .bind(to_i32(property.area_sqft))
        .bind(property.image_url.as_deref())
        .bind(property.property_type.as_str())
        .bind(property.status.as_str())
        .bind(property.year_built)
        .bind(property.lot_size_sqft.map(to_i32))
        .bind(property.parking_spaces.map(to_i32))
        .bind(&property.amenities)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(id, "property updated");
    Property::try_from(row)
}

/// Deletes a listing. Favorites referencing it are removed by the
/// `ON DELETE CASCADE` foreign key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has that id, or [`DbError::Sqlx`]
/// if the delete fails.
pub async fn delete_property(pool: &PgPool, id: &str) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    tracing::info!(id, "property deleted");
    Ok(())
}
