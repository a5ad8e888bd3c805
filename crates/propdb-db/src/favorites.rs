//! Database operations for the `favorites` table, keyed by `(user_id, property_id)`.

use sqlx::PgPool;

use crate::DbError;

/// Returns the caller's favorite property ids, most recently added first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_favorite_ids(pool: &PgPool, user_id: &str) -> Result<Vec<String>, DbError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT property_id FROM favorites \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, property_id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Marks a listing as a favorite. Adding an existing favorite is a no-op.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the listing does not exist, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn add_favorite(pool: &PgPool, user_id: &str, property_id: &str) -> Result<(), DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM properties WHERE id = $1)",
    )
    .bind(property_id)
    .fetch_one(pool)
    .await?;
    if !exists {
        return Err(DbError::NotFound);
    }

    sqlx::query(
        "INSERT INTO favorites (user_id, property_id, created_at) \
         VALUES ($1, $2, NOW()) \
         ON CONFLICT (user_id, property_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(property_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Removes a favorite. Removing an absent favorite is a no-op.
///
/// Returns whether a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn remove_favorite(
    pool: &PgPool,
    user_id: &str,
    property_id: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND property_id = $2")
        .bind(user_id)
        .bind(property_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
