//! Offline unit tests for propdb-db pool configuration and row types.
//! These tests do not require a live database connection.

use propdb_core::{Environment, Property, ServerConfig};
use propdb_db::{DbError, PoolConfig, PropertyRow};
use rust_decimal::Decimal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_server_config_uses_core_values() {
    let server_config = ServerConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        rate_limit_per_minute: 120,
    };

    let pool_config = PoolConfig::from_server_config(&server_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`PropertyRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn property_row_has_expected_fields() {
    use chrono::Utc;

    let row = PropertyRow {
        id: "p-9".to_string(),
        title: "Hillside lot".to_string(),
        description: "Buildable, utilities at street".to_string(),
        price: Decimal::from(85_000),
        location: "Lot 9, Ridge Rd".to_string(),
        city: None,
        state: Some("VT".to_string()),
        bedrooms: 0_i32,
        bathrooms: 0_i32,
        area_sqft: 0_i32,
        image_url: None,
        property_type: "land".to_string(),
        status: "for-sale".to_string(),
        year_built: None,
        lot_size_sqft: Some(43_560),
        parking_spaces: None,
        amenities: vec![],
        created_at: Some(Utc::now()),
        updated_at: None,
    };

    let property = Property::try_from(row).expect("row is valid");
    assert_eq!(property.id, "p-9");
    assert_eq!(property.lot_size_sqft, Some(43_560));
    assert_eq!(property.property_type.as_str(), "Land");
}

#[test]
fn not_found_error_message_is_stable() {
    assert_eq!(DbError::NotFound.to_string(), "record not found");
}
