//! Client side of propdb: the REST client and the search pipeline built on it.

pub mod api;
pub mod auth;
pub mod error;
pub mod executor;
pub mod favorites;
pub(crate) mod retry;
pub mod search;
pub mod stabilize;

pub use api::{HttpPropertyApi, PropertyApi};
pub use auth::{AuthGate, GateDecision, GateRoutes, Navigator, SessionState};
pub use error::ClientError;
pub use executor::{QueryExecutor, QueryResult, Snapshot, Ticket};
pub use favorites::{FavoritesStore, LocalFavorites, RemoteFavorites};
pub use search::{SearchController, SearchSettings, SearchView};
pub use stabilize::{spawn_debouncer, spawn_throttler, ByRef, Debounce, Memo, Throttle};
