//! Domain types and pure logic shared by the propdb server, client, and CLI.

pub mod app_config;
pub mod config;
pub mod error;
pub mod filter;
pub mod postprocess;
pub mod property;
pub mod session;
pub mod submission;

pub use app_config::{ClientConfig, Environment, ServerConfig};
pub use config::{load_client_config, load_server_config};
pub use error::{ConfigError, CoreError, FieldError, ValidationErrors};
pub use filter::{FilterCriteria, ListQuery, RawFilter, RawListQuery};
pub use postprocess::{
    format_price, paginate, process, sort_properties, EmptyReason, Paginated, PostProcessed,
    SortOption,
};
pub use property::{Property, PropertyPage, PropertyStatus, PropertyType};
pub use session::{Role, User};
pub use submission::{NewProperty, PropertyChanges, PropertySubmission, PropertyUpdate};
