//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → command-line overrides (cli.rs)
//!     → ServiceConfig (validated, immutable)
//!     → handed to the listener, the connection handler and the service
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the MIME table and the client limit
//!   are values passed at construction, not globals
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    FilesConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ServiceConfig, TimeoutConfig,
    DEFAULT_MAX_CLIENTS,
};
pub use validation::{validate_config, ValidationError};
