//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → ServerBuilder::from_config (settings snapshot for the orchestrator)
//! ```
//!
//! # Design Decisions
//! - Config is a snapshot taken at construction; the orchestrator never rereads it
//! - All fields have defaults to allow minimal configs
//! - Hooks, tests and handlers are code, so they are registered on the builder,
//!   not in the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, HttpConfig, ObservabilityConfig, ServerSettings};
pub use validation::{validate_config, ValidationError};
