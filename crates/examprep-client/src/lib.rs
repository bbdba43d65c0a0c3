//! examprep-client — REST gateway, auth context, and configuration.
//!
//! Implements the core `SessionGateway` trait against the exam API, plus an
//! in-memory gateway for tests and offline use.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use auth::{AuthContext, TokenStore};
pub use config::{load_config, load_config_from, ClientConfig};
pub use error::AuthError;
pub use http::{HttpGateway, PracticeCatalog};
pub use mock::MockGateway;
