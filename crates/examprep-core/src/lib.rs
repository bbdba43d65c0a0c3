//! examprep-core — Session model, state controller, and navigation shell.
//!
//! This crate defines the data model served by the exam API, the gateway
//! trait the rest of the system talks through, and the synchronous
//! controller plus async shell that drive a single exam or practice attempt.

pub mod controller;
pub mod error;
pub mod model;
pub mod review;
pub mod shell;
pub mod traits;
pub mod validation;
