//! Agent Registry
//!
//! Binds autonomous agents, each identified by a unique http(s) domain, to
//! the Ed25519 public keys used to verify their signed messages.
//!
//! ## Architecture
//!
//! - **crypto**: base58 Ed25519 key validation and signature verification
//! - **db**: SQLite tables for agents and keys
//! - **registry**: agent upsert-by-domain, soft deactivation, key lifecycle
//! - **api**: axum router exposing the registry over REST

pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod registry;
pub mod state;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
