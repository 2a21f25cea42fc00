//! Firestore REST API client.
//!
//! This crate provides:
//! - Service account authentication via gcp_auth, with a token cache
//! - Document get and merge updates with retry and metrics
//! - The settings repository (`settings/global` and `users/{id}`)

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod settings_repo;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use settings_repo::SettingsRepository;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
