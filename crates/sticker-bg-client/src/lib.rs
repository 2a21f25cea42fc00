//! Client for the background removal service.
//!
//! The pipeline depends on the [`BackgroundRemover`] trait; [`RemoveBgClient`]
//! implements it against the remove.bg HTTP API.

pub mod client;
pub mod error;
pub mod types;

pub use client::{BackgroundRemover, RemoveBgClient, RemoveBgConfig};
pub use error::{RemovalError, RemovalResult};
pub use types::RemoveBgRequest;
