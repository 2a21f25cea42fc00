//! Shared data models for the sticker pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Caption intents
//! - Media assets and their classification
//! - Sticker credits and bot settings
//! - Sticker encoding parameters

pub mod asset;
pub mod encoding;
pub mod intent;
pub mod settings;

// Re-export common types
pub use asset::{MediaAsset, MediaKind};
pub use encoding::{SquareVideoParams, StickerEncoding};
pub use intent::Intent;
pub use settings::{Credits, GlobalSettings, UserCredits};
