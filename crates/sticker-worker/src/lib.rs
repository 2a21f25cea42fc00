//! Sticker conversion pipeline.
//!
//! This crate provides:
//! - Caption intent parsing and the keyword gate
//! - Media acquisition with retry and quoted-message fallback
//! - Image and video transform chains with fallback to the original
//! - Sticker delivery with per-user credits
//! - Settings commands and the per-message service loop

pub mod acquire;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod image_chain;
pub mod intent;
pub mod logging;
pub mod metrics;
pub mod service;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use acquire::{Acquisition, AcquisitionStrategy, MediaAcquirer};
pub use commands::{Command, CommandHandler};
pub use config::WorkerConfig;
pub use dispatcher::{DeliveryOutcome, Dispatcher};
pub use error::{ChainError, WorkerError, WorkerResult};
pub use image_chain::ImageTransformChain;
pub use intent::parse_intent;
pub use logging::MessageLogger;
pub use service::{MessageOutcome, StickerService};
pub use session::{
    ChatSession, InboundMessage, LocalSession, SessionError, StickerOptions, StickerPayload,
};
pub use settings::{
    FirestoreSettingsStore, InMemorySettingsStore, JsonFileSettingsStore, SettingsStore,
};
