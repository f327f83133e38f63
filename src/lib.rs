//! # CDJ Scrobbler
//!
//! Playback tracking for DJ decks.
//!
//! This crate provides:
//! - A per-device playback model that turns raw status snapshots into
//!   track loaded, now playing and scrobble events
//! - A single-threaded event processor that resolves track metadata and
//!   fans events out to listeners
//! - Play-count compliance checks with an on-air warning signal
//! - A Serato-compatible tracklist CSV log
//!
//! The status feed, metadata lookups and scrobbling clients plug in
//! through the [`replay::StatusSource`], [`resolver::MetadataResolver`]
//! and [`listener::SongEventListener`] traits.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod accountant;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod listener;
pub mod model;
pub mod on_air;
pub mod processor;
pub mod replay;
pub mod resolver;
pub mod song;
pub mod state;
pub mod status;
pub mod tracklist;
pub mod types;

pub use config::Config;
pub use dispatcher::EventDispatcher;
pub use error::{Error, Result};
pub use event::{EventKind, SongEvent, TrackEvent};
pub use processor::EventProcessor;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "cdj-scrobbler";
