//! Nimbus Launcher - Update & Release Channel Engine
//!
//! Nimbus keeps a binary-distributed application (and itself) up to date
//! across named release channels, and can replace its own on-disk files
//! with a newer build while running from them.
//!
//! # Architecture Overview
//!
//! The engine is built from five components, leaf first:
//!
//! - [`version`] - parses and compares version strings in three mutually
//!   exclusive dialects (stable semver, dated dev builds, dated branch
//!   builds); pure values, no I/O
//! - [`transfer`] - streams bytes from a remote source to a local sink in
//!   bounded chunks with fractional progress reporting
//! - [`channels`] - fetches and caches release metadata per channel, with
//!   a TTL-boxed branch listing and a stable-fallback policy for deleted
//!   branches
//! - [`upgrade`] - the self-update transaction: downloads a release
//!   archive, stages it, swaps it into the live installation with an
//!   explicit undo log, and rolls back on any mid-flight failure; plus
//!   the startup sweeper for artifacts of interrupted swaps
//! - [`config`] - persisted launcher settings (channel selection,
//!   auto-update flag, repository coordinates)
//!
//! # Failure posture
//!
//! Network fetches degrade to "no data for this channel" and are never
//! surfaced as fatal; unparseable version strings degrade to a
//! conservative `Unknown`; filesystem failures during a swap trigger a
//! best-effort rollback from the recorded undo log. Collaborators see
//! only terminal outcomes and human-readable error detail.

pub mod channels;
pub mod cli;
pub mod config;
pub mod constants;
pub mod transfer;
pub mod upgrade;
pub mod utils;
pub mod version;
