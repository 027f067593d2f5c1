//! Self-update engine for the Nimbus launcher.
//!
//! This module replaces the launcher's own on-disk files with a newer
//! release while the replacing process keeps running from the files being
//! replaced. It is built around three pieces:
//!
//! - [`SelfUpdateTransaction`]: the six-step swap protocol (acquire,
//!   stage, displace, install, permission fix-up, launch)
//! - [`rollback::UndoLog`]: the explicit action log that makes a
//!   best-effort rollback possible after any mid-flight failure
//! - [`sweeper`]: startup cleanup of marker-suffixed leftovers from a
//!   previously interrupted swap
//!
//! The installation directory is a single shared mutable resource. The
//! engine assumes it is the sole writer during a transaction; callers
//! serialize triggers so no two installation-directory mutations are ever
//! in flight concurrently. User-owned entries (profiles, settings, the
//! managed application payload) are excluded from the swap unconditionally,
//! and live entries with no staged counterpart are never touched.

pub mod rollback;
pub mod sweeper;
pub mod transaction;

pub use rollback::UndoLog;
pub use sweeper::sweep_stale_artifacts;
pub use transaction::{ConfirmAction, SelfUpdateTransaction, SwapOutcome, swap_from_staging};
