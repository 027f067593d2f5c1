//! Integration test suite: exercises the registry against stub fetchers
//! and the self-update swap against real temporary filesystems.

mod cli;
mod registry;
mod sweeper;
mod transaction;
