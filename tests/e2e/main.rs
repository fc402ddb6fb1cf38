//! End-to-end tests for the staking journal.
//!
//! Each scenario drives the public API the way the embedding application
//! would: a store opened on a temp directory, a ledger wired with scripted
//! collaborators, and assertions on both the in-memory state and what lands
//! on disk.

mod harness;
mod scenarios;
