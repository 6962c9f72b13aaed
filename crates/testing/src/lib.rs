//! Property-based and end-to-end test support for `optimus-core`.
//!
//! This crate doesn't test internals: everything here goes through
//! `optimus_core`'s public API, the way an external consumer would.

pub mod property_based;
pub mod scenarios;
