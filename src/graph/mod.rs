//! Core graph engine — persistence, locking, indexes, mutations, and search.
//!
//! This module contains the single-file store ([`store`]), the cooperative
//! writer lock ([`lock`]), tokenization and derived indexes ([`index`]), the
//! write path ([`mutate`]), and the context-search pipeline ([`search`]).
//! Type definitions live in [`types`].

pub mod index;
pub mod lock;
pub mod mutate;
pub mod search;
pub mod store;
pub mod types;

/// Current wall-clock time in integer milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
