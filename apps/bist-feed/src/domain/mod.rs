//! Domain Layer - Market data types and the in-memory state store.
//!
//! Everything here is synchronous and free of I/O. Decoders in the
//! infrastructure layer build these types and merge them into the
//! [`market::MarketStateStore`].

/// Order-book rows and per-security books.
pub mod depth;

/// In-memory concurrent market state.
pub mod market;

/// Headline and body records.
pub mod news;

/// Static exchange and market-segment tables.
pub mod reference;

/// Security records and their trade statistics.
pub mod security;

/// Session clock and state.
pub mod session;
