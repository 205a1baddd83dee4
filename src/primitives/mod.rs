//! Low-level primitives shared by the search engine.

/// Cooperative cancellation, worker configuration and per-search counters.
pub mod concurrency;
