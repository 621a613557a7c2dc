//! Retry Mechanism Module
//!
//! Bounded retries with exponential backoff and jitter around a single
//! backend's provider calls.

mod policy;

pub use policy::{RetryExecutor, RetryPolicy};
