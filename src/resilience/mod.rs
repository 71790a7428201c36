//! Resilience
//!
//! Caller-chosen retry policy for transient failures. This is layered on
//! top of the client's own single-shot credential refresh, never merged
//! with it.

pub mod retry;

pub use retry::{
    default_retry_predicate, FixedJitter, JitterSource, RandomJitter, RetryCallback,
    RetryExecutor, RetryPolicy, RetryPolicyBuilder, RetryPredicate, RetryStats,
};
