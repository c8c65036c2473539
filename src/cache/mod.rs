//! In-memory caching for upstream API responses
//!
//! This module provides a single-slot cache that serves values within a
//! configurable TTL (time-to-live), hands back stale data while a background
//! fetch replaces it, and retries failed fetches with exponential backoff.
//! The owning service starts and stops the periodic refresh explicitly.

mod refreshing;
mod retry;

pub use refreshing::{CacheConfig, CacheError, CacheStatus, RefreshingCache};
pub use retry::{FetchError, RetryPolicy};
