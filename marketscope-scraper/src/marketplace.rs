use crate::error::Result;
use crate::record::{ListingRecord, ScrapeAttempt};
use async_trait::async_trait;
use std::sync::Arc;

/// Receives every attempt record a scraper emits, success or failure.
/// Callers typically collect these and append them to the attempt log.
pub type AttemptCallback = Arc<dyn Fn(ScrapeAttempt) + Send + Sync>;

/// The per-marketplace fetch contract. New marketplaces are added by
/// implementing this trait, one implementation per marketplace.
///
/// Implementations must emit exactly one [`ScrapeAttempt`] per fetch call
/// through their attempt callback, and must pace every network-bound call
/// through their rate limiter.
#[async_trait]
pub trait MarketplaceScraper: Send + Sync {
    /// Human-facing marketplace name, also the attempt-log identifier.
    fn name(&self) -> &str;

    fn base_url(&self) -> &str;

    /// Fetch and extract a single product page. Transport failures are
    /// logged to the attempt callback and returned to the caller; missing
    /// page fields degrade to defaults instead of failing the fetch.
    async fn fetch_one(&self, url: &str) -> Result<ListingRecord>;

    /// Fetch up to `limit` listings, capped at an implementation-defined
    /// ceiling, with the rate limit applied between every item.
    async fn fetch_batch(&self, limit: usize) -> Result<Vec<ListingRecord>>;
}
