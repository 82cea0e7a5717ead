use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One plan out of a product's price catalogue. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePlan {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub period: BillingPeriod,
    pub features: Vec<String>,
    pub is_popular: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Monthly,
    Annual,
    Lifetime,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Annual => "annual",
            BillingPeriod::Lifetime => "lifetime",
        }
    }

    /// Unknown labels default to monthly, the overwhelmingly common case.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "annual" | "yearly" => BillingPeriod::Annual,
            "lifetime" | "one-time" => BillingPeriod::Lifetime,
            _ => BillingPeriod::Monthly,
        }
    }
}

/// What one fetch of a marketplace product page yields. Produced per fetch
/// call and handed straight to ingestion; never stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    pub name: String,
    pub description: String,
    pub url: String,
    pub upvotes: u32,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub price_plans: Vec<PricePlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Blocked,
    Timeout,
    Error,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "success",
            AttemptStatus::Blocked => "blocked",
            AttemptStatus::Timeout => "timeout",
            AttemptStatus::Error => "error",
        }
    }
}

/// Append-only audit record. Every fetch call emits exactly one of these,
/// whether it succeeded or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeAttempt {
    pub url: String,
    pub marketplace: String,
    pub status: AttemptStatus,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub snapshot_path: Option<String>,
    pub timestamp: i64,
}

impl ScrapeAttempt {
    pub fn success(
        url: &str,
        marketplace: &str,
        status_code: u16,
        duration_ms: u64,
        snapshot_path: Option<String>,
    ) -> Self {
        Self {
            url: url.to_string(),
            marketplace: marketplace.to_string(),
            status: AttemptStatus::Success,
            status_code,
            duration_ms,
            error: None,
            snapshot_path,
            timestamp: unix_timestamp(),
        }
    }

    pub fn failure(
        url: &str,
        marketplace: &str,
        status: AttemptStatus,
        status_code: u16,
        error: String,
    ) -> Self {
        Self {
            url: url.to_string(),
            marketplace: marketplace.to_string(),
            status,
            status_code,
            duration_ms: 0,
            error: Some(error),
            snapshot_path: None,
            timestamp: unix_timestamp(),
        }
    }
}

pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
