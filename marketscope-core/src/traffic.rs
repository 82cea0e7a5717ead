use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

/// Share of visits per acquisition channel, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSources {
    pub direct: u8,
    pub search: u8,
    pub referral: u8,
}

impl TrafficSources {
    /// The representative split used when no provider data exists.
    pub fn representative() -> Self {
        Self {
            direct: 30,
            search: 50,
            referral: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficFigure {
    pub visits_month: u64,
    /// Month-over-month growth, percent, may be negative.
    pub visits_growth: f64,
    /// Percent of single-page sessions.
    pub bounce_rate: f64,
    pub avg_session_secs: f64,
    pub sources: TrafficSources,
}

/// Produces a traffic figure for a product URL. Implementations are pure
/// per call and safe to invoke concurrently; every call may yield an
/// independent sample.
pub trait TrafficEstimator: Send + Sync {
    fn estimate(&self, product_url: &str) -> TrafficFigure;
}

/// Draws each metric from a wide but plausible range.
pub struct SyntheticTraffic;

impl TrafficEstimator for SyntheticTraffic {
    fn estimate(&self, _product_url: &str) -> TrafficFigure {
        let mut rng = rand::thread_rng();
        TrafficFigure {
            visits_month: rng.gen_range(1_000..=1_000_000),
            visits_growth: round2(rng.gen_range(-20.0..=50.0)),
            bounce_rate: round2(rng.gen_range(20.0..=80.0)),
            avg_session_secs: round2(rng.gen_range(30.0..=300.0)),
            sources: TrafficSources::representative(),
        }
    }
}

/// Reserved live-provider variant. Live lookups are not wired up yet, so
/// with or without a credential it hands the call to the synthetic
/// generator; a missing key must never hard-fail an estimation run.
pub struct SimilarwebTraffic {
    api_key: Option<String>,
    fallback: SyntheticTraffic,
}

impl SimilarwebTraffic {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            fallback: SyntheticTraffic,
        }
    }
}

impl TrafficEstimator for SimilarwebTraffic {
    fn estimate(&self, product_url: &str) -> TrafficFigure {
        if self.api_key.is_none() {
            debug!("No traffic provider credential; using synthetic figures");
        }
        self.fallback.estimate(product_url)
    }
}

pub fn from_config(config: &Config) -> Box<dyn TrafficEstimator> {
    if config.traffic_stub_mode {
        Box::new(SyntheticTraffic)
    } else {
        Box::new(SimilarwebTraffic::new(config.similarweb_api_key.clone()))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
