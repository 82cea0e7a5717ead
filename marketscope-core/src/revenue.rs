use marketscope_scraper::record::PricePlan;
use serde::{Deserialize, Serialize};

use crate::traffic::TrafficFigure;

pub const METHODOLOGY: &str =
    "Rule-based estimation using traffic data and pricing information";

/// One input the model relied on. Kept typed so callers can inspect the
/// trail programmatically; [`Assumption::render`] produces the wording
/// shown to end users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assumption {
    ConversionRate { rate: f64, visits: u64 },
    CustomerCount(u64),
    BaselinePrice(f64),
    RecurringRevenueModel,
    NoChurnModeling,
}

impl Assumption {
    pub fn render(&self) -> String {
        match self {
            Assumption::ConversionRate { rate, visits } => format!(
                "Conversion rate estimated at {:.2}% based on {} monthly visits",
                rate * 100.0,
                visits
            ),
            Assumption::CustomerCount(count) => format!(
                "Estimated {} customers based on traffic and conversion rate",
                count
            ),
            Assumption::BaselinePrice(price) => {
                format!(
                    "Highest price plan of ${} used as baseline",
                    render_price(*price)
                )
            }
            Assumption::RecurringRevenueModel => {
                "Assumes SaaS business model with monthly recurring revenue".to_string()
            }
            Assumption::NoChurnModeling => {
                "Does not account for churn, expansion revenue, or enterprise deals".to_string()
            }
        }
    }
}

/// Always recomputed from its inputs, never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrrEstimate {
    pub mrr_low: f64,
    pub mrr_likely: f64,
    pub mrr_high: f64,
    /// In [0, 1]; saturates at 100k monthly visits.
    pub confidence: f64,
    pub assumptions: Vec<Assumption>,
    pub methodology: String,
}

impl MrrEstimate {
    pub fn rendered_assumptions(&self) -> Vec<String> {
        self.assumptions.iter().map(Assumption::render).collect()
    }
}

/// Conversion falls as traffic grows, reflecting diminishing marginal
/// conversion at scale.
pub fn conversion_rate(visits_month: u64) -> f64 {
    if visits_month > 100_000 {
        0.005
    } else if visits_month > 10_000 {
        0.01
    } else if visits_month > 1_000 {
        0.02
    } else {
        0.03
    }
}

/// Deterministic given its inputs; no internal randomness.
pub fn estimate(plans: &[PricePlan], traffic: &TrafficFigure) -> MrrEstimate {
    let baseline = plans.iter().map(|p| p.price).fold(0.0_f64, f64::max);
    let visits = traffic.visits_month;
    let rate = conversion_rate(visits);

    // At least one customer even at zero traffic: "unknown" must not read
    // as "no revenue".
    let customers = ((visits as f64 * rate).floor() as u64).max(1);

    let likely = baseline * customers as f64;

    MrrEstimate {
        mrr_low: round_cents(likely * 0.5),
        mrr_likely: round_cents(likely),
        mrr_high: round_cents(likely * 1.5),
        confidence: round_cents((visits as f64 / 100_000.0).min(1.0)),
        assumptions: vec![
            Assumption::ConversionRate { rate, visits },
            Assumption::CustomerCount(customers),
            Assumption::BaselinePrice(baseline),
            Assumption::RecurringRevenueModel,
            Assumption::NoChurnModeling,
        ],
        methodology: METHODOLOGY.to_string(),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whole-dollar prices keep a trailing .0 (29.0, not 29).
fn render_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{:.1}", price)
    } else {
        price.to_string()
    }
}
