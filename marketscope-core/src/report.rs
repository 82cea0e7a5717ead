// Report generation from database

use rusqlite::Result;
use serde::{Deserialize, Serialize};

use crate::data::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReport {
    pub name: String,
    pub canonical_url: String,
    pub listings: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits_month: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrr_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrr_likely: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrr_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub success: i64,
    pub blocked: i64,
    pub timeout: i64,
    pub error: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub total_products: i64,
    pub products: Vec<ProductReport>,
    pub attempts: AttemptCounts,
}

pub fn gather_report_data(db: &Database) -> Result<ReportData> {
    let total_products = db.count_products()?;

    let products = {
        let conn = db.get_connection();
        let mut stmt = conn.prepare(
            "SELECT p.name, p.canonical_url,
                    (SELECT COUNT(*) FROM product_listings l WHERE l.product_id = p.id),
                    t.visits_month,
                    e.mrr_low, e.mrr_likely, e.mrr_high, e.confidence
             FROM products p
             LEFT JOIN traffic_data t ON t.product_id = p.id
             LEFT JOIN mrr_estimates e ON e.product_id = p.id
             ORDER BY e.mrr_likely IS NULL, e.mrr_likely DESC, p.name",
        )?;

        stmt.query_map([], |row| {
            Ok(ProductReport {
                name: row.get(0)?,
                canonical_url: row.get(1)?,
                listings: row.get(2)?,
                visits_month: row.get(3)?,
                mrr_low: row.get(4)?,
                mrr_likely: row.get(5)?,
                mrr_high: row.get(6)?,
                confidence: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?
    };

    let mut attempts = AttemptCounts::default();
    for (status, count) in db.attempt_counts_by_status()? {
        match status.as_str() {
            "success" => attempts.success = count,
            "blocked" => attempts.blocked = count,
            "timeout" => attempts.timeout = count,
            "error" => attempts.error = count,
            _ => {}
        }
    }

    Ok(ReportData {
        total_products,
        products,
        attempts,
    })
}

pub fn render_report(data: &ReportData, format: &ReportFormat) -> String {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(data).unwrap_or_default(),
        ReportFormat::Text => render_text(data),
    }
}

fn render_text(data: &ReportData) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Products tracked: {}\n", data.total_products));
    report.push_str(&format!(
        "  Fetch attempts: {} ok / {} blocked / {} timeout / {} error\n",
        data.attempts.success, data.attempts.blocked, data.attempts.timeout, data.attempts.error
    ));
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for product in &data.products {
        report.push_str(&format!("## {}\n", product.name));
        report.push_str(&format!("  {}\n", product.canonical_url));
        report.push_str(&format!("  {} listing(s)\n", product.listings));

        if let Some(visits) = product.visits_month {
            report.push_str(&format!("  {} monthly visits\n", visits));
        }
        if let (Some(low), Some(likely), Some(high), Some(confidence)) = (
            product.mrr_low,
            product.mrr_likely,
            product.mrr_high,
            product.confidence,
        ) {
            report.push_str(&format!(
                "  MRR ${:.2} - ${:.2} - ${:.2} (confidence {:.2})\n",
                low, likely, high, confidence
            ));
        }
        report.push('\n');
    }

    report
}
