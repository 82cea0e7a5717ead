use marketscope_scraper::record::ListingRecord;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::data::Database;
use crate::revenue::{self, MrrEstimate};
use crate::traffic::{TrafficEstimator, TrafficFigure};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub product_id: i64,
    pub created: bool,
    pub traffic: TrafficFigure,
    pub estimate: MrrEstimate,
}

#[derive(Debug)]
pub struct IngestSummary {
    pub run_id: String,
    pub ingested: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl IngestSummary {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            ingested: 0,
            created: 0,
            updated: 0,
            failed: 0,
        }
    }
}

/// Merge one scraped record into the canonical model, keyed by canonical
/// URL: update the product in place when it exists, create it otherwise,
/// then replace the per-marketplace listing, the traffic figure, and the
/// revenue estimate.
///
/// The four writes share one transaction; on any failure the product is
/// left exactly as it was before the call.
pub fn ingest_record(
    db: &Database,
    marketplace: &str,
    marketplace_base_url: &str,
    record: &ListingRecord,
    snapshot_path: Option<&str>,
    traffic_estimator: &dyn TrafficEstimator,
) -> Result<IngestOutcome> {
    let tx = db.get_connection().unchecked_transaction()?;

    let marketplace_id = db.ensure_marketplace(marketplace, marketplace_base_url)?;

    let (product_id, created) = match db.find_product_by_url(&record.url)? {
        Some(id) => {
            db.update_product(id, record)?;
            (id, false)
        }
        None => (db.insert_product(record)?, true),
    };

    db.upsert_listing(product_id, marketplace_id, record, snapshot_path)?;

    let traffic = traffic_estimator.estimate(&record.url);
    db.replace_traffic(product_id, &traffic)?;

    let estimate = revenue::estimate(&record.price_plans, &traffic);
    db.replace_estimate(product_id, &estimate)?;

    tx.commit()?;

    Ok(IngestOutcome {
        product_id,
        created,
        traffic,
        estimate,
    })
}

/// Ingest a whole batch. A failing record is logged and counted but never
/// aborts the rest of the batch.
pub fn ingest_batch(
    db: &Database,
    marketplace: &str,
    marketplace_base_url: &str,
    records: &[ListingRecord],
    traffic_estimator: &dyn TrafficEstimator,
) -> IngestSummary {
    let mut summary = IngestSummary::new();

    for record in records {
        match ingest_record(
            db,
            marketplace,
            marketplace_base_url,
            record,
            None,
            traffic_estimator,
        ) {
            Ok(outcome) => {
                summary.ingested += 1;
                if outcome.created {
                    summary.created += 1;
                } else {
                    summary.updated += 1;
                }
            }
            Err(e) => {
                warn!("Ingestion failed for {}: {}", record.url, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Ingestion run {} complete: {} ingested ({} new, {} updated), {} failed",
        summary.run_id, summary.ingested, summary.created, summary.updated, summary.failed
    );

    summary
}
