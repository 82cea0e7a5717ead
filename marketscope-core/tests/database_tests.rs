// Tests for database functionality

use marketscope_core::data::Database;
use marketscope_core::revenue;
use marketscope_core::traffic::{TrafficFigure, TrafficSources};
use marketscope_scraper::record::{
    AttemptStatus, BillingPeriod, ListingRecord, PricePlan, ScrapeAttempt,
};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn sample_record(url: &str) -> ListingRecord {
    ListingRecord {
        name: "TaskFlow Pro".to_string(),
        description: "A revolutionary productivity solution.".to_string(),
        url: url.to_string(),
        upvotes: 420,
        tags: vec!["saas".to_string(), "productivity".to_string()],
        categories: vec!["Productivity".to_string()],
        price_plans: vec![PricePlan {
            name: "Professional".to_string(),
            price: 29.0,
            currency: "USD".to_string(),
            period: BillingPeriod::Monthly,
            features: vec!["Feature 1".to_string()],
            is_popular: true,
        }],
    }
}

fn sample_traffic(visits: u64) -> TrafficFigure {
    TrafficFigure {
        visits_month: visits,
        visits_growth: 5.0,
        bounce_rate: 40.0,
        avg_session_secs: 120.0,
        sources: TrafficSources::representative(),
    }
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));

    let _db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));
}

#[test]
fn test_database_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let _db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));

    Database::drop(&db_path);
    assert!(!Database::exists(&db_path));
}

// ============================================================================
// Marketplace Tests
// ============================================================================

#[test]
fn test_ensure_marketplace_is_idempotent() {
    let (_temp_dir, db) = create_test_db();

    let first = db
        .ensure_marketplace("Product Hunt", "https://www.producthunt.com")
        .unwrap();
    let second = db
        .ensure_marketplace("Product Hunt", "https://www.producthunt.com")
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_distinct_marketplaces_get_distinct_ids() {
    let (_temp_dir, db) = create_test_db();

    let ph = db
        .ensure_marketplace("Product Hunt", "https://www.producthunt.com")
        .unwrap();
    let g2 = db.ensure_marketplace("G2", "https://www.g2.com").unwrap();

    assert_ne!(ph, g2);
}

// ============================================================================
// Product Tests
// ============================================================================

#[test]
fn test_insert_and_find_product() {
    let (_temp_dir, db) = create_test_db();

    let record = sample_record("https://example.com/products/taskflow-pro");
    let product_id = db.insert_product(&record).unwrap();
    assert!(product_id > 0);

    let found = db
        .find_product_by_url("https://example.com/products/taskflow-pro")
        .unwrap();
    assert_eq!(found, Some(product_id));
}

#[test]
fn test_find_missing_product() {
    let (_temp_dir, db) = create_test_db();

    let found = db.find_product_by_url("https://example.com/nope").unwrap();
    assert_eq!(found, None);
}

#[test]
fn test_update_product_keeps_identity() {
    let (_temp_dir, db) = create_test_db();

    let mut record = sample_record("https://example.com/products/taskflow-pro");
    let product_id = db.insert_product(&record).unwrap();

    record.name = "TaskFlow Pro 2".to_string();
    db.update_product(product_id, &record).unwrap();

    let name: String = db
        .get_connection()
        .query_row(
            "SELECT name FROM products WHERE id = ?1",
            [product_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(name, "TaskFlow Pro 2");
    assert_eq!(db.count_products().unwrap(), 1);
}

#[test]
fn test_duplicate_canonical_url_is_rejected() {
    let (_temp_dir, db) = create_test_db();

    let record = sample_record("https://example.com/products/taskflow-pro");
    db.insert_product(&record).unwrap();

    assert!(db.insert_product(&record).is_err());
}

// ============================================================================
// Listing Tests
// ============================================================================

#[test]
fn test_upsert_listing_replaces_prior_row() {
    let (_temp_dir, db) = create_test_db();

    let mut record = sample_record("https://example.com/products/taskflow-pro");
    let product_id = db.insert_product(&record).unwrap();
    let marketplace_id = db
        .ensure_marketplace("Product Hunt", "https://www.producthunt.com")
        .unwrap();

    db.upsert_listing(product_id, marketplace_id, &record, None)
        .unwrap();

    record.upvotes = 999;
    db.upsert_listing(product_id, marketplace_id, &record, Some("data/raw/x.html"))
        .unwrap();

    assert_eq!(db.count_listings(product_id).unwrap(), 1);

    let upvotes: i64 = db
        .get_connection()
        .query_row(
            "SELECT upvotes FROM product_listings WHERE product_id = ?1",
            [product_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(upvotes, 999);
}

#[test]
fn test_listings_on_two_marketplaces_coexist() {
    let (_temp_dir, db) = create_test_db();

    let record = sample_record("https://example.com/products/taskflow-pro");
    let product_id = db.insert_product(&record).unwrap();
    let ph = db
        .ensure_marketplace("Product Hunt", "https://www.producthunt.com")
        .unwrap();
    let g2 = db.ensure_marketplace("G2", "https://www.g2.com").unwrap();

    db.upsert_listing(product_id, ph, &record, None).unwrap();
    db.upsert_listing(product_id, g2, &record, None).unwrap();

    assert_eq!(db.count_listings(product_id).unwrap(), 2);
}

// ============================================================================
// Traffic / Estimate Tests
// ============================================================================

#[test]
fn test_replace_traffic_keeps_single_row() {
    let (_temp_dir, db) = create_test_db();

    let record = sample_record("https://example.com/products/taskflow-pro");
    let product_id = db.insert_product(&record).unwrap();

    db.replace_traffic(product_id, &sample_traffic(5_000))
        .unwrap();
    db.replace_traffic(product_id, &sample_traffic(12_000))
        .unwrap();

    let (count, visits): (i64, i64) = db
        .get_connection()
        .query_row(
            "SELECT COUNT(*), MAX(visits_month) FROM traffic_data WHERE product_id = ?1",
            [product_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(visits, 12_000);
}

#[test]
fn test_replace_estimate_keeps_single_row() {
    let (_temp_dir, db) = create_test_db();

    let record = sample_record("https://example.com/products/taskflow-pro");
    let product_id = db.insert_product(&record).unwrap();

    let first = revenue::estimate(&record.price_plans, &sample_traffic(5_000));
    db.replace_estimate(product_id, &first).unwrap();

    let second = revenue::estimate(&record.price_plans, &sample_traffic(50_000));
    db.replace_estimate(product_id, &second).unwrap();

    let (count, likely): (i64, f64) = db
        .get_connection()
        .query_row(
            "SELECT COUNT(*), MAX(mrr_likely) FROM mrr_estimates WHERE product_id = ?1",
            [product_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(likely, second.mrr_likely);
}

// ============================================================================
// Attempt Log Tests
// ============================================================================

#[test]
fn test_attempts_are_append_only() {
    let (_temp_dir, db) = create_test_db();

    let marketplace_id = db
        .ensure_marketplace("Product Hunt", "https://www.producthunt.com")
        .unwrap();

    let ok = ScrapeAttempt::success(
        "https://example.com/p/a",
        "Product Hunt",
        200,
        150,
        Some("data/raw/a.html".to_string()),
    );
    let blocked = ScrapeAttempt::failure(
        "https://example.com/p/b",
        "Product Hunt",
        AttemptStatus::Blocked,
        403,
        "HTTP 403".to_string(),
    );
    let errored = ScrapeAttempt::failure(
        "https://example.com/p/c",
        "Product Hunt",
        AttemptStatus::Error,
        0,
        "connection refused".to_string(),
    );

    db.append_scrape_attempt(Some(marketplace_id), None, &ok)
        .unwrap();
    db.append_scrape_attempt(Some(marketplace_id), None, &blocked)
        .unwrap();
    db.append_scrape_attempt(Some(marketplace_id), None, &errored)
        .unwrap();

    let counts = db.attempt_counts_by_status().unwrap();
    let get = |status: &str| {
        counts
            .iter()
            .find(|(s, _)| s == status)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    };
    assert_eq!(get("success"), 1);
    assert_eq!(get("blocked"), 1);
    assert_eq!(get("error"), 1);
    assert_eq!(get("timeout"), 0);
}
