use marketscope_scraper::record::{ListingRecord, ScrapeAttempt};
use rusqlite::{Connection, OptionalExtension, Result, params};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::revenue::MrrEstimate;
use crate::traffic::TrafficFigure;

pub struct Database {
    conn: Connection,
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

impl Database {
    pub fn drop(path: &Path) {
        let _ = fs::remove_file(path);
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Optimize for concurrent writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
CREATE TABLE IF NOT EXISTS marketplaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    base_url TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- Canonical products, deduplicated solely by canonical_url
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    canonical_url TEXT NOT NULL UNIQUE,
    description TEXT,
    tags TEXT,          -- JSON array
    categories TEXT,    -- JSON array
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);

-- One marketplace's presentation of a product
CREATE TABLE IF NOT EXISTS product_listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    marketplace_id INTEGER NOT NULL,
    listing_url TEXT NOT NULL,
    upvotes INTEGER NOT NULL DEFAULT 0,
    price_plans TEXT,   -- JSON array
    snapshot_path TEXT,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY(product_id) REFERENCES products(id) ON DELETE CASCADE,
    FOREIGN KEY(marketplace_id) REFERENCES marketplaces(id) ON DELETE CASCADE,
    UNIQUE(product_id, marketplace_id)
);

CREATE INDEX IF NOT EXISTS idx_listings_product ON product_listings(product_id);
CREATE INDEX IF NOT EXISTS idx_listings_marketplace ON product_listings(marketplace_id);

-- At most one current traffic figure per product
CREATE TABLE IF NOT EXISTS traffic_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL UNIQUE,
    visits_month INTEGER NOT NULL,
    visits_growth REAL NOT NULL,
    bounce_rate REAL NOT NULL,
    avg_session_secs REAL NOT NULL,
    traffic_sources TEXT,   -- JSON object
    updated_at INTEGER NOT NULL,
    FOREIGN KEY(product_id) REFERENCES products(id) ON DELETE CASCADE
);

-- At most one current estimate per product
CREATE TABLE IF NOT EXISTS mrr_estimates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL UNIQUE,
    mrr_low REAL NOT NULL,
    mrr_likely REAL NOT NULL,
    mrr_high REAL NOT NULL,
    confidence REAL NOT NULL,
    assumptions TEXT,   -- JSON array of rendered strings
    methodology TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY(product_id) REFERENCES products(id) ON DELETE CASCADE
);

-- Append-only fetch audit log
CREATE TABLE IF NOT EXISTS scrape_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER,
    marketplace_id INTEGER,
    url TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('success', 'blocked', 'timeout', 'error')),
    status_code INTEGER NOT NULL,
    duration_ms INTEGER NOT NULL,
    error_message TEXT,
    snapshot_path TEXT,
    timestamp INTEGER NOT NULL,
    FOREIGN KEY(product_id) REFERENCES products(id) ON DELETE SET NULL,
    FOREIGN KEY(marketplace_id) REFERENCES marketplaces(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_attempts_marketplace ON scrape_attempts(marketplace_id);
CREATE INDEX IF NOT EXISTS idx_attempts_status ON scrape_attempts(status);
CREATE INDEX IF NOT EXISTS idx_attempts_timestamp ON scrape_attempts(timestamp);
            ",
        )?;
        Ok(())
    }

    // Marketplace operations
    pub fn ensure_marketplace(&self, name: &str, base_url: &str) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .prepare("SELECT id FROM marketplaces WHERE name = ?1")?
            .query_row(params![name], |row| row.get(0))
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO marketplaces (name, base_url, created_at) VALUES (?1, ?2, ?3)",
            params![name, base_url, current_timestamp()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // Product operations
    pub fn find_product_by_url(&self, canonical_url: &str) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM products WHERE canonical_url = ?1")?;

        let result = stmt
            .query_row(params![canonical_url], |row| row.get(0))
            .optional()?;
        Ok(result)
    }

    pub fn insert_product(&self, record: &ListingRecord) -> Result<i64> {
        let timestamp = current_timestamp();

        self.conn.execute(
            "INSERT INTO products (name, canonical_url, description, tags, categories, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &record.name,
                &record.url,
                &record.description,
                to_json(&record.tags),
                to_json(&record.categories),
                timestamp,
                timestamp,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_product(&self, product_id: i64, record: &ListingRecord) -> Result<()> {
        self.conn.execute(
            "UPDATE products SET name = ?1, description = ?2, tags = ?3, categories = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                &record.name,
                &record.description,
                to_json(&record.tags),
                to_json(&record.categories),
                current_timestamp(),
                product_id,
            ],
        )?;
        Ok(())
    }

    // Listing operations
    pub fn upsert_listing(
        &self,
        product_id: i64,
        marketplace_id: i64,
        record: &ListingRecord,
        snapshot_path: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO product_listings (product_id, marketplace_id, listing_url, upvotes, price_plans, snapshot_path, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(product_id, marketplace_id) DO UPDATE SET
                 listing_url = excluded.listing_url,
                 upvotes = excluded.upvotes,
                 price_plans = excluded.price_plans,
                 snapshot_path = excluded.snapshot_path,
                 updated_at = excluded.updated_at",
            params![
                product_id,
                marketplace_id,
                &record.url,
                record.upvotes,
                to_json(&record.price_plans),
                snapshot_path,
                current_timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn count_listings(&self, product_id: i64) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM product_listings WHERE product_id = ?1",
            params![product_id],
            |row| row.get(0),
        )
    }

    // Estimate operations
    pub fn replace_traffic(&self, product_id: i64, traffic: &TrafficFigure) -> Result<()> {
        self.conn.execute(
            "INSERT INTO traffic_data (product_id, visits_month, visits_growth, bounce_rate, avg_session_secs, traffic_sources, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(product_id) DO UPDATE SET
                 visits_month = excluded.visits_month,
                 visits_growth = excluded.visits_growth,
                 bounce_rate = excluded.bounce_rate,
                 avg_session_secs = excluded.avg_session_secs,
                 traffic_sources = excluded.traffic_sources,
                 updated_at = excluded.updated_at",
            params![
                product_id,
                traffic.visits_month as i64,
                traffic.visits_growth,
                traffic.bounce_rate,
                traffic.avg_session_secs,
                to_json(&traffic.sources),
                current_timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn replace_estimate(&self, product_id: i64, estimate: &MrrEstimate) -> Result<()> {
        self.conn.execute(
            "INSERT INTO mrr_estimates (product_id, mrr_low, mrr_likely, mrr_high, confidence, assumptions, methodology, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(product_id) DO UPDATE SET
                 mrr_low = excluded.mrr_low,
                 mrr_likely = excluded.mrr_likely,
                 mrr_high = excluded.mrr_high,
                 confidence = excluded.confidence,
                 assumptions = excluded.assumptions,
                 methodology = excluded.methodology,
                 updated_at = excluded.updated_at",
            params![
                product_id,
                estimate.mrr_low,
                estimate.mrr_likely,
                estimate.mrr_high,
                estimate.confidence,
                to_json(&estimate.rendered_assumptions()),
                &estimate.methodology,
                current_timestamp(),
            ],
        )?;
        Ok(())
    }

    // Attempt logging
    pub fn append_scrape_attempt(
        &self,
        marketplace_id: Option<i64>,
        product_id: Option<i64>,
        attempt: &ScrapeAttempt,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO scrape_attempts (product_id, marketplace_id, url, status, status_code, duration_ms, error_message, snapshot_path, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                product_id,
                marketplace_id,
                &attempt.url,
                attempt.status.as_str(),
                attempt.status_code,
                attempt.duration_ms as i64,
                &attempt.error,
                &attempt.snapshot_path,
                attempt.timestamp,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    // Query methods
    pub fn count_products(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
    }

    pub fn attempt_counts_by_status(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM scrape_attempts GROUP BY status")?;

        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;

        Ok(counts)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
