pub mod error;
pub mod marketplace;
pub mod producthunt;
pub mod record;
pub mod snapshot;
pub mod throttle;

pub use error::ScrapeError;
pub use marketplace::{AttemptCallback, MarketplaceScraper};
pub use producthunt::ProductHunt;
pub use record::{ListingRecord, PricePlan, ScrapeAttempt};
pub use snapshot::SnapshotStore;
pub use throttle::Throttle;
