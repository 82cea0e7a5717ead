use std::time::Duration;
use tokio::time::Instant;

/// Minimum-interval ticker used to pace outbound requests.
///
/// `wait` returns immediately the first time, then never lets two grants
/// happen closer together than `interval`. Strictly sequential spacing,
/// no burst allowance: one fetcher instance, one budget.
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::from_secs_f64(secs.max(0.0)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let next = last + self.interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
