use std::time::Duration;

use esscale_policy::ScalingParameters;
use serde::Serialize;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_METRICS_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize)]
pub struct AutoscalerConfig {
    pub domain_name: String,
    pub region: String,
    pub params: ScalingParameters,
    /// Apply the decision. Off means dry-run.
    pub configure: bool,
    #[serde(with = "duration_secs")]
    pub metrics_window: Duration,
    #[serde(skip)]
    pub retry: RetryConfig,
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            domain_name: String::new(),
            region: DEFAULT_REGION.to_string(),
            params: ScalingParameters::default(),
            configure: false,
            metrics_window: DEFAULT_METRICS_WINDOW,
            retry: RetryConfig::default(),
        }
    }
}

impl AutoscalerConfig {
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            ..Default::default()
        }
    }
}

/// Backoff for describe and metric fetches. Applies are never retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            jitter_fraction: 0.25,
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn compute_backoff_with_jitter(&self, attempt: u32) -> Duration {
        let base = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt));
        let capped = base.min(self.max_backoff);

        let jitter_ms = (capped.as_millis() as f64 * self.jitter_fraction * rand_fraction()) as u64;
        capped + Duration::from_millis(jitter_ms)
    }
}

fn rand_fraction() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(crate::time::current_timestamp_millis());
    (hasher.finish() % 1000) as f64 / 1000.0
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}
