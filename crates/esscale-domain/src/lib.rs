pub mod autoscaler;
pub mod config;
pub mod error;
pub mod metrics;
pub mod report;
pub mod snapshot;
pub mod status;
pub mod testutil;
mod time;
pub mod traits;

pub use autoscaler::{Autoscaler, Evaluation, RunOutcome};
pub use config::{AutoscalerConfig, RetryConfig, DEFAULT_METRICS_WINDOW, DEFAULT_REGION};
pub use error::{DomainError, Result};
pub use crate::metrics::AutoscalerMetrics;
pub use snapshot::{Datapoint, DomainSnapshot, SnapshotBackend, StorageUnit};
pub use status::{ClusterConfig, DomainStatus, EbsOptions};
pub use time::current_timestamp_millis;
pub use traits::{
    ClusterDescriptor, ClusterMutator, ConfigUpdate, MetricsProvider, USED_SPACE_METRIC,
};
