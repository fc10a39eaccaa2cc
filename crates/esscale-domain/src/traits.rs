use std::time::Duration;

use async_trait::async_trait;
use esscale_policy::StorageUsage;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::status::DomainStatus;

pub const USED_SPACE_METRIC: &str = "ClusterUsedSpace";

#[async_trait]
pub trait ClusterDescriptor: Send + Sync {
    async fn describe(&self, domain_name: &str) -> Result<DomainStatus>;
}

#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Average used storage over the trailing `window`.
    async fn get_used_storage(
        &self,
        domain_name: &str,
        client_id: &str,
        window: Duration,
    ) -> Result<StorageUsage>;
}

#[async_trait]
pub trait ClusterMutator: Send + Sync {
    async fn apply(&self, domain_name: &str, target_nodes: u32) -> Result<ConfigUpdate>;
}

/// Acknowledgement of a requested instance count change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub domain_name: String,
    pub previous_instance_count: u32,
    pub requested_instance_count: u32,
}

impl ConfigUpdate {
    pub fn is_noop(&self) -> bool {
        self.previous_instance_count == self.requested_instance_count
    }
}
