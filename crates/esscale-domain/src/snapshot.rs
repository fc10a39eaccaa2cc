//! File-backed domain: a JSON snapshot of a describe response plus the
//! storage metric's recent datapoints.
//!
//! The snapshot is what an external exporter (or an operator) drops on disk
//! for the autoscaler to read. Applying a decision rewrites the instance
//! count in place, so a later run sees the new topology.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use esscale_policy::{StorageUsage, MEGABYTES_PER_GIGABYTE};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DomainError, Result};
use crate::status::DomainStatus;
use crate::time::current_timestamp_millis;
use crate::traits::{
    ClusterDescriptor, ClusterMutator, ConfigUpdate, MetricsProvider, USED_SPACE_METRIC,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainSnapshot {
    pub domain_status: DomainStatus,
    #[serde(default)]
    pub metrics: BTreeMap<String, Vec<Datapoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Datapoint {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub average: f64,
    #[serde(default)]
    pub unit: StorageUnit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageUnit {
    Bytes,
    Kilobytes,
    #[default]
    Megabytes,
    Gigabytes,
}

impl StorageUnit {
    pub fn to_megabytes(self, value: f64) -> f64 {
        const KIB: f64 = 1024.0;
        match self {
            StorageUnit::Bytes => value / (KIB * KIB),
            StorageUnit::Kilobytes => value / KIB,
            StorageUnit::Megabytes => value,
            StorageUnit::Gigabytes => value * MEGABYTES_PER_GIGABYTE,
        }
    }
}

impl DomainSnapshot {
    pub fn new(domain_status: DomainStatus) -> Self {
        Self {
            domain_status,
            metrics: BTreeMap::new(),
        }
    }

    pub fn push_datapoint(&mut self, metric: &str, datapoint: Datapoint) {
        self.metrics
            .entry(metric.to_string())
            .or_default()
            .push(datapoint);
    }

    /// Mean of the metric's datapoints in `[now_ms - window, now_ms]`, in MB.
    pub fn average_megabytes(&self, metric: &str, window: Duration, now_ms: u64) -> Option<f64> {
        let cutoff = now_ms.saturating_sub(window.as_millis() as u64);
        let values: Vec<f64> = self
            .metrics
            .get(metric)?
            .iter()
            .filter(|dp| (cutoff..=now_ms).contains(&dp.timestamp))
            .map(|dp| dp.unit.to_megabytes(dp.average))
            .collect();

        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub struct SnapshotBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<DomainSnapshot> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DomainError::unavailable(format!("snapshot {} not found", self.path.display()))
            } else {
                DomainError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn store(&self, snapshot: &DomainSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn load_domain(&self, domain_name: &str) -> Result<DomainSnapshot> {
        let snapshot = self.load().await?;
        if snapshot.domain_status.domain_name != domain_name {
            return Err(DomainError::domain_not_found(domain_name));
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl ClusterDescriptor for SnapshotBackend {
    async fn describe(&self, domain_name: &str) -> Result<DomainStatus> {
        let snapshot = self.load_domain(domain_name).await?;
        debug!(path = %self.path.display(), domain = domain_name, "loaded domain snapshot");
        Ok(snapshot.domain_status)
    }
}

#[async_trait]
impl MetricsProvider for SnapshotBackend {
    async fn get_used_storage(
        &self,
        domain_name: &str,
        client_id: &str,
        window: Duration,
    ) -> Result<StorageUsage> {
        let snapshot = self.load_domain(domain_name).await?;
        let owner = snapshot.domain_status.client_id()?;
        if owner != client_id {
            return Err(DomainError::domain_not_found(format!(
                "{domain_name} (client {client_id})"
            )));
        }

        let average_mb = snapshot
            .average_megabytes(USED_SPACE_METRIC, window, current_timestamp_millis())
            .ok_or_else(|| DomainError::NoDatapoints {
                metric: USED_SPACE_METRIC.to_string(),
                window,
            })?;

        Ok(StorageUsage::from_megabytes(average_mb))
    }
}

#[async_trait]
impl ClusterMutator for SnapshotBackend {
    async fn apply(&self, domain_name: &str, target_nodes: u32) -> Result<ConfigUpdate> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.load_domain(domain_name).await?;
        let config = &mut snapshot.domain_status.elasticsearch_cluster_config;
        let previous_instance_count = config.instance_count;
        config.instance_count = target_nodes;

        self.store(&snapshot).await?;
        info!(
            domain = domain_name,
            previous = previous_instance_count,
            requested = target_nodes,
            "updated instance count in snapshot"
        );

        Ok(ConfigUpdate {
            domain_name: domain_name.to_string(),
            previous_instance_count,
            requested_instance_count: target_nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_unit_conversion() {
        assert_eq!(StorageUnit::Megabytes.to_megabytes(512.0), 512.0);
        assert_eq!(StorageUnit::Gigabytes.to_megabytes(2.0), 2048.0);
        assert_eq!(StorageUnit::Kilobytes.to_megabytes(2048.0), 2.0);
        assert_eq!(StorageUnit::Bytes.to_megabytes(1_048_576.0), 1.0);
    }

    #[test]
    fn test_datapoint_unit_defaults_to_megabytes() {
        let dp: Datapoint = serde_json::from_str(r#"{"Timestamp": 1, "Average": 3.5}"#).unwrap();
        assert_eq!(dp.unit, StorageUnit::Megabytes);
    }

    #[test]
    fn test_average_respects_window() {
        let status = serde_json::from_str(
            r#"{
                "DomainId": "1/logs",
                "DomainName": "logs",
                "Endpoint": "search-logs.us-east-1.es.amazonaws.com",
                "ElasticsearchClusterConfig": { "InstanceCount": 4 },
                "EBSOptions": { "VolumeSize": 100 }
            }"#,
        )
        .unwrap();
        let mut snapshot = DomainSnapshot::new(status);
        let now = 10_000_000;
        for (age_ms, mb) in [(0, 100.0), (60_000, 300.0), (600_000, 10_000.0)] {
            snapshot.push_datapoint(
                USED_SPACE_METRIC,
                Datapoint {
                    timestamp: now - age_ms,
                    average: mb,
                    unit: StorageUnit::Megabytes,
                },
            );
        }

        let avg = snapshot
            .average_megabytes(USED_SPACE_METRIC, Duration::from_secs(300), now)
            .unwrap();
        assert_eq!(avg, 200.0);

        // Clock skew: a datapoint stamped after `now` is not part of the window.
        snapshot.push_datapoint(
            USED_SPACE_METRIC,
            Datapoint {
                timestamp: now + 60_000,
                average: 50_000.0,
                unit: StorageUnit::Megabytes,
            },
        );
        let avg = snapshot
            .average_megabytes(USED_SPACE_METRIC, Duration::from_secs(300), now)
            .unwrap();
        assert_eq!(avg, 200.0);

        assert!(snapshot
            .average_megabytes(USED_SPACE_METRIC, Duration::from_secs(300), now + 3_600_000)
            .is_none());
        assert!(snapshot
            .average_megabytes("FreeStorageSpace", Duration::from_secs(300), now)
            .is_none());
    }
}
