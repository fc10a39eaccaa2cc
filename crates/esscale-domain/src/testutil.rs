use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use esscale_policy::StorageUsage;
use parking_lot::RwLock;

use crate::error::{DomainError, Result};
use crate::status::{ClusterConfig, DomainStatus, EbsOptions};
use crate::traits::{ClusterDescriptor, ClusterMutator, ConfigUpdate, MetricsProvider};

/// In-memory domain implementing every collaborator, with failure injection.
pub struct MockDomain {
    status: RwLock<DomainStatus>,
    used_gb: RwLock<f64>,
    describe_failures: AtomicU32,
    metrics_failures: AtomicU32,
    apply_fail: AtomicBool,
    describe_count: AtomicU64,
    metrics_count: AtomicU64,
    apply_count: AtomicU64,
    last_window: RwLock<Option<Duration>>,
}

impl MockDomain {
    pub fn new(domain_name: &str, slaves: u32, masters: u32, volume_size_gb: f64) -> Self {
        let status = DomainStatus {
            domain_id: format!("123456789012/{domain_name}"),
            domain_name: domain_name.to_string(),
            endpoint: format!("search-{domain_name}-mock.us-east-1.es.amazonaws.com"),
            processing: false,
            elasticsearch_cluster_config: ClusterConfig {
                instance_type: Some("r5.large.elasticsearch".to_string()),
                instance_count: slaves,
                dedicated_master_enabled: masters > 0,
                dedicated_master_count: masters,
            },
            ebs_options: EbsOptions {
                ebs_enabled: true,
                volume_type: Some("gp2".to_string()),
                volume_size: volume_size_gb,
            },
        };
        Self::with_status(status)
    }

    pub fn with_status(status: DomainStatus) -> Self {
        Self {
            status: RwLock::new(status),
            used_gb: RwLock::new(0.0),
            describe_failures: AtomicU32::new(0),
            metrics_failures: AtomicU32::new(0),
            apply_fail: AtomicBool::new(false),
            describe_count: AtomicU64::new(0),
            metrics_count: AtomicU64::new(0),
            apply_count: AtomicU64::new(0),
            last_window: RwLock::new(None),
        }
    }

    pub fn with_used_gb(self, used_gb: f64) -> Self {
        *self.used_gb.write() = used_gb;
        self
    }

    pub fn set_used_gb(&self, used_gb: f64) {
        *self.used_gb.write() = used_gb;
    }

    pub fn set_endpoint(&self, endpoint: &str) {
        self.status.write().endpoint = endpoint.to_string();
    }

    /// The next `times` describe calls fail with a transient error.
    pub fn fail_describe(&self, times: u32) {
        self.describe_failures.store(times, Ordering::SeqCst);
    }

    /// The next `times` metric fetches fail with a transient error.
    pub fn fail_metrics(&self, times: u32) {
        self.metrics_failures.store(times, Ordering::SeqCst);
    }

    pub fn set_apply_fail(&self, fail: bool) {
        self.apply_fail.store(fail, Ordering::SeqCst);
    }

    pub fn instance_count(&self) -> u32 {
        self.status.read().slave_count()
    }

    pub fn describe_count(&self) -> u64 {
        self.describe_count.load(Ordering::Relaxed)
    }

    pub fn metrics_count(&self) -> u64 {
        self.metrics_count.load(Ordering::Relaxed)
    }

    pub fn apply_count(&self) -> u64 {
        self.apply_count.load(Ordering::Relaxed)
    }

    pub fn last_window(&self) -> Option<Duration> {
        *self.last_window.read()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_domain(&self, domain_name: &str) -> Result<()> {
        if self.status.read().domain_name != domain_name {
            return Err(DomainError::domain_not_found(domain_name));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterDescriptor for MockDomain {
    async fn describe(&self, domain_name: &str) -> Result<DomainStatus> {
        self.describe_count.fetch_add(1, Ordering::Relaxed);
        if Self::take_failure(&self.describe_failures) {
            return Err(DomainError::unavailable("describe throttled"));
        }
        self.check_domain(domain_name)?;
        Ok(self.status.read().clone())
    }
}

#[async_trait]
impl MetricsProvider for MockDomain {
    async fn get_used_storage(
        &self,
        domain_name: &str,
        _client_id: &str,
        window: Duration,
    ) -> Result<StorageUsage> {
        self.metrics_count.fetch_add(1, Ordering::Relaxed);
        *self.last_window.write() = Some(window);
        if Self::take_failure(&self.metrics_failures) {
            return Err(DomainError::unavailable("metrics endpoint timed out"));
        }
        self.check_domain(domain_name)?;
        Ok(StorageUsage::new(*self.used_gb.read()))
    }
}

#[async_trait]
impl ClusterMutator for MockDomain {
    async fn apply(&self, domain_name: &str, target_nodes: u32) -> Result<ConfigUpdate> {
        self.apply_count.fetch_add(1, Ordering::Relaxed);
        if self.apply_fail.load(Ordering::SeqCst) {
            return Err(DomainError::update_failed("update rejected"));
        }
        self.check_domain(domain_name)?;

        let mut status = self.status.write();
        let previous_instance_count = status.elasticsearch_cluster_config.instance_count;
        status.elasticsearch_cluster_config.instance_count = target_nodes;

        Ok(ConfigUpdate {
            domain_name: domain_name.to_string(),
            previous_instance_count,
            requested_instance_count: target_nodes,
        })
    }
}
