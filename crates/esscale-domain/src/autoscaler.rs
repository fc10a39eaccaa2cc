use std::future::Future;
use std::sync::Arc;

use esscale_policy::{compute_target, ClusterShape, ScalingDecision, StorageUsage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AutoscalerConfig;
use crate::error::Result;
use crate::metrics::AutoscalerMetrics;
use crate::status::DomainStatus;
use crate::traits::{ClusterDescriptor, ClusterMutator, ConfigUpdate, MetricsProvider};

/// Everything one evaluation observed and decided.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub domain: DomainStatus,
    pub shape: ClusterShape,
    pub usage: StorageUsage,
    pub decision: ScalingDecision,
}

impl Evaluation {
    pub fn total_capacity_gb(&self) -> f64 {
        self.shape.total_capacity_gb()
    }

    pub fn available_gb(&self) -> f64 {
        self.usage.available_gb(&self.shape)
    }

    pub fn needs_change(&self) -> bool {
        self.decision.delta(self.shape.slave_count) != 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub evaluation: Evaluation,
    /// Present only when the run was configured to apply.
    pub update: Option<ConfigUpdate>,
}

/// How the configured region compares with the endpoint's. Informational.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RegionCheck {
    Matches,
    Mismatch(String),
    Unknown,
}

pub struct Autoscaler {
    config: AutoscalerConfig,
    descriptor: Arc<dyn ClusterDescriptor>,
    metrics_provider: Arc<dyn MetricsProvider>,
    mutator: Arc<dyn ClusterMutator>,
    metrics: AutoscalerMetrics,
}

impl Autoscaler {
    pub fn new(
        config: AutoscalerConfig,
        descriptor: Arc<dyn ClusterDescriptor>,
        metrics_provider: Arc<dyn MetricsProvider>,
        mutator: Arc<dyn ClusterMutator>,
    ) -> Self {
        let metrics = AutoscalerMetrics::new(config.domain_name.clone());
        Self {
            config,
            descriptor,
            metrics_provider,
            mutator,
            metrics,
        }
    }

    /// Wires one backend in as all three collaborators.
    pub fn with_backend<B>(config: AutoscalerConfig, backend: Arc<B>) -> Self
    where
        B: ClusterDescriptor + MetricsProvider + ClusterMutator + 'static,
    {
        Self::new(config, backend.clone(), backend.clone(), backend)
    }

    pub fn config(&self) -> &AutoscalerConfig {
        &self.config
    }

    /// Reads the domain and its storage and computes a decision. Never
    /// changes the cluster.
    pub async fn evaluate(&self) -> Result<Evaluation> {
        self.config.params.validate()?;

        let domain_name = self.config.domain_name.as_str();

        let domain = self
            .with_retry("describe", || self.descriptor.describe(domain_name))
            .await?;
        match self.check_region(&domain) {
            RegionCheck::Matches => {}
            RegionCheck::Mismatch(endpoint_region) => warn!(
                domain = domain_name,
                configured = %self.config.region,
                endpoint = %endpoint_region,
                "configured region differs from the domain endpoint"
            ),
            RegionCheck::Unknown => debug!(
                domain = domain_name,
                endpoint = %domain.endpoint,
                "could not derive region from endpoint"
            ),
        }

        let client_id = domain.client_id()?.to_string();
        let window = self.config.metrics_window;
        let usage = self
            .with_retry("metrics", || {
                self.metrics_provider
                    .get_used_storage(domain_name, &client_id, window)
            })
            .await?;

        let shape = domain.shape();
        let decision = compute_target(shape, usage, self.config.params)?;

        debug!(
            domain = domain_name,
            used_gb = usage.used_gb,
            required = decision.required_nodes,
            with_headroom = decision.required_with_headroom,
            target = decision.target_nodes,
            "computed scaling decision"
        );

        if decision.is_capped() {
            warn!(
                domain = domain_name,
                needed = decision.required_with_headroom,
                max_nodes = self.config.params.max_nodes,
                "storage needs more data nodes than max_nodes allows"
            );
        }

        self.metrics
            .record_evaluation(shape.slave_count, &usage, &decision);

        Ok(Evaluation {
            domain,
            shape,
            usage,
            decision,
        })
    }

    /// Requests the evaluated target node count. Not retried.
    pub async fn apply(&self, evaluation: &Evaluation) -> Result<ConfigUpdate> {
        let domain_name = self.config.domain_name.as_str();
        let target = evaluation.decision.target_nodes;

        if evaluation.domain.processing {
            warn!(
                domain = domain_name,
                "domain is still processing a previous change"
            );
        }

        info!(
            domain = domain_name,
            from = evaluation.shape.slave_count,
            to = target,
            "requesting instance count change"
        );

        let result = self.mutator.apply(domain_name, target).await;
        self.metrics.record_apply(result.is_ok());
        result
    }

    /// Evaluates, then applies only when `configure` is set.
    pub async fn run(&self) -> Result<RunOutcome> {
        let evaluation = self.evaluate().await?;

        let update = if self.config.configure {
            Some(self.apply(&evaluation).await?)
        } else {
            info!(
                domain = %self.config.domain_name,
                target = evaluation.decision.target_nodes,
                "dry run, not applying"
            );
            None
        };

        Ok(RunOutcome { evaluation, update })
    }

    fn check_region(&self, domain: &DomainStatus) -> RegionCheck {
        match domain.region() {
            Ok(region) if region == self.config.region => RegionCheck::Matches,
            Ok(region) => RegionCheck::Mismatch(region.to_string()),
            Err(_) => RegionCheck::Unknown,
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < retry.max_attempts => {
                    let backoff = retry.compute_backoff_with_jitter(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "collaborator call failed, retrying"
                    );
                    self.metrics.record_retry(operation);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
