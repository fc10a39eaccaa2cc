use esscale_policy::{ScalingDecision, StorageUsage};
use metrics::{counter, gauge};

pub struct AutoscalerMetrics {
    domain: String,
}

impl AutoscalerMetrics {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    fn labels(&self) -> [(&'static str, String); 1] {
        [("domain", self.domain.clone())]
    }

    pub fn record_evaluation(
        &self,
        current_slaves: u32,
        usage: &StorageUsage,
        decision: &ScalingDecision,
    ) {
        let labels = self.labels();
        counter!("esscale_evaluations_total", &labels).increment(1);
        gauge!("esscale_current_nodes", &labels).set(current_slaves as f64);
        gauge!("esscale_used_storage_gb", &labels).set(usage.used_gb);
        gauge!("esscale_required_nodes", &labels).set(decision.required_nodes as f64);
        gauge!("esscale_required_with_headroom_nodes", &labels)
            .set(decision.required_with_headroom as f64);
        gauge!("esscale_target_nodes", &labels).set(decision.target_nodes as f64);
        if decision.is_capped() {
            counter!("esscale_capped_decisions_total", &labels).increment(1);
        }
    }

    pub fn record_apply(&self, success: bool) {
        let labels = [
            ("domain", self.domain.clone()),
            ("status", if success { "ok" } else { "error" }.to_string()),
        ];
        counter!("esscale_applies_total", &labels).increment(1);
    }

    pub fn record_retry(&self, operation: &'static str) {
        let labels = [
            ("domain", self.domain.clone()),
            ("operation", operation.to_string()),
        ];
        counter!("esscale_collaborator_retries_total", &labels).increment(1);
    }
}
