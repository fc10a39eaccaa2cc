use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

pub const DEFAULT_HEADROOM_FRACTION: f64 = 0.30;
pub const DEFAULT_MIN_NODES: u32 = 5;
pub const DEFAULT_MAX_NODES: u32 = 50;

pub const MEGABYTES_PER_GIGABYTE: f64 = 1024.0;

/// Point-in-time view of the cluster's node layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterShape {
    /// Data nodes. This is the count the policy resizes.
    pub slave_count: u32,
    /// Dedicated masters, reported but never scaled.
    pub master_count: u32,
    /// Disk attached to each data node, in GB.
    pub per_node_capacity_gb: f64,
}

impl ClusterShape {
    pub fn new(slave_count: u32, master_count: u32, per_node_capacity_gb: f64) -> Self {
        Self {
            slave_count,
            master_count,
            per_node_capacity_gb,
        }
    }

    pub fn total_nodes(&self) -> u32 {
        self.slave_count.saturating_add(self.master_count)
    }

    pub fn total_capacity_gb(&self) -> f64 {
        self.slave_count as f64 * self.per_node_capacity_gb
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.per_node_capacity_gb.is_finite() && self.per_node_capacity_gb > 0.0) {
            return Err(PolicyError::invalid_configuration(
                "per_node_capacity_gb",
                self.per_node_capacity_gb,
                "must be a positive finite number",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used_gb: f64,
}

impl StorageUsage {
    pub fn new(used_gb: f64) -> Self {
        Self { used_gb }
    }

    /// The storage metric is published in megabytes.
    pub fn from_megabytes(used_mb: f64) -> Self {
        Self {
            used_gb: used_mb / MEGABYTES_PER_GIGABYTE,
        }
    }

    pub fn available_gb(&self, shape: &ClusterShape) -> f64 {
        shape.total_capacity_gb() - self.used_gb
    }

    pub fn validate(&self) -> Result<()> {
        // Infinity is accepted: it saturates and then clamps to max_nodes.
        if self.used_gb.is_nan() || self.used_gb < 0.0 {
            return Err(PolicyError::invalid_configuration(
                "used_gb",
                self.used_gb,
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingParameters {
    /// Fraction of the required nodes added on top for growth and shard skew.
    pub headroom_fraction: f64,
    pub min_nodes: u32,
    pub max_nodes: u32,
}

impl Default for ScalingParameters {
    fn default() -> Self {
        Self {
            headroom_fraction: DEFAULT_HEADROOM_FRACTION,
            min_nodes: DEFAULT_MIN_NODES,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl ScalingParameters {
    pub fn new(headroom_fraction: f64, min_nodes: u32, max_nodes: u32) -> Self {
        Self {
            headroom_fraction,
            min_nodes,
            max_nodes,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.headroom_fraction.is_finite() && self.headroom_fraction >= 0.0) {
            return Err(PolicyError::invalid_configuration(
                "headroom_fraction",
                self.headroom_fraction,
                "must be a non-negative finite number",
            ));
        }

        if self.min_nodes == 0 {
            return Err(PolicyError::invalid_configuration(
                "min_nodes",
                self.min_nodes,
                "must be greater than 0",
            ));
        }

        if self.max_nodes == 0 {
            return Err(PolicyError::invalid_configuration(
                "max_nodes",
                self.max_nodes,
                "must be greater than 0",
            ));
        }

        if self.min_nodes > self.max_nodes {
            return Err(PolicyError::invalid_configuration(
                "min_nodes",
                self.min_nodes,
                "must not exceed max_nodes",
            ));
        }

        Ok(())
    }
}

/// Result of one policy evaluation.
///
/// Every intermediate value is kept so callers can report how the target was
/// reached without recomputing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingDecision {
    /// Nodes needed to hold the used storage at the per-node capacity.
    pub required_nodes: u64,
    pub headroom_nodes: u64,
    pub required_with_headroom: u64,
    /// `required_with_headroom` clamped into `[min_nodes, max_nodes]`.
    pub target_nodes: u32,
}

impl ScalingDecision {
    /// True when the ceiling withheld nodes the storage actually calls for.
    pub fn is_capped(&self) -> bool {
        self.required_with_headroom > self.target_nodes as u64
    }

    /// True when the floor raised the target above what storage requires.
    pub fn is_floored(&self) -> bool {
        self.required_with_headroom < self.target_nodes as u64
    }

    pub fn delta(&self, current_slaves: u32) -> i64 {
        self.target_nodes as i64 - current_slaves as i64
    }
}

/// Computes the target data node count for the given storage usage.
///
/// Headroom is rounded up on its own before being added to the requirement,
/// so `ceil(required * fraction) + required` rather than
/// `ceil(required * (1 + fraction))`. The two differ for some fractions and
/// the former is what operators already see in reports.
pub fn compute_target(
    shape: ClusterShape,
    usage: StorageUsage,
    params: ScalingParameters,
) -> Result<ScalingDecision> {
    params.validate()?;
    shape.validate()?;
    usage.validate()?;

    let required_nodes = ceil_nodes(usage.used_gb / shape.per_node_capacity_gb);
    let headroom_nodes = ceil_nodes(required_nodes as f64 * params.headroom_fraction);
    let required_with_headroom = required_nodes.saturating_add(headroom_nodes);

    let target_nodes = required_with_headroom
        .clamp(params.min_nodes as u64, params.max_nodes as u64) as u32;

    Ok(ScalingDecision {
        required_nodes,
        headroom_nodes,
        required_with_headroom,
        target_nodes,
    })
}

// Float to int `as` casts saturate, so huge inputs land on u64::MAX.
fn ceil_nodes(value: f64) -> u64 {
    value.ceil() as u64
}
