//! Storage-driven target node count for an Elasticsearch data tier.
//!
//! The policy is a pure function: it takes the cluster shape, the storage in
//! use and the operator's scaling parameters, and returns how many data nodes
//! the cluster should run. Fetching those inputs and applying the result are
//! left to the caller.

mod error;
mod policy;

pub use error::{PolicyError, Result};
pub use policy::{
    compute_target, ClusterShape, ScalingDecision, ScalingParameters, StorageUsage,
    DEFAULT_HEADROOM_FRACTION, DEFAULT_MAX_NODES, DEFAULT_MIN_NODES, MEGABYTES_PER_GIGABYTE,
};
