use esscale_policy::ClusterShape;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

const ENDPOINT_SUFFIX: &str = ".es.amazonaws.com";

/// The parts of a "describe domain" response the autoscaler reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainStatus {
    /// `<account-id>/<domain-name>`.
    pub domain_id: String,
    pub domain_name: String,
    pub endpoint: String,
    #[serde(default)]
    pub processing: bool,
    pub elasticsearch_cluster_config: ClusterConfig,
    #[serde(rename = "EBSOptions")]
    pub ebs_options: EbsOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    pub instance_count: u32,
    #[serde(default)]
    pub dedicated_master_enabled: bool,
    #[serde(default)]
    pub dedicated_master_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EbsOptions {
    #[serde(rename = "EBSEnabled", default = "default_true")]
    pub ebs_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    /// Per data node, in GB.
    pub volume_size: f64,
}

fn default_true() -> bool {
    true
}

impl DomainStatus {
    pub fn client_id(&self) -> Result<&str> {
        match self.domain_id.split_once('/') {
            Some((account, _)) if !account.is_empty() => Ok(account),
            _ => Err(DomainError::InvalidDomainId(self.domain_id.clone())),
        }
    }

    /// Region embedded in `<prefix>.<region>.es.amazonaws.com`.
    pub fn region(&self) -> Result<&str> {
        let invalid = || DomainError::InvalidEndpoint(self.endpoint.clone());

        let host = self.endpoint.strip_suffix(ENDPOINT_SUFFIX).ok_or_else(invalid)?;
        let (_, region) = host.split_once('.').ok_or_else(invalid)?;
        if region.is_empty() {
            return Err(invalid());
        }
        Ok(region)
    }

    pub fn slave_count(&self) -> u32 {
        self.elasticsearch_cluster_config.instance_count
    }

    pub fn master_count(&self) -> u32 {
        self.elasticsearch_cluster_config.dedicated_master_count
    }

    pub fn shape(&self) -> ClusterShape {
        ClusterShape::new(
            self.slave_count(),
            self.master_count(),
            self.ebs_options.volume_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIBE_RESPONSE: &str = r#"{
        "DomainId": "123456789012/logs",
        "DomainName": "logs",
        "Endpoint": "search-logs-abc123.us-west-2.es.amazonaws.com",
        "Processing": false,
        "ElasticsearchClusterConfig": {
            "InstanceType": "r5.large.elasticsearch",
            "InstanceCount": 12,
            "DedicatedMasterEnabled": true,
            "DedicatedMasterCount": 3
        },
        "EBSOptions": {
            "EBSEnabled": true,
            "VolumeType": "gp2",
            "VolumeSize": 512
        }
    }"#;

    fn status() -> DomainStatus {
        serde_json::from_str(DESCRIBE_RESPONSE).unwrap()
    }

    #[test]
    fn test_parse_describe_response() {
        let status = status();
        assert_eq!(status.domain_name, "logs");
        assert_eq!(status.slave_count(), 12);
        assert_eq!(status.master_count(), 3);
        assert_eq!(status.ebs_options.volume_size, 512.0);
        assert_eq!(
            status.elasticsearch_cluster_config.instance_type.as_deref(),
            Some("r5.large.elasticsearch")
        );
    }

    #[test]
    fn test_masters_default_to_zero() {
        let json = r#"{
            "DomainId": "123456789012/small",
            "DomainName": "small",
            "Endpoint": "search-small-x.eu-west-1.es.amazonaws.com",
            "ElasticsearchClusterConfig": { "InstanceCount": 2 },
            "EBSOptions": { "VolumeSize": 10 }
        }"#;
        let status: DomainStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.master_count(), 0);
        assert!(!status.processing);
        assert!(status.ebs_options.ebs_enabled);
    }

    #[test]
    fn test_client_id() {
        assert_eq!(status().client_id().unwrap(), "123456789012");

        let mut status = status();
        status.domain_id = "no-separator".to_string();
        assert!(matches!(
            status.client_id(),
            Err(DomainError::InvalidDomainId(_))
        ));
    }

    #[test]
    fn test_region_from_endpoint() {
        assert_eq!(status().region().unwrap(), "us-west-2");

        let mut status = status();
        status.endpoint = "vpc-logs-abc.ap-southeast-1.es.amazonaws.com".to_string();
        assert_eq!(status.region().unwrap(), "ap-southeast-1");
    }

    #[test]
    fn test_region_rejects_foreign_endpoint() {
        let mut status = status();
        for endpoint in [
            "localhost:9200",
            "search-logs.es.amazonaws.com",
            "search-logs..es.amazonaws.com",
        ] {
            status.endpoint = endpoint.to_string();
            assert!(
                matches!(status.region(), Err(DomainError::InvalidEndpoint(_))),
                "{endpoint} should be rejected"
            );
        }
    }

    #[test]
    fn test_shape() {
        let shape = status().shape();
        assert_eq!(shape.slave_count, 12);
        assert_eq!(shape.master_count, 3);
        assert_eq!(shape.per_node_capacity_gb, 512.0);
        assert_eq!(shape.total_nodes(), 15);
    }

    #[test]
    fn test_serialize_keeps_wire_names() {
        let value = serde_json::to_value(status()).unwrap();
        assert_eq!(value["ElasticsearchClusterConfig"]["InstanceCount"], 12);
        assert_eq!(value["EBSOptions"]["VolumeSize"], 512.0);
        assert_eq!(value["EBSOptions"]["EBSEnabled"], true);
    }
}
