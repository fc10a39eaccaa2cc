use std::sync::Arc;
use std::time::Duration;

use esscale_domain::{
    current_timestamp_millis, Autoscaler, AutoscalerConfig, ClusterDescriptor, ClusterMutator,
    Datapoint, DomainError, DomainSnapshot, DomainStatus, MetricsProvider, RetryConfig,
    SnapshotBackend, StorageUnit, USED_SPACE_METRIC,
};
use tempfile::TempDir;

const DOMAIN_STATUS: &str = r#"{
    "DomainId": "123456789012/logs",
    "DomainName": "logs",
    "Endpoint": "search-logs-abc123.us-east-1.es.amazonaws.com",
    "ElasticsearchClusterConfig": {
        "InstanceType": "r5.large.elasticsearch",
        "InstanceCount": 12,
        "DedicatedMasterEnabled": true,
        "DedicatedMasterCount": 3
    },
    "EBSOptions": { "EBSEnabled": true, "VolumeType": "gp2", "VolumeSize": 100 }
}"#;

fn snapshot_with_usage(used_mb: &[f64]) -> DomainSnapshot {
    let status: DomainStatus = serde_json::from_str(DOMAIN_STATUS).unwrap();
    let mut snapshot = DomainSnapshot::new(status);
    let now = current_timestamp_millis();
    for (i, mb) in used_mb.iter().enumerate() {
        snapshot.push_datapoint(
            USED_SPACE_METRIC,
            Datapoint {
                timestamp: now - (i as u64) * 30_000,
                average: *mb,
                unit: StorageUnit::Megabytes,
            },
        );
    }
    snapshot
}

async fn write_backend(dir: &TempDir, snapshot: &DomainSnapshot) -> Arc<SnapshotBackend> {
    let backend = Arc::new(SnapshotBackend::new(dir.path().join("domain.json")));
    backend.store(snapshot).await.unwrap();
    backend
}

fn config(configure: bool) -> AutoscalerConfig {
    let mut config = AutoscalerConfig::new("logs");
    config.configure = configure;
    config.retry = RetryConfig::no_retry();
    config
}

#[tokio::test]
async fn test_describe_reads_snapshot() {
    let dir = TempDir::new().unwrap();
    let backend = write_backend(&dir, &snapshot_with_usage(&[1024.0])).await;

    let status = backend.describe("logs").await.unwrap();
    assert_eq!(status.slave_count(), 12);
    assert_eq!(status.master_count(), 3);

    let err = backend.describe("other").await.unwrap_err();
    assert!(matches!(err, DomainError::DomainNotFound(_)));
}

#[tokio::test]
async fn test_used_storage_is_windowed_average_in_gb() {
    let dir = TempDir::new().unwrap();
    let backend = write_backend(&dir, &snapshot_with_usage(&[2048.0 * 1024.0, 3072.0 * 1024.0])).await;

    let usage = backend
        .get_used_storage("logs", "123456789012", Duration::from_secs(300))
        .await
        .unwrap();
    assert_eq!(usage.used_gb, 2560.0);
}

#[tokio::test]
async fn test_missing_datapoints() {
    let dir = TempDir::new().unwrap();
    let backend = write_backend(&dir, &snapshot_with_usage(&[])).await;

    let err = backend
        .get_used_storage("logs", "123456789012", Duration::from_secs(300))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NoDatapoints { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_wrong_client_id() {
    let dir = TempDir::new().unwrap();
    let backend = write_backend(&dir, &snapshot_with_usage(&[1.0])).await;

    let err = backend
        .get_used_storage("logs", "999999999999", Duration::from_secs(300))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DomainNotFound(_)));
}

#[tokio::test]
async fn test_missing_snapshot_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let backend = SnapshotBackend::new(dir.path().join("absent.json"));

    let err = backend.describe("logs").await.unwrap_err();
    assert!(matches!(err, DomainError::CollaboratorUnavailable(_)));
}

#[tokio::test]
async fn test_apply_rewrites_instance_count() {
    let dir = TempDir::new().unwrap();
    let backend = write_backend(&dir, &snapshot_with_usage(&[1024.0])).await;

    let update = backend.apply("logs", 20).await.unwrap();
    assert_eq!(update.previous_instance_count, 12);
    assert_eq!(update.requested_instance_count, 20);

    let reloaded = backend.load().await.unwrap();
    assert_eq!(reloaded.domain_status.slave_count(), 20);
    assert_eq!(reloaded.metrics[USED_SPACE_METRIC].len(), 1);
    assert!(!dir.path().join("domain.json.tmp").exists());
}

#[tokio::test]
async fn test_dry_run_leaves_snapshot_untouched() {
    let dir = TempDir::new().unwrap();
    // 4,000 GB used at 100 GB per node.
    let backend = write_backend(&dir, &snapshot_with_usage(&[4000.0 * 1024.0])).await;
    let before = std::fs::read(backend.path()).unwrap();

    let scaler = Autoscaler::with_backend(config(false), backend.clone());
    let outcome = scaler.run().await.unwrap();

    assert!(outcome.update.is_none());
    let decision = outcome.evaluation.decision;
    assert_eq!(decision.required_nodes, 40);
    assert_eq!(decision.headroom_nodes, 12);
    assert_eq!(decision.required_with_headroom, 52);
    assert_eq!(decision.target_nodes, 50);
    assert_eq!(std::fs::read(backend.path()).unwrap(), before);
}

#[tokio::test]
async fn test_configure_run_persists_target() {
    let dir = TempDir::new().unwrap();
    let backend = write_backend(&dir, &snapshot_with_usage(&[250.0 * 1024.0])).await;

    let scaler = Autoscaler::with_backend(config(true), backend.clone());
    let outcome = scaler.run().await.unwrap();

    assert_eq!(outcome.evaluation.decision.target_nodes, 5);
    let update = outcome.update.unwrap();
    assert_eq!(update.previous_instance_count, 12);
    assert_eq!(update.requested_instance_count, 5);

    let second = scaler.evaluate().await.unwrap();
    assert_eq!(second.shape.slave_count, 5);
    assert!(!second.needs_change());
}

#[tokio::test]
async fn test_failed_store_removes_temp_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("domain.json");
    // A directory in place of the snapshot makes the final rename fail.
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep"), b"x").unwrap();
    let backend = SnapshotBackend::new(&target);

    let err = backend.store(&snapshot_with_usage(&[1.0])).await.unwrap_err();
    assert!(matches!(err, DomainError::Io(_)));
    assert!(!dir.path().join("domain.json.tmp").exists());
    assert!(target.join("keep").exists());
}
