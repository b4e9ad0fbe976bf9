// Archive collaborators: JSON-lines files on disk and the in-memory recorder

use hostwatch::archive::{Archive, FileKey, JsonlArchive, MemoryArchive, RetentionPolicy, Schema};
use hostwatch::chart::{KERNEL_CHARTS, Period};
use hostwatch::error::ArchiveError;
use hostwatch::models::Metric;

fn schema() -> Schema {
    Schema::gauges(&["min", "avg", "max", "loss"])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn jsonl_row_is_on_disk_when_append_returns() {
    let dir = tempfile::TempDir::new().unwrap();
    let archive = JsonlArchive::new(dir.path());
    let key = FileKey::host("", "interrupts");
    archive
        .create_if_absent(&key, &Schema::gauges(&["intr"]), &RetentionPolicy::for_step(10, 1))
        .await
        .unwrap();

    for n in 1..=500usize {
        archive.append(&key, &[Metric::Value(n as f64)]).await.unwrap();
        let data = std::fs::read_to_string(archive.data_path(&key)).unwrap();
        assert_eq!(data.lines().count(), n, "row {n} missing after append");
    }
}

#[tokio::test]
async fn jsonl_writes_schema_rows_and_chart_descriptors() {
    let dir = tempfile::TempDir::new().unwrap();
    let archive = JsonlArchive::new(dir.path().join("rrd"));
    let key = FileKey::entity("web1_", "latency", "gateway-eth0");
    let retention = RetentionPolicy::for_step(60, 2);

    archive.create_if_absent(&key, &schema(), &retention).await.unwrap();
    archive
        .append(
            &key,
            &[
                Metric::Value(1.5),
                Metric::Value(2.0),
                Metric::Value(2.5),
                Metric::Undefined,
            ],
        )
        .await
        .unwrap();
    archive
        .append(&key, &[Metric::Value(1.0); 4])
        .await
        .unwrap();

    let data = std::fs::read_to_string(archive.data_path(&key)).unwrap();
    let lines: Vec<serde_json::Value> = data
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["values"][0], 1.5);
    assert_eq!(lines[0]["values"][3], "U");
    assert!(lines[0]["ts"].as_f64().unwrap() > 0.0);

    let schema_file: serde_json::Value =
        serde_json::from_slice(&std::fs::read(archive.schema_path(&key)).unwrap()).unwrap();
    assert_eq!(schema_file["key"], "web1_latency_gateway-eth0");
    assert_eq!(schema_file["retention"]["heartbeat_secs"], 120);

    archive
        .render_chart(&key, Period::Week, &KERNEL_CHARTS[0])
        .await
        .unwrap();
    let chart: serde_json::Value =
        serde_json::from_slice(&std::fs::read(archive.chart_path(&key, Period::Week)).unwrap())
            .unwrap();
    assert_eq!(chart["period"], "week");
    assert_eq!(chart["span_secs"], 7 * 86_400);
}

#[tokio::test]
async fn jsonl_keeps_existing_schema_across_restarts() {
    let dir = tempfile::TempDir::new().unwrap();
    let key = FileKey::host("", "interrupts");
    let retention = RetentionPolicy::for_step(60, 1);
    let one = Schema::gauges(&["total"]);

    JsonlArchive::new(dir.path())
        .create_if_absent(&key, &one, &retention)
        .await
        .unwrap();

    let restarted = JsonlArchive::new(dir.path());
    restarted.create_if_absent(&key, &one, &retention).await.unwrap();
    restarted.append(&key, &[Metric::Value(3.0)]).await.unwrap();

    let err = JsonlArchive::new(dir.path())
        .create_if_absent(&key, &Schema::gauges(&["total", "extra"]), &retention)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::SchemaMismatch {
            expected: 1,
            got: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn jsonl_rejects_unknown_key_and_wrong_arity() {
    let dir = tempfile::TempDir::new().unwrap();
    let archive = JsonlArchive::new(dir.path());
    let key = FileKey::host("", "system");

    let err = archive.append(&key, &[Metric::Value(1.0)]).await.unwrap_err();
    assert!(matches!(err, ArchiveError::UnknownKey { .. }));

    archive
        .create_if_absent(&key, &schema(), &RetentionPolicy::for_step(60, 1))
        .await
        .unwrap();
    let err = archive.append(&key, &[Metric::Value(1.0)]).await.unwrap_err();
    assert!(matches!(err, ArchiveError::SchemaMismatch { .. }));
    assert!(!archive.data_path(&key).exists());
}

#[tokio::test]
async fn memory_archive_records_in_order() {
    let archive = MemoryArchive::new();
    let a = FileKey::host("", "a");
    let b = FileKey::host("", "b");
    let retention = RetentionPolicy::for_step(30, 1);
    let one = Schema::gauges(&["x"]);

    archive.create_if_absent(&a, &one, &retention).await.unwrap();
    archive.create_if_absent(&b, &one, &retention).await.unwrap();
    archive.create_if_absent(&a, &one, &retention).await.unwrap();
    archive.append(&a, &[Metric::Value(1.0)]).await.unwrap();
    archive.append(&b, &[Metric::Value(2.0)]).await.unwrap();
    archive.append(&a, &[Metric::Undefined]).await.unwrap();

    assert_eq!(archive.create_calls(), 3);
    assert_eq!(archive.keys(), vec![a.clone(), b.clone()]);
    assert_eq!(
        archive.rows_for(&a),
        vec![vec![Metric::Value(1.0)], vec![Metric::Undefined]]
    );
    assert_eq!(archive.retention(&b).unwrap().heartbeat_secs, 60);
    assert!(archive.append(&FileKey::host("", "c"), &[]).await.is_err());
}
