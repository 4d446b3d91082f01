//! Integration tests for cron scheduling and graceful shutdown
//!
//! These tests verify that:
//! - Jobs with a valid cron expression fire and export on their own
//! - Bad cron expressions and cron-less jobs are reported, not fatal
//! - A shutdown signal stops every timer

use async_trait::async_trait;
use open_data_exporter::adapters::api::{ApiRequest, ApiTransport};
use open_data_exporter::auth::{BearerCredential, StaticTokenProvider};
use open_data_exporter::config::{parse_config, ConfigFormat};
use open_data_exporter::core::extensions::ExtensionRegistry;
use open_data_exporter::core::Exporter;
use open_data_exporter::domain::RequestError;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

#[derive(Default)]
struct CountingApi {
    calls: AtomicUsize,
}

#[async_trait]
impl ApiTransport for CountingApi {
    async fn send(&self, _request: &ApiRequest) -> Result<Value, RequestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({ "call": call }))
    }
}

fn exporter(out_dir: &Path, api: Arc<CountingApi>) -> Exporter {
    let raw = json!({
        "retry": { "maxRetries": 0 },
        "requests": { "ping": { "uri": "/api/v2/ping" } },
        "templates": { "pong": { "template": "call {{data.ping.call}}" } },
        "exports": {
            "pong_file": {
                "type": "file",
                "source": "pong",
                "destination": out_dir,
                "filename": "pong-{{run.id}}.txt"
            }
        },
        "jobs": {
            "every_second": {
                "cron": "* * * * * *",
                "requests": ["ping"],
                "templates": ["pong"],
                "exports": ["pong_file"]
            },
            "nightly": { "cron": "0 0 2 * * *", "requests": ["ping"] },
            "bad_cron": { "cron": "whenever", "requests": ["ping"] },
            "manual": { "requests": ["ping"] }
        }
    });
    let config = parse_config(&raw.to_string(), ConfigFormat::Json).unwrap();
    config.validate().unwrap();

    let tokens = Arc::new(StaticTokenProvider::new(BearerCredential::new("t")));
    Exporter::new(config, api, tokens, ExtensionRegistry::new()).unwrap()
}

fn exported_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_schedule_report() {
    let temp = TempDir::new().unwrap();
    let exporter = exporter(temp.path(), Arc::new(CountingApi::default()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (scheduler, report) = exporter.schedule(&[], shutdown_rx);

    assert_eq!(
        report.scheduled,
        vec!["every_second".to_string(), "nightly".to_string()]
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "bad_cron");
    assert_eq!(report.on_demand, vec!["manual".to_string()]);
    assert_eq!(scheduler.timer_count(), 2);

    shutdown_tx.send(true).unwrap();
    scheduler.join().await;
}

#[tokio::test]
async fn test_scheduled_job_fires_and_exports() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(CountingApi::default());
    let exporter = exporter(temp.path(), api.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (scheduler, _) = exporter.schedule(&["every_second".to_string()], shutdown_rx);

    let mut fired = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if exported_files(temp.path()) > 0 {
            fired = true;
            break;
        }
    }

    shutdown_tx.send(true).unwrap();
    scheduler.join().await;

    assert!(fired, "scheduled job never exported");
    assert!(api.calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_shutdown_stops_all_timers() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(CountingApi::default());
    let exporter = exporter(temp.path(), api.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (scheduler, _) = exporter.schedule(&["nightly".to_string()], shutdown_rx);
    assert_eq!(scheduler.timer_count(), 1);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), scheduler.join())
        .await
        .expect("timers did not stop after shutdown");

    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shutdown_signal_propagation() {
    let (shutdown_tx, shutdown_rx1) = watch::channel(false);
    let shutdown_rx2 = shutdown_rx1.clone();

    assert!(!*shutdown_rx1.borrow());
    assert!(!*shutdown_rx2.borrow());

    shutdown_tx.send(true).unwrap();

    assert!(*shutdown_rx1.borrow());
    assert!(*shutdown_rx2.borrow());
}
