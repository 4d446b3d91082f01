//! End-to-end pipeline tests
//!
//! These tests drive the daily report-card job through the public
//! [`Exporter`] API against an in-memory analytics API and verify:
//! - Paginated requests are merged before transforms see them
//! - The report card figures reach the rendered template
//! - File exports land where the rendered destination says
//! - A failing stage aborts the run and names the stage
//! - A sink failure fails only its own job

use async_trait::async_trait;
use open_data_exporter::adapters::api::{ApiRequest, ApiTransport};
use open_data_exporter::auth::{BearerCredential, StaticTokenProvider};
use open_data_exporter::config::{parse_config, ConfigFormat, ExporterConfig};
use open_data_exporter::core::extensions::ExtensionRegistry;
use open_data_exporter::core::stages::StageKind;
use open_data_exporter::core::{Exporter, RunStatus};
use open_data_exporter::domain::{HttpMethod, RequestError};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Canned analytics API keyed by URL path
#[derive(Default)]
struct FakeAnalyticsApi {
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeAnalyticsApi {
    fn recorded(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn query_param<'a>(request: &'a ApiRequest, name: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl ApiTransport for FakeAnalyticsApi {
    async fn send(&self, request: &ApiRequest) -> Result<Value, RequestError> {
        self.requests.lock().unwrap().push(request.clone());

        if request.url.ends_with("/api/v2/routing/queues") {
            let page = match query_param(request, "pageNumber") {
                Some("1") => json!([{ "id": "q1", "name": "Sales" }]),
                Some("2") => json!([{ "id": "q2", "name": "Support" }]),
                _ => json!([]),
            };
            return Ok(json!({ "entities": page, "pageCount": 2 }));
        }

        if request.url.ends_with("/aggregates/query") {
            return Ok(json!({
                "results": [
                    {
                        "group": { "queueId": "q1", "mediaType": "voice" },
                        "data": [{ "metrics": [
                            { "metric": "nOffered", "stats": { "count": 10 } },
                            { "metric": "tAnswered", "stats": { "count": 8, "sum": 160 } },
                            { "metric": "tAbandon", "stats": { "count": 2, "sum": 30 } },
                            { "metric": "oServiceLevel", "stats": {
                                "ratio": 0.75, "numerator": 6, "denominator": 8
                            } }
                        ] }]
                    },
                    {
                        "group": { "queueId": "q2", "mediaType": "voice" },
                        "data": [{ "metrics": [
                            { "metric": "nOffered", "stats": { "count": 5 } },
                            { "metric": "tAnswered", "stats": { "count": 5, "sum": 50 } },
                            { "metric": "oServiceLevel", "stats": {
                                "ratio": 1, "numerator": 5, "denominator": 5
                            } }
                        ] }]
                    }
                ]
            }));
        }

        if request.url.ends_with("/details/query") {
            return Ok(json!({
                "conversations": [{
                    "conversationId": "c-1",
                    "conversationStart": "2024-02-29T13:00:00.000Z",
                    "participants": [
                        {
                            "purpose": "customer",
                            "sessions": [
                                { "ani": "tel:+15550100", "dnis": "" },
                                { "ani": "", "dnis": "tel:+18005550199" }
                            ]
                        },
                        { "purpose": "acd", "participantName": "Sales" }
                    ]
                }],
                "totalHits": 1
            }));
        }

        Err(RequestError::from_status(500, "boom"))
    }
}

fn report_card_config(out_dir: &Path) -> ExporterConfig {
    let raw = json!({
        "pureCloud": { "environment": "mypurecloud.test" },
        "retry": { "maxRetries": 0 },
        "requests": {
            "get_queues": {
                "type": "GET",
                "uri": "/api/v2/routing/queues",
                "pagination": { "type": "pageNumber", "pageSize": 1 }
            },
            "daily_voice_queue_agg": {
                "type": "POST",
                "uri": "/api/v2/analytics/conversations/aggregates/query",
                "body": { "interval": "{{dates.yesterdayInterval}}", "groupBy": ["queueId"] }
            },
            "daily_abandons_detail": {
                "type": "POST",
                "uri": "/api/v2/analytics/conversations/details/query",
                "body": { "interval": "{{dates.yesterdayInterval}}" },
                "pagination": { "type": "bodyPaging", "pageSize": 100 }
            },
            "flaky": { "uri": "/api/v2/unavailable" }
        },
        "transforms": {
            "report_card": {
                "type": "extension",
                "extension": "daily_conversation_report_card",
                "function": "prepareReport"
            }
        },
        "templates": {
            "card": {
                "template": "{{customData.title}}|{{data.report.totals.offered}}|{{data.report.totals.abandonRatePercent}}|{{#each data.report.worstQueues}}{{this.name}}:{{this.serviceLevelPercent}};{{/each}}|{{#each data.report.recentAbandons}}{{this.queueName}} {{this.ani}} {{this.dnis}}{{/each}}"
            },
            "card_json": {
                "template": "{\"offered\": {{data.report.totals.offered}}, \"job\": \"{{job.key}}\"}",
                "format": "json"
            }
        },
        "exports": {
            "card_file": {
                "type": "file",
                "source": "card",
                "destination": out_dir,
                "filename": "card-{{job.key}}.txt"
            },
            "card_json_file": {
                "type": "file",
                "source": "card_json",
                "destination": out_dir
            }
        },
        "customData": { "title": "Report Card" },
        "jobs": {
            "daily_report_card": {
                "name": "Daily Report Card",
                "cron": "0 0 6 * * *",
                "requests": ["get_queues", "daily_voice_queue_agg", "daily_abandons_detail"],
                "transforms": ["report_card"],
                "templates": ["card", "card_json"],
                "exports": ["card_file", "card_json_file"]
            },
            "broken": {
                "requests": ["get_queues", "flaky"],
                "templates": ["card"],
                "exports": ["card_file"]
            }
        }
    });
    let config = parse_config(&raw.to_string(), ConfigFormat::Json).unwrap();
    config.validate().unwrap();
    config
}

fn exporter(config: ExporterConfig, api: Arc<FakeAnalyticsApi>) -> Exporter {
    let tokens = Arc::new(StaticTokenProvider::new(
        BearerCredential::new("test-token").expiring_in(Duration::from_secs(3600)),
    ));
    Exporter::new(config, api, tokens, ExtensionRegistry::with_defaults()).unwrap()
}

#[tokio::test]
async fn test_report_card_job_end_to_end() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(FakeAnalyticsApi::default());
    let exporter = exporter(report_card_config(temp.path()), api.clone());

    let results = exporter.run_now(&["daily_report_card".to_string()]).await;
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.is_success(), "{:?}", result.failure_message());
    assert_eq!(result.job_name, "Daily Report Card");
    // 3 requests, 1 transform, 2 templates, 2 exports
    assert_eq!(result.stages.len(), 8);
    assert!(result.stages.iter().all(|s| s.ok));

    let card = std::fs::read_to_string(temp.path().join("card-daily_report_card.txt")).unwrap();
    assert_eq!(
        card,
        "Report Card|15|13.3|Sales:75;Support:100;|Sales tel:+15550100 tel:+18005550199"
    );

    let card_json: Value = serde_json::from_str(
        &std::fs::read_to_string(temp.path().join("card_json.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(card_json, json!({ "offered": 15, "job": "daily_report_card" }));
}

#[tokio::test]
async fn test_requests_carry_auth_paging_and_rendered_body() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(FakeAnalyticsApi::default());
    let exporter = exporter(report_card_config(temp.path()), api.clone());

    exporter.run_now(&["daily_report_card".to_string()]).await;

    let requests = api.recorded();
    assert_eq!(requests.len(), 4);
    assert!(requests
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer test-token")));
    assert!(requests
        .iter()
        .all(|r| r.url.starts_with("https://api.mypurecloud.test/api/v2/")));

    // Query-paged listing walks until pageCount
    assert_eq!(query_param(&requests[0], "pageNumber"), Some("1"));
    assert_eq!(query_param(&requests[1], "pageNumber"), Some("2"));

    let aggregate = &requests[2];
    assert_eq!(aggregate.method, HttpMethod::Post);
    let interval = aggregate.body.as_ref().unwrap()["interval"].as_str().unwrap();
    assert!(interval.ends_with("T00:00:00.000Z"));
    assert!(!interval.contains("{{"));

    // Body-paged details get a paging block injected
    let details = requests[3].body.as_ref().unwrap();
    assert_eq!(details["paging"], json!({ "pageSize": 100, "pageNumber": 1 }));
}

#[tokio::test]
async fn test_failed_request_aborts_run() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(FakeAnalyticsApi::default());
    let exporter = exporter(report_card_config(temp.path()), api);

    let results = exporter.run_now(&["broken".to_string()]).await;
    assert_eq!(results.len(), 1);

    match &results[0].status {
        RunStatus::Failed {
            stage_kind, stage, ..
        } => {
            assert_eq!(*stage_kind, Some(StageKind::Request));
            assert_eq!(stage.as_deref(), Some("flaky"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // Nothing after the failing request ran
    assert!(!temp.path().join("card-broken.txt").exists());
    assert!(results[0]
        .stages
        .iter()
        .all(|s| s.kind == StageKind::Request));
}

#[tokio::test]
async fn test_run_all_jobs_reports_each_outcome() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(FakeAnalyticsApi::default());
    let exporter = exporter(report_card_config(temp.path()), api);

    let results = exporter.run_now(&[]).await;
    let outcomes: Vec<(&str, bool)> = results
        .iter()
        .map(|r| (r.job_key.as_str(), r.is_success()))
        .collect();
    assert_eq!(outcomes, vec![("broken", false), ("daily_report_card", true)]);
}

#[tokio::test]
async fn test_sink_failure_fails_only_its_job() {
    let temp = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let webhook = server
        .mock("POST", "/hooks/queues")
        .with_status(500)
        .with_body("receiver down")
        .expect(1)
        .create_async()
        .await;

    let raw = json!({
        "pureCloud": { "environment": "mypurecloud.test" },
        "retry": { "maxRetries": 0 },
        "requests": {
            "get_queues": {
                "uri": "/api/v2/routing/queues",
                "pagination": { "type": "pageNumber", "pageSize": 1 }
            }
        },
        "templates": {
            "names": { "template": "{{#each data.get_queues.entities}}{{this.name}};{{/each}}" }
        },
        "exports": {
            "names_file": {
                "type": "file",
                "source": "names",
                "destination": temp.path(),
                "filename": "names.txt"
            },
            "names_webhook": {
                "type": "http",
                "source": "names",
                "url": format!("{}/hooks/queues", server.url())
            }
        },
        "jobs": {
            "to_file": {
                "requests": ["get_queues"],
                "templates": ["names"],
                "exports": ["names_file"]
            },
            "to_webhook": {
                "requests": ["get_queues"],
                "templates": ["names"],
                "exports": ["names_webhook"]
            }
        }
    });
    let config = parse_config(&raw.to_string(), ConfigFormat::Json).unwrap();
    config.validate().unwrap();
    let exporter = exporter(config, Arc::new(FakeAnalyticsApi::default()));

    let results = exporter.run_now(&[]).await;
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].job_key, "to_file");
    assert!(results[0].is_success(), "{:?}", results[0].failure_message());
    assert_eq!(
        std::fs::read_to_string(temp.path().join("names.txt")).unwrap(),
        "Sales;Support;"
    );

    assert_eq!(results[1].job_key, "to_webhook");
    match &results[1].status {
        RunStatus::Failed {
            stage_kind,
            stage,
            error,
        } => {
            assert_eq!(*stage_kind, Some(StageKind::Export));
            assert_eq!(stage.as_deref(), Some("names_webhook"));
            assert!(error.contains("500"), "{error}");
        }
        other => panic!("expected export failure, got {other:?}"),
    }

    webhook.assert_async().await;
}

#[tokio::test]
async fn test_unknown_job_keys_are_skipped() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(FakeAnalyticsApi::default());
    let exporter = exporter(report_card_config(temp.path()), api.clone());

    let results = exporter.run_now(&["does_not_exist".to_string()]).await;
    assert!(results.is_empty());
    assert!(api.recorded().is_empty());
}

#[tokio::test]
async fn test_trigger_then_poll_until_complete() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(FakeAnalyticsApi::default());
    let exporter = exporter(report_card_config(temp.path()), api);

    let handle = exporter.trigger(&["daily_report_card".to_string()]);
    assert_eq!(handle.job_keys, vec!["daily_report_card".to_string()]);

    let mut complete = false;
    for _ in 0..100 {
        if exporter.poll(&handle.run_id).complete {
            complete = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(complete, "triggered batch never completed");
    assert!(temp.path().join("card-daily_report_card.txt").exists());
}

#[test]
fn test_list_jobs() {
    let temp = TempDir::new().unwrap();
    let config = report_card_config(temp.path());
    let api = Arc::new(FakeAnalyticsApi::default());

    let exporter = exporter(config, api);
    let listing: Vec<String> = exporter.list_jobs().iter().map(|j| j.to_string()).collect();
    assert_eq!(
        listing,
        vec![
            "broken | no-cron | broken".to_string(),
            "daily_report_card | 0 0 6 * * * | Daily Report Card".to_string(),
        ]
    );
}
