use reqwest::Url;
use serde_json::json;
use stagehand::core::{ControlPlane, Credentials, ErrorCategory, HttpControlPlane};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({
            "email": "runner@example.com",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-123"
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn build_client(server: &MockServer, config_version: Option<&str>) -> HttpControlPlane {
    HttpControlPlane::new(
        Url::parse(&server.uri()).expect("invalid mock server URL"),
        Credentials {
            user: "runner@example.com".to_string(),
            password: "secret".to_string(),
        },
        config_version.map(str::to_string),
        Duration::from_secs(5),
    )
    .expect("client should build")
}

#[tokio::test]
async fn test_fetches_config_and_folder_with_one_login() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/job-1/config"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "config": {
                "threshold": "0.2",
                "workflow_name": "clustering.yml",
                "input_files": {"counts": "/data/counts.csv"}
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/job-1/folder"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "folder": "results/job-1/"
        })))
        .mount(&server)
        .await;

    let client = build_client(&server, None);
    let request = client.fetch_job_config("job-1").await.unwrap();
    assert_eq!(request.get("threshold"), Some(&json!("0.2")));
    assert_eq!(request.workflow_name(), Some("clustering.yml"));

    let folder = client.job_folder("job-1").await.unwrap();
    assert_eq!(folder, "results/job-1/");
}

#[tokio::test]
async fn test_requests_versioned_config() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/job-2/config"))
        .and(query_param("version", "v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "config": {"mode": "fast"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server, Some("v2"));
    let request = client.fetch_job_config("job-2").await.unwrap();
    assert_eq!(request.get("mode"), Some(&json!("fast")));
}

#[tokio::test]
async fn test_status_updates_carry_expected_bodies() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/jobs/job-3/running"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/jobs/job-3/completed"))
        .and(body_json(json!({
            "result_files": {"files": {"download": [{"file": "out/a.csv", "title": "A"}]}}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/jobs/job-3/failed"))
        .and(body_json(json!({"error_message": "stage fit failed with exit code 2"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server, None);
    client.set_running("job-3").await.unwrap();
    client
        .set_completed(
            "job-3",
            json!({"download": [{"file": "out/a.csv", "title": "A"}]}),
        )
        .await
        .unwrap();
    client
        .set_failed("job-3", "stage fit failed with exit code 2")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_becomes_control_plane_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/missing/config"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such job"))
        .mount(&server)
        .await;

    let client = build_client(&server, None);
    let err = client.fetch_job_config("missing").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ControlPlaneError);
    assert_eq!(err.code, "CP-003");
    assert!(err.message.contains("404"));
    assert!(err.message.contains("no such job"));
    assert_eq!(err.context.get("job_id"), Some(&"missing".to_string()));
}

#[tokio::test]
async fn test_rejected_login_fails_every_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = build_client(&server, None);
    let err = client.set_running("job-4").await.unwrap_err();
    assert_eq!(err.code, "CP-003");
    assert!(err.message.contains("/login"));
}

#[tokio::test]
async fn test_missing_config_field_is_reported() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/job-5/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"other": 1})))
        .mount(&server)
        .await;

    let client = build_client(&server, None);
    let err = client.fetch_job_config("job-5").await.unwrap_err();
    assert_eq!(err.code, "CP-004");
    assert!(err.message.contains("'config'"));
}
