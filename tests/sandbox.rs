//! Sandbox lifecycle waits against a mocked Buddy API.

use hemmer_provider_buddy::testing::{ProviderTester, TestError};
use hemmer_provider_buddy::ProviderError;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SANDBOX_PATH: &str = "/workspaces/acme/sandboxes/sb1";

fn sandbox(status: &str, setup_status: &str) -> Value {
    json!({
        "id": "sb1",
        "html_url": "https://app.buddy.works/acme/backend/sandboxes/sb1",
        "name": "preview",
        "identifier": "preview",
        "os": "ubuntu:24.04",
        "resources": "2x4",
        "app_type": "CMD",
        "status": status,
        "setup_status": setup_status,
        "app_status": "NONE",
        "ssh_command": "ssh preview@sandbox.buddy.works"
    })
}

fn config() -> Value {
    json!({
        "domain": "acme",
        "project_name": "backend",
        "name": "preview",
        "os": "ubuntu:24.04"
    })
}

async fn mount_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/workspaces/acme/sandboxes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("CREATING", "INPROGRESS")))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_waits_for_running() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("CREATING", "INPROGRESS")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("STARTING", "INPROGRESS")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("RUNNING", "INPROGRESS")))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let state = assert_ok!(tester.apply("buddy_sandbox", config()).await);
    assert_eq!(state["id"], "acme:backend:sb1");
    assert_eq!(state["status"], "RUNNING");
    assert_eq!(state["wait_for_running"], true);
    assert_eq!(state["ssh_command"], "ssh preview@sandbox.buddy.works");
}

#[tokio::test]
async fn test_running_timeout_writes_no_state() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("CREATING", "INPROGRESS")))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let mut config = config();
    config["wait_for_running_timeout"] = json!(1);
    let err = assert_err!(tester.apply("buddy_sandbox", config).await);
    match err {
        ProviderError::SandboxTimeout { sandbox, phase, .. } => {
            assert_eq!(sandbox, "sb1");
            assert_eq!(phase, "running");
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_setup_failure_keeps_state() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("RUNNING", "FAILED")))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let mut config = config();
    config["wait_for_configured"] = json!(true);
    let err = tester.apply("buddy_sandbox", config).await.unwrap_err();
    match err {
        ProviderError::Partial { state, source } => {
            assert_eq!(state["id"], "acme:backend:sb1");
            assert_eq!(state["status"], "RUNNING");
            assert!(matches!(*source, ProviderError::SandboxFailed { .. }), "{source:?}");
        }
        other => panic!("expected partial state, got {other:?}"),
    }
}

#[tokio::test]
async fn test_skip_running_wait() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let mut config = config();
    config["wait_for_running"] = json!(false);
    let state = tester.apply("buddy_sandbox", config).await.unwrap();
    assert_eq!(state["status"], "CREATING");
}

#[tokio::test]
async fn test_stop_cancels_wait() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("CREATING", "INPROGRESS")))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    tester.stop().await.unwrap();
    let err = tester.apply("buddy_sandbox", config()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Cancelled(_)), "{err:?}");
}

#[tokio::test]
async fn test_stopping_sandbox_is_not_stopped_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("STOPPING", "SUCCESS")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("STOPPED", "SUCCESS")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/workspaces/acme/sandboxes/sb1/stop"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"message": "Sandbox is already stopped"}]
        })))
        .expect(0)
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let state = assert_ok!(
        tester
            .apply(
                "buddy_sandbox_status",
                json!({"domain": "acme", "sandbox_id": "sb1", "status": "STOPPED"}),
            )
            .await
    );
    assert_eq!(state["id"], "acme:sb1");
    assert_eq!(state["status"], "STOPPED");
}

#[tokio::test]
async fn test_wait_timeout_has_upper_bound() {
    let server = MockServer::start().await;
    let tester = ProviderTester::buddy(&server.uri()).await;
    let mut config = config();
    config["wait_for_running_timeout"] = json!(i64::MAX);
    let err = assert_err!(tester.validate_resource_config("buddy_sandbox", config).await);
    assert!(matches!(err, TestError::Diagnostics(_)), "{err}");
}

#[tokio::test]
async fn test_huge_timeout_does_not_overflow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SANDBOX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sandbox("RUNNING", "SUCCESS")))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let planned = json!({
        "domain": "acme",
        "sandbox_id": "sb1",
        "status": "RUNNING",
        "timeout": i64::MAX
    });
    let state = assert_ok!(tester.create("buddy_sandbox_status", planned).await);
    assert_eq!(state["status"], "RUNNING");
}
