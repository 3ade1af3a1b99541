//! Engine call sequences against a mocked Buddy API.

use hemmer_provider_buddy::testing::{assert_plan_no_changes, ProviderTester, TestError};
use hemmer_provider_buddy::ProviderError;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn workspace_body() -> serde_json::Value {
    json!({
        "id": 42,
        "url": "https://api.buddy.works/workspaces/acme",
        "html_url": "https://app.buddy.works/acme",
        "name": "Acme",
        "domain": "acme",
        "owner_id": 7,
        "frozen": false,
        "create_date": "2024-01-02T03:04:05.000Z"
    })
}

#[tokio::test]
async fn test_workspace_create_then_import() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workspaces"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({"domain": "acme", "name": "Acme"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspace_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workspaces/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspace_body()))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let state = tester
        .apply("buddy_workspace", json!({"domain": "acme", "name": "Acme"}))
        .await
        .unwrap();
    assert_eq!(state["id"], "acme");
    assert_eq!(state["workspace_id"], 42);
    assert_eq!(state["create_date"], "2024-01-02T03:04:05Z");

    let imported = tester.import_resource("buddy_workspace", "acme").await.unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, "buddy_workspace");
    assert_eq!(imported[0].state["owner_id"], 7);
    assert_eq!(imported[0].state["html_url"], "https://app.buddy.works/acme");

    let plan = tester
        .plan_update("buddy_workspace", state, json!({"domain": "acme", "name": "Acme"}))
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_workspace_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspace_body()))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let state = tester
        .read_data_source("buddy_workspace", json!({"domain": "acme"}))
        .await
        .unwrap();
    assert_eq!(state["name"], "Acme");
}

#[tokio::test]
async fn test_domain_record_upserts() {
    let server = MockServer::start().await;
    let record_path = "/workspaces/acme/domains/app.example.com/records/A";
    Mock::given(method("PATCH"))
        .and(path(record_path))
        .and(body_json(json!({"ttl": 300, "values": ["1.2.3.4"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "app.example.com", "type": "A", "ttl": 300, "values": ["1.2.3.4"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(record_path))
        .and(body_json(json!({"ttl": 600, "values": ["1.2.3.4", "5.6.7.8"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "app.example.com", "type": "A", "ttl": 600, "values": ["1.2.3.4", "5.6.7.8"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let config = json!({
        "workspace_domain": "acme",
        "domain": "app.example.com",
        "type": "A",
        "ttl": 300,
        "value": ["1.2.3.4"]
    });
    let state = tester.apply("buddy_domain_record", config).await.unwrap();
    assert_eq!(state["id"], "acme:app.example.com:A");

    let updated = tester
        .apply_update(
            "buddy_domain_record",
            state,
            json!({
                "workspace_domain": "acme",
                "domain": "app.example.com",
                "type": "A",
                "ttl": 600,
                "value": ["1.2.3.4", "5.6.7.8"]
            }),
        )
        .await
        .unwrap();
    assert_eq!(updated["ttl"], 600);
    assert_eq!(updated["value"], json!(["1.2.3.4", "5.6.7.8"]));
}

#[tokio::test]
async fn test_group_drift_removes_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/acme/groups/7"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"message": "Group not found"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/workspaces/acme/groups/7"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let state = json!({"id": "acme:7", "domain": "acme", "name": "devs", "group_id": 7});
    assert_eq!(tester.read("buddy_group", state.clone()).await.unwrap(), None);
    tester.delete("buddy_group", state).await.unwrap();
}

#[tokio::test]
async fn test_malformed_import_id() {
    let server = MockServer::start().await;
    let tester = ProviderTester::buddy(&server.uri()).await;
    let err = tester.import_resource("buddy_group", "acme").await.unwrap_err();
    assert!(matches!(err, ProviderError::Decompose(_)), "{err:?}");
}

#[tokio::test]
async fn test_api_error_surfaces_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workspaces/acme/groups"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"message": "Group name already taken"}]
        })))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let err = tester
        .apply("buddy_group", json!({"domain": "acme", "name": "devs"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Group name already taken"), "{err}");
}

#[tokio::test]
async fn test_integration_keeps_credentials() {
    let server = MockServer::start().await;
    let body = json!({
        "hash_id": "a1b2",
        "html_url": "https://app.buddy.works/acme/-/integrations/a1b2",
        "name": "droplets",
        "type": "DIGITAL_OCEAN",
        "scope": "WORKSPACE",
        "identifier": "droplets"
    });
    Mock::given(method("POST"))
        .and(path("/workspaces/acme/integrations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workspaces/acme/integrations/a1b2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let state = tester
        .apply(
            "buddy_integration",
            json!({
                "domain": "acme",
                "name": "droplets",
                "type": "DIGITAL_OCEAN",
                "scope": "WORKSPACE",
                "token": "dop_v1_secret"
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "acme:a1b2");

    let refreshed = tester.read("buddy_integration", state).await.unwrap().unwrap();
    assert_eq!(refreshed["token"], "dop_v1_secret");
    assert_eq!(refreshed["integration_id"], "a1b2");
}

#[tokio::test]
async fn test_pipeline_refs_conflict_with_events() {
    let server = MockServer::start().await;
    let tester = ProviderTester::buddy(&server.uri()).await;
    let result = tester
        .validate_resource_config(
            "buddy_pipeline",
            json!({
                "domain": "acme",
                "project_name": "backend",
                "name": "ci",
                "refs": ["main"],
                "event": [{"type": "PUSH", "refs": ["main"]}]
            }),
        )
        .await;
    match result {
        Err(TestError::Diagnostics(diagnostics)) => {
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].attribute.as_deref(), Some("refs"));
        }
        other => panic!("expected a conflict diagnostic, got {other:?}"),
    }
}

#[tokio::test]
async fn test_project_group_import() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces/acme/projects/backend/groups/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9,
            "name": "devs",
            "html_url": "https://app.buddy.works/acme/-/groups/9",
            "permission_set": {"id": 3}
        })))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let imported = tester
        .import_resource("buddy_project_group", "acme:backend:9")
        .await
        .unwrap();
    let state = &imported[0].state;
    assert_eq!(state["id"], "acme:backend:9");
    assert_eq!(state["project_name"], "backend");
    assert_eq!(state["group_id"], 9);
    assert_eq!(state["permission_id"], 3);
}

#[tokio::test]
async fn test_member_settings_failure_keeps_member() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workspaces/acme/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "email": "dev@acme.io",
            "name": "Dev",
            "html_url": "https://app.buddy.works/acme/-/people/5"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/workspaces/acme/members/5"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errors": [{"message": "boom"}]
        })))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let err = tester
        .apply(
            "buddy_member",
            json!({"domain": "acme", "email": "dev@acme.io", "admin": true}),
        )
        .await
        .unwrap_err();
    match err {
        ProviderError::Partial { state, source } => {
            assert_eq!(state["id"], "acme:5");
            assert_eq!(state["member_id"], 5);
            assert_eq!(state["admin"], false);
            assert!(source.to_string().contains("boom"), "{source}");
        }
        other => panic!("expected partial state, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sso_settings_failure_keeps_enabled_sso() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workspaces/acme/sso/enable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/workspaces/acme/sso"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"message": "bad cert"}]
        })))
        .mount(&server)
        .await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let err = tester
        .apply(
            "buddy_sso",
            json!({
                "domain": "acme",
                "type": "OIDC",
                "issuer": "https://login.acme.io",
                "client_id": "buddy",
                "client_secret": "shh"
            }),
        )
        .await
        .unwrap_err();
    match err {
        ProviderError::Partial { state, source } => {
            assert_eq!(state["id"], "acme");
            assert_eq!(state["domain"], "acme");
            assert!(state["client_secret"].is_null());
            assert!(source.to_string().contains("bad cert"), "{source}");
        }
        other => panic!("expected partial state, got {other:?}"),
    }
}
