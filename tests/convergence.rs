//! Apply, refresh and re-plan cycles: an unchanged configuration plans no
//! changes, and editing an updatable attribute plans an in-place update.

use hemmer_provider_buddy::testing::{assert_plan_no_changes, ProviderTester};
use hemmer_provider_buddy::{BuddyProvider, PlanResult};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount(server: &MockServer, verb: &str, route: &str, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// Apply `config`, refresh twice, and check the refreshes agree with each
/// other and plan nothing against the same configuration.
async fn apply_and_refresh(
    tester: &ProviderTester<BuddyProvider>,
    resource_type: &str,
    config: Value,
) -> Value {
    let state = tester.apply(resource_type, config.clone()).await.unwrap();
    let first = tester.read(resource_type, state).await.unwrap().unwrap();
    let second = tester.read(resource_type, first.clone()).await.unwrap().unwrap();
    assert_eq!(first, second);

    let plan = tester
        .plan_update(resource_type, second.clone(), config)
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
    second
}

#[tokio::test]
async fn test_variable_value_updates_in_place() {
    let server = MockServer::start().await;
    let variable = |value: &str| {
        json!({
            "id": 11,
            "key": "API_URL",
            "value": value,
            "type": "VAR",
            "encrypted": false,
            "settable": false,
            "description": ""
        })
    };
    mount(&server, "POST", "/workspaces/acme/variables", variable("a")).await;
    mount(&server, "GET", "/workspaces/acme/variables/11", variable("a")).await;
    mount(&server, "PATCH", "/workspaces/acme/variables/11", variable("b")).await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let config = json!({"domain": "acme", "key": "API_URL", "value": "a"});
    let state = apply_and_refresh(&tester, "buddy_variable", config).await;
    assert_eq!(state["encrypted"], false);

    let config = json!({"domain": "acme", "key": "API_URL", "value": "b"});
    let plan = tester
        .plan_update("buddy_variable", state.clone(), config.clone())
        .await
        .unwrap();
    assert!(!plan.requires_replace);
    assert_eq!(changed_paths(&plan), vec!["value"]);
    assert_eq!(plan.planned_state["encrypted"], false);

    let updated = tester
        .apply_update("buddy_variable", state, config)
        .await
        .unwrap();
    assert_eq!(updated["value"], "b");
    assert_eq!(updated["variable_id"], 11);
}

#[tokio::test]
async fn test_variable_encryption_replaces() {
    let server = MockServer::start().await;
    let tester = ProviderTester::buddy(&server.uri()).await;
    let prior = json!({
        "id": "acme:11",
        "domain": "acme",
        "key": "API_URL",
        "value": "a",
        "encrypted": false,
        "settable": false,
        "variable_id": 11
    });
    let config = json!({"domain": "acme", "key": "API_URL", "value": "a", "encrypted": true});
    let plan = tester.plan_update("buddy_variable", prior, config).await.unwrap();
    assert!(plan.requires_replace);
}

#[tokio::test]
async fn test_project_rename_updates_in_place() {
    let server = MockServer::start().await;
    let project = json!({
        "name": "backend",
        "display_name": "Backend",
        "html_url": "https://app.buddy.works/acme/backend",
        "status": "ACTIVE",
        "access": "PRIVATE",
        "create_date": "2024-01-02T03:04:05Z"
    });
    mount(&server, "POST", "/workspaces/acme/projects", project.clone()).await;
    mount(&server, "GET", "/workspaces/acme/projects/backend", project).await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let config = json!({"domain": "acme", "display_name": "Backend"});
    let state = apply_and_refresh(&tester, "buddy_project", config).await;
    assert_eq!(state["id"], "acme:backend");

    let plan = tester
        .plan_update(
            "buddy_project",
            state,
            json!({"domain": "acme", "display_name": "Backend API"}),
        )
        .await
        .unwrap();
    assert!(!plan.requires_replace);
    assert!(changed_paths(&plan).contains(&"display_name"));
    assert_eq!(plan.planned_state["name"], "backend");
}

#[tokio::test]
async fn test_pipeline_rename_updates_in_place() {
    let server = MockServer::start().await;
    let pipeline = json!({
        "id": 5,
        "html_url": "https://app.buddy.works/acme/backend/pipelines/pipeline/5",
        "name": "ci",
        "identifier": "ci",
        "on": "CLICK",
        "priority": "NORMAL",
        "cpu": "X64",
        "create_date": "2024-01-02T03:04:05Z",
        "creator": {"id": 7}
    });
    mount(&server, "POST", "/workspaces/acme/projects/backend/pipelines", pipeline.clone()).await;
    mount(&server, "GET", "/workspaces/acme/projects/backend/pipelines/5", pipeline).await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let config = json!({"domain": "acme", "project_name": "backend", "name": "ci"});
    let state = apply_and_refresh(&tester, "buddy_pipeline", config).await;
    assert_eq!(state["id"], "acme:backend:5");

    let plan = tester
        .plan_update(
            "buddy_pipeline",
            state,
            json!({"domain": "acme", "project_name": "backend", "name": "build"}),
        )
        .await
        .unwrap();
    assert!(!plan.requires_replace);
    assert!(changed_paths(&plan).contains(&"name"));
    assert_eq!(plan.planned_state["pipeline_id"], 5);
}

#[tokio::test]
async fn test_sandbox_rename_updates_in_place() {
    let server = MockServer::start().await;
    let sandbox = json!({
        "id": "sb1",
        "html_url": "https://app.buddy.works/acme/backend/sandboxes/sb1",
        "name": "preview",
        "identifier": "preview",
        "os": "ubuntu:24.04",
        "resources": "2x4",
        "app_type": "CMD",
        "status": "RUNNING",
        "setup_status": "SUCCESS",
        "app_status": "NONE",
        "ssh_command": "ssh preview@sandbox.buddy.works"
    });
    mount(&server, "POST", "/workspaces/acme/sandboxes", sandbox.clone()).await;
    mount(&server, "GET", "/workspaces/acme/sandboxes/sb1", sandbox).await;

    let tester = ProviderTester::buddy(&server.uri()).await;
    let config = json!({
        "domain": "acme",
        "project_name": "backend",
        "name": "preview",
        "os": "ubuntu:24.04"
    });
    let state = apply_and_refresh(&tester, "buddy_sandbox", config).await;

    let plan = tester
        .plan_update(
            "buddy_sandbox",
            state,
            json!({
                "domain": "acme",
                "project_name": "backend",
                "name": "preview-2",
                "os": "ubuntu:24.04"
            }),
        )
        .await
        .unwrap();
    assert!(!plan.requires_replace);
    assert!(changed_paths(&plan).contains(&"name"));
    assert_eq!(plan.planned_state["sandbox_id"], "sb1");
}
