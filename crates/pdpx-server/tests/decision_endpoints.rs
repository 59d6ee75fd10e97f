use std::fs;

use pdpx_server::{AppConfig, build_app};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

async fn start_server(cfg: AppConfig) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&cfg).await.expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}/policy/pdpx/v1"), tx, server)
}

fn guard_policy() -> Value {
    json!({
        "name": "guard.frequency.phoneyloop",
        "version": "1.0.0",
        "type": "onap.policies.controlloop.guard.FrequencyLimiter",
        "type_version": "1.0.0",
        "properties": {
            "actor": "foo",
            "recipe": "bar",
            "targets": ["somevnf"],
            "clname": "phoneyloop"
        }
    })
}

fn guard_request() -> Value {
    json!({
        "onapName": "usecases",
        "action": "guard",
        "resource": {
            "actor": "foo",
            "recipe": "bar",
            "target": "somevnf",
            "clname": "phoneyloop"
        }
    })
}

#[tokio::test]
async fn decision_endpoints_work() {
    let (base, shutdown_tx, handle) = start_server(AppConfig::default()).await;
    let client = reqwest::Client::new();

    // GET /healthcheck
    let resp = client.get(format!("{base}/healthcheck")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["healthy"], true);

    // Unknown action
    let resp = client
        .post(format!("{base}/decision"))
        .json(&json!({ "onapName": "usecases", "action": "foo", "resource": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["responseCode"], "BAD_REQUEST");
    assert_eq!(body["errorMessage"], "No application for action foo");

    // Deploy guard policy
    let resp = client
        .post(format!("{base}/policies"))
        .json(&guard_policy())
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["translated"], 1);

    // Guard decision
    let resp = client
        .post(format!("{base}/decision"))
        .json(&guard_request())
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "Permit");

    // Statistics reflect all of the above
    let resp = client.get(format!("{base}/statistics")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 200);
    assert_eq!(body["totalErrorCount"], 1);
    assert_eq!(body["permitDecisionsCount"], 1);
    assert_eq!(body["deploySuccessCount"], 1);
    assert_eq!(body["totalPoliciesCount"], 1);
    assert_eq!(body["applicationMetrics"]["guard"]["permit_decision_count"], 1);

    // Undeploy, then undeploy again
    let resp = client
        .delete(format!("{base}/policies/guard.frequency.phoneyloop/1.0.0"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .delete(format!("{base}/policies/guard.frequency.phoneyloop/1.0.0"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["responseCode"], "NOT_FOUND");

    // Guard with nothing deployed
    let resp = client
        .post(format!("{base}/decision"))
        .json(&guard_request())
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "NotApplicable");

    // shutdown
    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn rejected_deployments_report_errors() {
    let (base, shutdown_tx, handle) = start_server(AppConfig::default()).await;
    let client = reqwest::Client::new();

    // Unsupported policy type
    let mut unsupported = guard_policy();
    unsupported["type_version"] = json!("2.0.0");
    let resp = client
        .post(format!("{base}/policies"))
        .json(&unsupported)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Missing required field
    let mut incomplete = guard_policy();
    incomplete["properties"]
        .as_object_mut()
        .unwrap()
        .remove("actor");
    let resp = client
        .post(format!("{base}/policies"))
        .json(&incomplete)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errorDetails"][0], "field: actor");

    // Unreadable time of day
    let mut late = guard_request();
    late["currentTime"] = json!("25:99:00Z");
    let resp = client
        .post(format!("{base}/decision"))
        .json(&late)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errorDetails"][0], "field: currentTime");

    // Malformed body
    let resp = client
        .post(format!("{base}/decision"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let body: Value = client
        .get(format!("{base}/statistics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["deployFailureCount"], 2);
    assert_eq!(body["totalErrorCount"], 1);
    assert_eq!(body["totalPoliciesCount"], 0);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn configured_policies_are_deployed_at_startup() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("naming.json");
    let documents = json!([{
        "name": "SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP",
        "version": "1.0.0",
        "type": "onap.policies.Naming",
        "type_version": "1.0.0",
        "properties": { "policy-instance-name": "ONAP_NF_NAMING_TIMESTAMP" }
    }]);
    fs::write(&path, documents.to_string()).expect("write policy");

    let mut cfg = AppConfig::default();
    cfg.policies.deploy = vec![path.to_string_lossy().to_string()];
    let (base, shutdown_tx, handle) = start_server(cfg).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/decision"))
        .json(&json!({
            "onapName": "SDNC",
            "action": "naming",
            "resource": { "policy-type": ["onap.policies.Naming"] }
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "Permit");
    assert_eq!(body["obligations"][0]["id"], "SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP");
    assert_eq!(
        body["obligations"][0]["attributes"]["properties"]["policy-instance-name"],
        "ONAP_NF_NAMING_TIMESTAMP"
    );

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn missing_policy_file_fails_startup() {
    let mut cfg = AppConfig::default();
    cfg.policies.deploy = vec!["/nonexistent/pdpx/policy.json".to_string()];
    assert!(build_app(&cfg).await.is_err());
}
