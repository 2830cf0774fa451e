mod common;

use common::{mongo_available, sample_payload, TestApp, TEST_SURFACE};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn missing_required_field_returns_client_error_and_writes_nothing() {
    let app = TestApp::spawn_degraded().await;
    let client = app.client();

    let response = client
        .post(format!("{}/save-payment-code", app.address))
        .json(&serde_json::json!({ "unique_id": "PAY-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // No cache patch happened.
    let current = client
        .get(format!("{}/get-current-payment-code", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(current.status(), 404);

    // No history entry was appended.
    let history: Vec<serde_json::Value> = client
        .get(format!("{}/payment-history", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn save_with_unreachable_store_reports_partial_success() {
    let app = TestApp::spawn_degraded().await;
    let client = app.client();

    let response = client
        .post(format!("{}/save-payment-code", app.address))
        .json(&sample_payload("PAY-2"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["store_saved"], false);
    assert_eq!(body["unique_id"], "PAY-2");

    // The cache and the history log were still written.
    let current: serde_json::Value = client
        .get(format!("{}/get-current-payment-code", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["unique_id"], "PAY-2");
    assert_eq!(current["customer_name"], "Asha Rao");
    assert_eq!(current["status"], "pending");

    let history: Vec<serde_json::Value> = client
        .get(format!("{}/payment-history", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["unique_id"], "PAY-2");
}

#[tokio::test]
async fn merchant_upi_config_is_never_mutated_by_intake() {
    let app = TestApp::spawn_degraded().await;
    let client = app.client();

    let before: serde_json::Value = client
        .get(format!("{}/get-upi-config", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["upi_config"]["upi_id"], "merchant@testupi");

    for i in 0..3 {
        let response = client
            .post(format!("{}/save-payment-code", app.address))
            .json(&sample_payload(&format!("PAY-{}", i)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let after: serde_json::Value = client
        .get(format!("{}/get-upi-config", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["upi_config"], after["upi_config"]);

    // Everything above the current-code block is byte-identical.
    let surface = std::fs::read_to_string(&app.state.config.files.merchant_config_path).unwrap();
    let boundary = TEST_SURFACE.find("CURRENT_PAYMENT_CODE").unwrap();
    assert_eq!(&surface[..boundary], &TEST_SURFACE[..boundary]);
}

#[tokio::test]
async fn second_intake_with_same_id_replaces_the_cached_code() {
    let app = TestApp::spawn_degraded().await;
    let client = app.client();

    for name in ["Asha", "Binod"] {
        let mut payload = sample_payload("PAY-9");
        payload["first_name"] = serde_json::json!(name);
        let response = client
            .post(format!("{}/save-payment-code", app.address))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let current: serde_json::Value = client
        .get(format!("{}/get-current-payment-code", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["customer_name"], "Binod Rao");
}

#[tokio::test]
async fn confirm_with_failing_store_reports_failure_without_crashing() {
    let app = TestApp::spawn_degraded().await;
    let client = app.client();

    Mock::given(method("POST"))
        .and(path("/12345/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [{ "id": "wamid.test" }]
        })))
        .mount(&app.whatsapp_server)
        .await;

    let response = client
        .post(format!("{}/confirm-payment", app.address))
        .json(&serde_json::json!({
            "uniqueId": "PAY-404",
            "firstName": "Asha",
            "lastName": "Rao",
            "whatsapp": "9876543210",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["store_updated"], false);
}

#[tokio::test]
async fn confirm_with_missing_fields_is_a_client_error() {
    let app = TestApp::spawn_degraded().await;
    let client = app.client();

    let response = client
        .post(format!("{}/confirm-payment", app.address))
        .json(&serde_json::json!({ "firstName": "Asha" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn save_and_confirm_round_trip_through_the_store() {
    if !mongo_available().await {
        eprintln!("skipping: no MongoDB at localhost:27017");
        return;
    }

    let app = TestApp::spawn().await;
    let client = app.client();

    Mock::given(method("POST"))
        .and(path("/12345/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [{ "id": "wamid.test" }]
        })))
        .expect(1)
        .mount(&app.whatsapp_server)
        .await;

    let response = client
        .post(format!("{}/save-payment-code", app.address))
        .json(&sample_payload("PAY-10"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["store_saved"], true);

    // The record shows up in the dumps.
    let dump: serde_json::Value = client
        .get(format!("{}/store-data", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dump["total_records"], 1);
    assert_eq!(dump["data"][0]["unique_id"], "PAY-10");
    assert_eq!(dump["data"][0]["status"], "pending");

    let csv: serde_json::Value = client
        .get(format!("{}/csv-data", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(csv["data"][0]["Unique ID"], "PAY-10");
    assert_eq!(csv["data"][0]["First Name"], "Asha");

    // Confirm it.
    let response = client
        .post(format!("{}/confirm-payment", app.address))
        .json(&serde_json::json!({
            "uniqueId": "PAY-10",
            "firstName": "Asha",
            "lastName": "Rao",
            "whatsapp": "9876543210",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["store_updated"], true);
    assert_eq!(body["whatsapp_sent"], true);

    let dump: serde_json::Value = client
        .get(format!("{}/store-data", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dump["data"][0]["status"], "confirmed");

    app.cleanup().await;
}
