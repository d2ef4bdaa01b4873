mod common;

use p2p_core::utils::signature::verify_signature;
use p2p_frontend::models::TransactionStatus;
use p2p_frontend::services::gateway_client::{
    APIPUBLIC_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use p2p_frontend::services::{GatewayClient, GatewayError, PaymentGateway};
use serde_json::{json, Value};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GatewayClient {
    let settings = common::test_settings(&server.uri(), "none");
    GatewayClient::new(settings.gateway).expect("Failed to build gateway client")
}

fn created_body() -> Value {
    json!({
        "tracker_id": "trk_100",
        "status": "ACCEPTED",
        "payment_data": {
            "payment_holder": "IVAN IVANOV",
            "payment_method": "[60] KZT-P2P_CIS-CARD",
            "payment_system": "BEREKEBANK",
            "payment_requisite": "4400 0000 0000 0000",
            "payment_expires_at": "2026-10-19T12:00:00Z"
        },
        "amount": 100,
        "currency": "KZT",
        "amount_to_pay": 100
    })
}

#[tokio::test]
async fn create_transaction_sends_signed_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transaction/create/in/P2P_CIS/"))
        .and(header(APIPUBLIC_HEADER, "test_public_key"))
        .and(header_exists(SIGNATURE_HEADER))
        .and(header_exists(TIMESTAMP_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tx = client
        .create_transaction(&common::kzt_card_request(100.0))
        .await
        .expect("create should succeed");

    assert_eq!(tx.tracker_id, "trk_100");
    assert_eq!(tx.status, TransactionStatus::Accepted);
    assert_eq!(tx.amount_to_pay, 100.0);
    assert_eq!(tx.currency, "KZT");

    let requests = server.received_requests().await.expect("requests recorded");
    let request = &requests[0];

    let body: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(
        body,
        json!({"currency": "KZT", "sub_method": "CARD", "bank_token": "ANY", "amount": 100.0})
    );

    let timestamp: i64 = request.headers[TIMESTAMP_HEADER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let signature = request.headers[SIGNATURE_HEADER].to_str().unwrap();

    assert_eq!(signature.len(), 128);
    assert!(verify_signature("test_private_key", &body, timestamp, signature).unwrap());
}

#[tokio::test]
async fn create_transaction_surfaces_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transaction/create/in/P2P_CIS/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Amount below minimum"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_transaction(&common::kzt_card_request(100.0))
        .await
        .unwrap_err();

    match err {
        GatewayError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Amount below minimum");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn create_transaction_falls_back_to_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transaction/create/in/P2P_CIS/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_transaction(&common::kzt_card_request(100.0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Api { status: 502, ref message } if message == "Failed to create transaction"
    ));
}

#[tokio::test]
async fn check_status_signs_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transaction/trk_100/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .expect(1)
        .mount(&server)
        .await;

    let status = client_for(&server)
        .check_transaction_status("trk_100")
        .await
        .expect("status check should succeed");
    assert_eq!(status, TransactionStatus::Success);

    let requests = server.received_requests().await.expect("requests recorded");
    let request = &requests[0];
    let body: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body, json!({}));

    let timestamp: i64 = request.headers[TIMESTAMP_HEADER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let signature = request.headers[SIGNATURE_HEADER].to_str().unwrap();
    assert!(verify_signature("test_private_key", &body, timestamp, signature).unwrap());
}

#[tokio::test]
async fn check_status_falls_back_to_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transaction/trk_404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .check_transaction_status("trk_404")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Api { status: 404, ref message } if message == "Failed to check transaction status"
    ));
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let settings = common::test_settings("http://127.0.0.1:1", "none");
    let client = GatewayClient::new(settings.gateway).unwrap();

    let err = client.check_transaction_status("trk_1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}
