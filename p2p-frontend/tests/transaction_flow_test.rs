mod common;

use common::{kzt_card_request, test_state, StubGateway};
use p2p_core::error::AppError;
use p2p_frontend::models::{Currency, PaymentMethod, TransactionData, TransactionStatus};
use p2p_frontend::services::poller::poll_once;
use p2p_frontend::services::{PollTarget, ServiceError, StatusPoller};
use std::time::Duration;

#[tokio::test]
async fn create_records_transaction() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");

    let record = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .expect("create should succeed");

    assert_eq!(record.transaction.amount_to_pay, 100.0);
    assert_eq!(record.transaction.currency, "KZT");
    assert_eq!(record.status(), TransactionStatus::Accepted);
    assert_eq!(record.created_at, record.updated_at);

    let stored = state.transactions.list().await.unwrap();
    assert_eq!(stored, vec![record]);
}

#[tokio::test]
async fn status_change_updates_only_target_record() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");

    let first = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap();
    let second = state
        .transactions
        .create_transaction(kzt_card_request(250.0))
        .await
        .unwrap();

    gateway.set_status(first.tracker_id(), TransactionStatus::Success);
    let status = state
        .transactions
        .refresh_status(first.tracker_id())
        .await
        .unwrap();
    assert_eq!(status, TransactionStatus::Success);

    let updated = state.transactions.get(first.tracker_id()).await.unwrap();
    assert_eq!(updated.status(), TransactionStatus::Success);
    assert_eq!(updated.created_at, first.created_at);
    assert!(updated.updated_at >= first.updated_at);

    let untouched = state.transactions.get(second.tracker_id()).await.unwrap();
    assert_eq!(untouched, second);
}

#[tokio::test]
async fn invalid_requests_never_reach_gateway() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");

    let err = state
        .transactions
        .create_transaction(kzt_card_request(0.5))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = state
        .transactions
        .create_transaction(TransactionData {
            currency: Currency::Kgs,
            sub_method: PaymentMethod::Qr,
            bank_token: "MBANK".to_string(),
            amount: 100.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Selection(_)));

    let err = state
        .transactions
        .create_transaction(TransactionData {
            bank_token: "CLICK".to_string(),
            ..kzt_card_request(100.0)
        })
        .await
        .unwrap_err();
    assert!(matches!(AppError::from(err), AppError::BadRequest(_)));

    assert_eq!(
        gateway
            .create_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert!(state.transactions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn backend_rejection_is_not_stored() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");
    gateway.reject_next_create(422, "Bank unavailable");

    let err = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap_err();

    match AppError::from(err) {
        AppError::UpstreamRejected { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Bank unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(state.transactions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let state = test_state(StubGateway::new(), "none");
    let err = state.transactions.get("missing").await.unwrap_err();
    assert!(matches!(AppError::from(err), AppError::NotFound(_)));
}

#[tokio::test]
async fn poll_once_single_stops_when_terminal() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");
    let record = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap();
    let target = PollTarget::Single(record.tracker_id().to_string());

    assert!(poll_once(&state.transactions, &target).await);

    gateway.set_status(record.tracker_id(), TransactionStatus::Declined);
    assert!(!poll_once(&state.transactions, &target).await);

    let calls = gateway.status_calls();
    assert!(!poll_once(&state.transactions, &target).await);
    assert_eq!(gateway.status_calls(), calls, "terminal records are not re-checked");
}

#[tokio::test]
async fn poll_once_all_pending_updates_each_record() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");
    let a = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap();
    let b = state
        .transactions
        .create_transaction(kzt_card_request(200.0))
        .await
        .unwrap();

    gateway.set_status(a.tracker_id(), TransactionStatus::Success);
    assert!(poll_once(&state.transactions, &PollTarget::AllPending).await);

    assert_eq!(
        state.transactions.get(a.tracker_id()).await.unwrap().status(),
        TransactionStatus::Success
    );
    assert_eq!(
        state.transactions.get(b.tracker_id()).await.unwrap().status(),
        TransactionStatus::Accepted
    );
    assert_eq!(state.transactions.pending().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn single_poller_exits_after_terminal_status() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");
    let record = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap();
    gateway.set_status(record.tracker_id(), TransactionStatus::Success);

    let handle = StatusPoller::spawn(
        state.transactions.clone(),
        PollTarget::Single(record.tracker_id().to_string()),
        Duration::from_secs(1),
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    for _ in 0..10 {
        if handle.is_finished() {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert!(handle.is_finished());
    assert_eq!(
        state.transactions.get(record.tracker_id()).await.unwrap().status(),
        TransactionStatus::Success
    );
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn latest_scope_follows_newest_transaction() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "latest");
    let record = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap();
    state.follow_latest(record.tracker_id()).await;

    assert_eq!(gateway.status_calls(), 0, "first check waits one interval");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(gateway.status_calls() >= 1);

    state.shutdown_pollers().await;
    let calls = gateway.status_calls();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(gateway.status_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_running_check_finish() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");
    let record = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap();
    gateway.set_status(record.tracker_id(), TransactionStatus::Success);
    gateway.delay_status_checks(Duration::from_millis(500));

    let handle = StatusPoller::spawn(
        state.transactions.clone(),
        PollTarget::AllPending,
        Duration::from_millis(100),
    );

    // First check starts at 100ms and answers at 600ms.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(gateway.status_calls(), 0);

    handle.shutdown().await;

    assert_eq!(gateway.status_calls(), 1);
    assert_eq!(
        state.transactions.get(record.tracker_id()).await.unwrap().status(),
        TransactionStatus::Success
    );
}

#[tokio::test]
async fn non_finite_amount_leaves_history_intact() {
    let gateway = StubGateway::new();
    let state = test_state(gateway.clone(), "none");
    let first = state
        .transactions
        .create_transaction(kzt_card_request(100.0))
        .await
        .unwrap();

    for amount in [f64::NAN, f64::INFINITY] {
        let err = state
            .transactions
            .create_transaction(kzt_card_request(amount))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    state
        .transactions
        .create_transaction(kzt_card_request(200.0))
        .await
        .unwrap();

    let ids: Vec<String> = state
        .transactions
        .list()
        .await
        .unwrap()
        .iter()
        .map(|r| r.tracker_id().to_string())
        .collect();
    assert_eq!(ids, vec![first.tracker_id().to_string(), "trk_2".to_string()]);
}

#[tokio::test]
async fn shutdown_stops_idle_poller() {
    let state = test_state(StubGateway::new(), "none");
    let handle = StatusPoller::spawn(
        state.transactions.clone(),
        PollTarget::AllPending,
        Duration::from_secs(3600),
    );

    tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
        .await
        .expect("shutdown should not wait for the next tick");
}
