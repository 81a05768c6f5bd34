//! Full runs: configuration file to report, against the mock acceptor.

use fix_types::{tag, MessageKind};
use scenario_e2e_tests::{AcceptorBehaviour, MockAcceptor, RunFixture};
use scenario_runner::{app, FailureCause, RunnerError, SessionPhase};
use std::time::{Duration, Instant};

const ORDER_ACKED: &str = r#"
name = "limit order is acknowledged"
default_timeout_ms = 2000

[[step]]
action = "send"
template = "limit_order"
capture = { order = "ClOrdID" }

[[step]]
action = "expect"
kind = "ExecutionReport"
where = { ClOrdID = "${order}", OrdStatus = "0" }
capture = { exchange_id = "OrderID" }

[[step]]
action = "expect_none"
kind = "OrderCancelReject"
timeout_ms = 300
"#;

const ORDER_THEN_CANCEL: &str = r#"
[[step]]
action = "send"
template = "limit_order"
capture = { order = "ClOrdID" }

[[step]]
action = "expect"
kind = "ExecutionReport"
where = { ClOrdID = "${order}", ExecType = "0" }

[[step]]
action = "send"
template = "cancel"
fields = { OrigClOrdID = "${order}" }

[[step]]
action = "expect"
kind = "ExecutionReport"
where = { OrigClOrdID = "${order}", OrdStatus = "4" }
"#;

const WAITS_FOR_CANCEL_REJECT: &str = r#"
[[step]]
action = "send"
template = "limit_order"

[[step]]
action = "expect"
kind = "OrderCancelReject"
timeout_ms = 300
"#;

#[tokio::test]
async fn test_order_round_trip_passes_and_reports() {
    let acceptor = MockAcceptor::start(AcceptorBehaviour::Accept).await.unwrap();
    let fixture = RunFixture::new()
        .unwrap()
        .session("A", acceptor.port())
        .scenario("A", ORDER_ACKED)
        .unwrap();
    let config = fixture.write().unwrap();

    let summary = app::run(&config).await.unwrap();

    assert!(summary.all_passed(), "{:?}", summary.results);
    let result = &summary.results[0];
    assert_eq!(result.phase, SessionPhase::LoggedOff);
    assert!(result.logout_attempted);
    assert_eq!(result.messages_sent, 1);
    assert!(result.messages_received >= 1);
    assert_eq!(result.script.as_ref().map(|s| s.steps), Some(3));

    let orders = acceptor.received();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].kind(), MessageKind::NewOrderSingle);
    assert_eq!(orders[0].get(tag::SYMBOL), Some("EUR/USD"));
    assert_eq!(orders[0].get(tag::SENDER_COMP_ID), Some("CLIENT"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture.report_path()).unwrap()).unwrap();
    assert_eq!(report["run"]["passed"], 1);
    assert_eq!(report["results"][0]["qualifier"], "A");
}

#[tokio::test]
async fn test_cancel_correlates_on_captured_id() {
    let acceptor = MockAcceptor::start(AcceptorBehaviour::Accept).await.unwrap();
    let fixture = RunFixture::new()
        .unwrap()
        .session("A", acceptor.port())
        .scenario("A", ORDER_THEN_CANCEL)
        .unwrap();

    let summary = app::run(&fixture.write().unwrap()).await.unwrap();

    assert!(summary.all_passed(), "{:?}", summary.results);
    let received = acceptor.received();
    assert_eq!(received[1].kind(), MessageKind::OrderCancelRequest);
    assert_eq!(
        received[1].get(tag::ORIG_CL_ORD_ID),
        received[0].get(tag::CL_ORD_ID)
    );
}

#[tokio::test]
async fn test_rejected_logon_fails_without_running_scenario() {
    let acceptor = MockAcceptor::start(AcceptorBehaviour::RejectLogon("Unknown CompID".into()))
        .await
        .unwrap();
    let fixture = RunFixture::new()
        .unwrap()
        .session("A", acceptor.port())
        .scenario("A", ORDER_ACKED)
        .unwrap();

    let summary = app::run(&fixture.write().unwrap()).await.unwrap();

    assert!(!summary.all_passed());
    let result = &summary.results[0];
    assert_eq!(result.phase, SessionPhase::Failed);
    assert_eq!(
        result.failure,
        Some(FailureCause::LogonRejected("Unknown CompID".into()))
    );
    assert!(result.script.is_none());
    assert!(!result.logout_attempted);
    assert!(acceptor.received().is_empty());
}

#[tokio::test]
async fn test_missing_scenario_still_logs_off() {
    let acceptor = MockAcceptor::start(AcceptorBehaviour::Accept).await.unwrap();
    let fixture = RunFixture::new().unwrap().session("A", acceptor.port());

    let summary = app::run(&fixture.write().unwrap()).await.unwrap();

    let result = &summary.results[0];
    assert_eq!(
        result.failure,
        Some(FailureCause::ScenarioFileMissing(fixture.scenario_path("A")))
    );
    assert_eq!(result.phase_reached, SessionPhase::LoggedOff);
    assert!(result.logout_attempted);
}

#[tokio::test]
async fn test_parallel_sessions_fail_independently() {
    let acceptor = MockAcceptor::start(AcceptorBehaviour::Accept).await.unwrap();
    let fixture = RunFixture::new()
        .unwrap()
        .session("A", acceptor.port())
        .session("B", acceptor.port())
        .parallel(true)
        .scenario("A", ORDER_ACKED)
        .unwrap()
        .scenario("B", WAITS_FOR_CANCEL_REJECT)
        .unwrap();

    let summary = app::run(&fixture.write().unwrap()).await.unwrap();

    assert!(summary.parallel);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[0].qualifier, "A");
    assert!(summary.results[0].passed);
    assert!(matches!(
        summary.results[1].failure,
        Some(FailureCause::ScenarioScriptError(_))
    ));
    assert!(summary.results.iter().all(|r| r.logout_attempted));
}

#[tokio::test]
async fn test_sequential_failure_does_not_stop_later_sessions() {
    let acceptor = MockAcceptor::start(AcceptorBehaviour::Accept).await.unwrap();
    let fixture = RunFixture::new()
        .unwrap()
        .session("A", acceptor.port())
        .session("B", acceptor.port())
        .scenario("A", WAITS_FOR_CANCEL_REJECT)
        .unwrap()
        .scenario("B", ORDER_ACKED)
        .unwrap();

    let summary = app::run(&fixture.write().unwrap()).await.unwrap();

    assert!(!summary.parallel);
    assert!(!summary.results[0].passed);
    assert!(summary.results[1].passed);
    assert!(summary.results[1].started_at >= summary.results[0].started_at);
}

#[tokio::test]
async fn test_scenario_deadline_is_enforced() {
    let acceptor = MockAcceptor::start(AcceptorBehaviour::Accept).await.unwrap();
    let fixture = RunFixture::new()
        .unwrap()
        .session("A", acceptor.port())
        .scenario_timeout_secs(1)
        .scenario(
            "A",
            r#"
            [[step]]
            action = "pause"
            millis = 5000
            "#,
        )
        .unwrap();

    let summary = app::run(&fixture.write().unwrap()).await.unwrap();

    assert_eq!(
        summary.results[0].failure,
        Some(FailureCause::ScenarioTimeout { timeout_ms: 1000 })
    );
    assert!(summary.results[0].logout_attempted);
}

#[tokio::test]
async fn test_invalid_config_aborts_the_run() {
    let fixture = RunFixture::new().unwrap();
    // No sessions configured.
    let config = fixture.write().unwrap();

    let result = app::run(&config).await;
    assert!(matches!(result, Err(RunnerError::Configuration(_))));
    assert!(!fixture.report_path().exists());
}

#[tokio::test]
async fn test_unreachable_counterparty_fails_before_logon_timeout() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let fixture = RunFixture::new()
        .unwrap()
        .session("A", port)
        .scenario("A", ORDER_ACKED)
        .unwrap();
    assert!(fixture.root().join("scenarios").exists());
    let config = fixture.write().unwrap();

    let started = Instant::now();
    let summary = app::run(&config).await.unwrap();

    // The fixture's logon timeout is 3s; a refused connect must not wait it out.
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    let result = &summary.results[0];
    assert!(!result.passed);
    assert!(
        matches!(result.failure, Some(FailureCause::Transport(_))),
        "{:?}",
        result.failure
    );
    assert_eq!(result.phase, SessionPhase::Failed);
    assert_eq!(result.phase_reached, SessionPhase::ConnectedWait);
    assert!(result.script.is_none());
}
