// crates/fnruntime/tests/console_test.rs

mod common;

use common::{draft, settle_until, Call, FakeBackend};
use fncore::{ConsoleError, ErrorKind, ExecutionPhase};
use fnruntime::{Console, DeletionFlow, DeletionState, EditState};
use std::sync::Arc;

async fn loaded_console(backend: &Arc<FakeBackend>) -> Console {
    let console = Console::new(backend.clone());
    console.load().await.expect("load should succeed");
    console
}

#[tokio::test]
async fn test_execute_sums_inputs() {
    common::init_tracing();
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let result = console
        .execute(adder.id, r#"{"num1":5,"num2":3}"#)
        .await
        .expect("execution should succeed");

    assert_eq!(result.result["sum"], 8);
    assert!(result.metrics.execution_time >= 0.0);
    assert!(result.metrics.memory_usage >= 0.0);
    assert!(result.metrics.cpu_usage >= 0.0);
}

#[tokio::test]
async fn test_execute_rejects_malformed_input_without_network() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;
    let calls_before = backend.calls().len();

    let err = console.execute(adder.id, "not json").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InputParse);
    assert_eq!(backend.calls().len(), calls_before, "no request may be issued");
    assert!(console.snapshot().await.execution(adder.id).is_none());
}

#[tokio::test]
async fn test_valid_input_issues_exactly_one_request() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let inputs = [r#"{"num1":1,"num2":2}"#, r#"{"other":true}"#, "[]", "null", "17"];
    for (i, input) in inputs.iter().enumerate() {
        let outcome = console.execute(adder.id, input).await;
        assert_eq!(backend.execute_calls(), i + 1, "input {} should cost one request", input);

        match outcome {
            Ok(result) => assert!(result.result.get("sum").is_some()),
            Err(e) => assert_eq!(e.kind(), ErrorKind::Execution),
        }
    }
}

#[tokio::test]
async fn test_backend_failure_is_execution_error_with_detail() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let err = console.execute(adder.id, r#"{"a": 1}"#).await.unwrap_err();

    assert_eq!(err, ConsoleError::Execution("KeyError: 'num1'".to_string()));
    let state = console.snapshot().await;
    assert!(matches!(
        &state.execution(adder.id).unwrap().phase,
        ExecutionPhase::Failed { error } if error.contains("KeyError")
    ));
    assert!(state.metrics(adder.id).is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_connectivity_error() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;
    backend.set_offline(true);

    let err = console.execute(adder.id, r#"{"num1":1,"num2":1}"#).await.unwrap_err();

    assert!(err.is_connectivity());
    assert_eq!(backend.execute_calls(), 1);
}

#[tokio::test]
async fn test_successful_execution_appends_sample() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let other = backend.seed(draft("other", "/other"));
    let console = loaded_console(&backend).await;
    let mut events = console.subscribe_events();

    console.execute(adder.id, r#"{"num1":2,"num2":2}"#).await.unwrap();
    console.execute(adder.id, r#"{"num1":3,"num2":4}"#).await.unwrap();

    let history = console.metrics(adder.id).await;
    assert_eq!(history.len(), 2);
    assert!(history[0].timestamp <= history[1].timestamp);
    assert!(console.metrics(other.id).await.is_empty());

    let state = console.snapshot().await;
    assert!(matches!(
        state.execution(adder.id).unwrap().phase,
        ExecutionPhase::Succeeded { .. }
    ));

    // submitted + succeeded for each call
    let mut received = 0;
    while events.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 4);
}

#[tokio::test]
async fn test_concurrent_executions_are_independent() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let (a, b) = tokio::join!(
        console.execute(adder.id, r#"{"num1":1,"num2":1}"#),
        console.execute(adder.id, r#"{"num1":2,"num2":2}"#),
    );

    assert_eq!(a.unwrap().result["sum"], 2);
    assert_eq!(b.unwrap().result["sum"], 4);
    assert_eq!(backend.execute_calls(), 2);
    assert_eq!(console.metrics(adder.id).await.len(), 2);
}

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let backend = Arc::new(FakeBackend::new());
    let console = loaded_console(&backend).await;
    let new_draft = draft("multiplier", "/mul");

    let created = console.create(&new_draft).await.unwrap();
    let fetched = console.get(created.id).await.unwrap();

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.to_draft(), new_draft);
    assert_eq!(console.snapshot().await.record(created.id), Some(&fetched));
}

#[tokio::test]
async fn test_create_validates_before_sending() {
    let backend = Arc::new(FakeBackend::new());
    let console = loaded_console(&backend).await;

    let err = console.create(&draft("", "/nameless")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = console.create(&draft("routeless", "  ")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(backend.count(|c| *c == Call::Create), 0);
}

#[tokio::test]
async fn test_route_collision_is_validation_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.seed_sum();
    let console = loaded_console(&backend).await;

    let err = console.create(&draft("adder-2", "/add")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(console.snapshot().await.records().count(), 1);
}

#[tokio::test]
async fn test_get_unknown_id_is_not_found() {
    let backend = Arc::new(FakeBackend::new());
    let console = loaded_console(&backend).await;

    let err = console.get(42).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!console.snapshot().await.contains(42));
}

#[tokio::test]
async fn test_discard_never_calls_update() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let mut session = console.open(adder.id).await.unwrap();
    let before = session.record().clone();
    session.begin_edit().unwrap();
    session.draft_mut().unwrap().code = "def handler(e): return 0".to_string();
    session.discard().unwrap();

    assert_eq!(backend.update_calls(), 0);
    assert_eq!(session.record(), &before);
    assert_eq!(console.snapshot().await.record(adder.id), Some(&before));
}

#[tokio::test]
async fn test_save_replaces_cached_record() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let mut session = console.open(adder.id).await.unwrap();
    session.begin_edit().unwrap();
    session.draft_mut().unwrap().timeout = 90;

    let saved = console.save(&mut session).await.unwrap();

    assert_eq!(saved.timeout, 90);
    assert!(session.is_viewing());
    assert_eq!(session.record(), &saved);
    assert_eq!(console.snapshot().await.record(adder.id).unwrap().timeout, 90);
    assert_eq!(backend.update_calls(), 1);
}

#[tokio::test]
async fn test_failed_save_keeps_edits_and_cache() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;
    backend.fail_next_update(ConsoleError::Validation("Route /taken already exists".to_string()));

    let mut session = console.open(adder.id).await.unwrap();
    session.begin_edit().unwrap();
    session.draft_mut().unwrap().route = "/taken".to_string();

    let err = console.save(&mut session).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(session.state(), EditState::Editing { error: Some(_), .. }));
    assert_eq!(session.draft().unwrap().route, "/taken");
    assert_eq!(console.snapshot().await.record(adder.id).unwrap().route, "/add");

    // the retry goes through with the same draft
    let saved = console.save(&mut session).await.unwrap();
    assert_eq!(saved.route, "/taken");
}

#[tokio::test]
async fn test_save_outside_editing_is_rejected() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let mut session = console.open(adder.id).await.unwrap();
    let err = console.save(&mut session).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transition);
    assert_eq!(backend.update_calls(), 0);
}

#[tokio::test]
async fn test_confirmed_delete_purges_cache() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;
    console.execute(adder.id, r#"{"num1":1,"num2":1}"#).await.unwrap();

    let mut flow = DeletionFlow::new();
    flow.request(adder.id).unwrap();
    let removed = console.commit_deletion(&mut flow).await.unwrap();

    assert_eq!(removed, adder.id);
    assert_eq!(flow.removed(), Some(adder.id));
    let state = console.snapshot().await;
    assert!(!state.contains(adder.id));
    assert!(state.metrics(adder.id).is_empty());
    assert!(state.execution(adder.id).is_none());
}

#[tokio::test]
async fn test_delete_not_found_keeps_record() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;
    backend.remove(adder.id);

    let mut flow = DeletionFlow::new();
    flow.request(adder.id).unwrap();
    let err = console.commit_deletion(&mut flow).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(flow.state(), DeletionState::Idle);
    assert_eq!(flow.last_error(), Some(&err));
    assert!(console.snapshot().await.contains(adder.id));
}

#[tokio::test]
async fn test_delete_failure_keeps_record_visible() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;
    backend.set_offline(true);

    let mut flow = DeletionFlow::new();
    flow.request(adder.id).unwrap();
    let err = console.commit_deletion(&mut flow).await.unwrap_err();

    assert!(err.is_connectivity());
    assert!(console.snapshot().await.contains(adder.id));
}

#[tokio::test]
async fn test_cancelled_deletion_sends_nothing() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;

    let mut flow = DeletionFlow::new();
    flow.request(adder.id).unwrap();
    flow.cancel().unwrap();

    let err = console.commit_deletion(&mut flow).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transition);
    assert_eq!(backend.count(|c| matches!(c, Call::Delete(_))), 0);
    assert!(console.snapshot().await.contains(adder.id));
}

#[tokio::test]
async fn test_refresh_metrics_surfaces_failure_to_caller() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let console = loaded_console(&backend).await;
    backend.push_sample(adder.id, 0.25);

    let history = console.refresh_metrics(adder.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].execution_time, 0.25);

    backend.fail_metrics_for(adder.id);
    let err = console.refresh_metrics(adder.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(console.metrics(adder.id).await.len(), 1);
}

#[tokio::test]
async fn test_refresh_metrics_returns_history_for_uncached_function() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    backend.push_sample(adder.id, 0.4);
    backend.push_sample(adder.id, 0.2);
    let console = Console::new(backend.clone());

    console.get(adder.id).await.unwrap();
    let history = console.refresh_metrics(adder.id).await.unwrap();

    assert_eq!(history.len(), 2);
    assert!(history[0].timestamp < history[1].timestamp);
    assert_eq!(history[0].execution_time, 0.4);
    assert!(!console.snapshot().await.contains(adder.id));
}

#[tokio::test]
async fn test_reload_in_flight_does_not_restore_deleted_record() {
    let backend = Arc::new(FakeBackend::new());
    let adder = backend.seed_sum();
    let other = backend.seed(draft("other", "/other"));
    let console = loaded_console(&backend).await;
    let gate = backend.gate_list();

    let reload = console.load();
    let delete = async {
        // The list snapshot is taken once the second request arrives.
        settle_until(|| backend.list_calls() == 2).await;
        let mut flow = DeletionFlow::new();
        flow.request(adder.id).unwrap();
        let removed = console.commit_deletion(&mut flow).await;
        gate.add_permits(1);
        removed
    };
    let (listed, removed) = tokio::join!(reload, delete);

    assert_eq!(removed.unwrap(), adder.id);
    let listed: Vec<_> = listed.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(listed, vec![other.id]);

    let state = console.snapshot().await;
    assert!(!state.contains(adder.id));
    assert!(state.contains(other.id));
}
