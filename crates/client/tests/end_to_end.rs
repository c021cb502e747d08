//! Full pipeline over real HTTP: client -> API -> queue -> worker -> store -> client.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use taskrelay_api::config::ServerConfig;
use taskrelay_api::router::build_app_router;
use taskrelay_api::state::AppState;
use taskrelay_client::{ClientError, TaskClient};
use taskrelay_core::correlation::{CorrelationContext, TraceParent};
use taskrelay_core::poll::{PollError, PollPolicy};
use taskrelay_core::result::ResultStatus;
use taskrelay_core::task::TaskKind;
use taskrelay_store::{InMemoryStore, ResultWriter};
use taskrelay_worker::{StandardExecutor, WorkerLoop, WorkerSettings};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Stack {
    client: TaskClient,
    store: Arc<InMemoryStore>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl Stack {
    fn start_worker(&mut self, slow_echo_delay: Duration) {
        let worker = WorkerLoop::new(
            self.store.clone(),
            ResultWriter::new(self.store.clone(), Duration::from_secs(3600)),
            Arc::new(StandardExecutor::new(slow_echo_delay)),
        )
        .with_settings(WorkerSettings {
            dequeue_timeout: Duration::from_millis(20),
            ..WorkerSettings::default()
        });

        let cancel = self.cancel.clone();
        self.workers.push(tokio::spawn(async move {
            worker.run(cancel).await.unwrap();
        }));
    }

    async fn stop(self) {
        self.cancel.cancel();
        for worker in self.workers {
            worker.await.unwrap();
        }
    }
}

/// Serve the API on an ephemeral port over an in-memory store.
async fn start_stack() -> Stack {
    let store = Arc::new(InMemoryStore::new());
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        redis_url: "redis://unused".to_string(),
        key_prefix: "e2e".to_string(),
        max_payload_chars: 10_000,
        service_name: "api-e2e".to_string(),
    };
    let app = build_app_router(AppState::new(store.clone(), config)).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Stack {
        client: TaskClient::new(format!("http://{addr}")),
        store,
        cancel: CancellationToken::new(),
        workers: Vec::new(),
    }
}

fn policy() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(20), 250)
}

// ---------------------------------------------------------------------------
// Test: submit + wait for each kind
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_kind_round_trips() {
    let mut stack = start_stack().await;
    stack.start_worker(Duration::from_millis(50));

    let expected = [
        (TaskKind::Reverse, "olleh"),
        (TaskKind::Uppercase, "HELLO"),
        (TaskKind::SlowEcho, "processed:hello"),
    ];
    for (kind, want) in expected {
        let id = stack
            .client
            .submit(kind, "hello", &CorrelationContext::default())
            .await
            .unwrap();
        let record = stack.client.wait_for_result(&id, &policy()).await.unwrap();
        assert_eq!(record.status(), ResultStatus::Done);
        assert_eq!(record.result(), Some(want));
    }

    stack.stop().await;
}

// ---------------------------------------------------------------------------
// Test: pending before any worker runs, correlation carried through
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pending_until_a_worker_picks_it_up() {
    let mut stack = start_stack().await;
    let correlation = CorrelationContext::new(
        Some(TraceParent::new_root().to_string()),
        Some("e2e-req".to_string()),
    );

    let id = stack
        .client
        .submit(TaskKind::Uppercase, "later", &correlation)
        .await
        .unwrap();

    let record = stack.client.fetch_result(&id).await.unwrap();
    assert_eq!(record.status(), ResultStatus::Pending);

    let early = stack
        .client
        .wait_for_result(&id, &PollPolicy::new(Duration::from_millis(5), 2))
        .await;
    assert_matches!(early, Err(PollError::ClientTimeout { attempts: 2, .. }));

    stack.start_worker(Duration::ZERO);
    let record = stack.client.wait_for_result(&id, &policy()).await.unwrap();
    assert_eq!(record.result(), Some("LATER"));

    stack.stop().await;
}

// ---------------------------------------------------------------------------
// Test: concurrent mixed submissions across several workers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_mixed_submissions_complete() {
    let mut stack = start_stack().await;
    for _ in 0..3 {
        stack.start_worker(Duration::from_millis(10));
    }

    let mut handles = Vec::new();
    for i in 0..24 {
        let client = stack.client.clone();
        handles.push(tokio::spawn(async move {
            let kind = TaskKind::ALL[i % TaskKind::ALL.len()];
            let payload = format!("item {i}");
            let id = client
                .submit(kind, &payload, &CorrelationContext::default())
                .await
                .unwrap();
            let record = client.wait_for_result(&id, &policy()).await.unwrap();
            assert_eq!(record.result(), Some(kind.transform(&payload).as_str()));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    stack.stop().await;
}

// ---------------------------------------------------------------------------
// Test: API errors surface as ClientError::Api
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queue_outage_surfaces_as_api_error() {
    let stack = start_stack().await;
    stack.store.set_offline(true);

    let err = stack
        .client
        .submit(TaskKind::Reverse, "hello", &CorrelationContext::default())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ClientError::Api { status: 503, ref code, .. } if code == "QUEUE_UNAVAILABLE"
    );

    stack.stop().await;
}

#[tokio::test]
async fn result_store_outage_aborts_the_poll() {
    let stack = start_stack().await;
    let id = stack
        .client
        .submit(TaskKind::Reverse, "hello", &CorrelationContext::default())
        .await
        .unwrap();
    stack.store.set_offline(true);

    let result = stack.client.wait_for_result(&id, &policy()).await;
    assert_matches!(
        result,
        Err(PollError::Source(ClientError::Api { status: 503, .. }))
    );

    stack.stop().await;
}

#[tokio::test]
async fn blank_payload_is_rejected_by_the_api() {
    let stack = start_stack().await;
    let err = stack
        .client
        .submit(TaskKind::Reverse, "  ", &CorrelationContext::default())
        .await
        .unwrap_err();
    assert_matches!(err, ClientError::Api { status: 400, .. });
    stack.stop().await;
}
