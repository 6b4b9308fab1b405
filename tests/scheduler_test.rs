//! Tests for admission order, concurrency ceiling and the run loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hydra_core::{Globals, Hydra, HydraConfig, HydraError, MockTransport, Request};

fn setup(max_concurrency: Option<usize>, transport: MockTransport) -> (Hydra, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let config = HydraConfig { max_concurrency, ..Default::default() };
    let hydra = Hydra::with_globals(config, transport.clone(), Arc::new(Globals::new()));
    (hydra, transport)
}

fn url(path: &str) -> String {
    format!("http://localhost:3000/{path}")
}

#[tokio::test]
async fn test_admission_order_matches_enqueue_order() {
    let (mut hydra, transport) = setup(Some(1), MockTransport::new());
    let urls: Vec<String> = (0..5).map(|i| url(&format!("r{i}"))).collect();

    for u in &urls {
        hydra.queue(Request::new(u.as_str())).unwrap();
    }
    hydra.run().await.unwrap();

    assert_eq!(transport.executed(), urls);
    assert_eq!(transport.peak_concurrency(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_ceiling_respected() {
    let transport = MockTransport::new().with_default_delay(Duration::from_millis(10));
    let (mut hydra, transport) = setup(Some(3), transport);

    for i in 0..10 {
        hydra.queue(Request::new(url(&format!("r{i}")))).unwrap();
    }
    assert_eq!(hydra.queued_len(), 10);
    hydra.run().await.unwrap();

    assert_eq!(transport.execution_count(), 10);
    assert_eq!(transport.peak_concurrency(), 3);
    assert_eq!(hydra.queued_len(), 0);
    assert_eq!(hydra.in_flight_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transport_capacity_caps_unbounded_scheduler() {
    let transport = MockTransport::new()
        .with_default_delay(Duration::from_millis(10))
        .with_capacity(2);
    let (mut hydra, transport) = setup(None, transport);

    for i in 0..6 {
        hydra.queue(Request::new(url(&format!("r{i}")))).unwrap();
    }
    hydra.run().await.unwrap();

    assert_eq!(transport.peak_concurrency(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_scheduler_admits_everything() {
    let transport = MockTransport::new().with_default_delay(Duration::from_millis(10));
    let (mut hydra, transport) = setup(None, transport);

    for i in 0..8 {
        hydra.queue(Request::new(url(&format!("r{i}")))).unwrap();
    }
    hydra.run().await.unwrap();

    assert_eq!(transport.peak_concurrency(), 8);
}

#[tokio::test]
async fn test_run_with_nothing_queued() {
    let (mut hydra, transport) = setup(None, MockTransport::new());
    hydra.run().await.unwrap();
    assert_eq!(transport.execution_count(), 0);
    assert_eq!(hydra.stats().completed, 0);
}

#[tokio::test]
async fn test_response_and_performed_set_after_run() {
    let (mut hydra, _transport) = setup(None, MockTransport::new());
    let request = Request::new(url("foo"));
    assert!(request.response().is_none());

    hydra.queue(Arc::clone(&request)).unwrap();
    hydra.run().await.unwrap();

    let response = request.response().unwrap();
    assert_eq!(response.code(), 200);
    assert_eq!(response.text(), url("foo"));
    assert!(request.performed());
}

#[tokio::test]
async fn test_callback_enqueue_drained_by_same_run() {
    let (mut hydra, transport) = setup(Some(1), MockTransport::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let a = Request::new(url("a"));
    let b = Request::new(url("b"));
    let c = Request::new(url("c"));

    for request in [&a, &c] {
        let calls = Arc::clone(&calls);
        request.on_complete(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    {
        let calls = Arc::clone(&calls);
        let c = Arc::clone(&c);
        b.on_complete(move |hydra, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            hydra.queue(Arc::clone(&c))?;
            Ok(())
        });
    }

    hydra.queue(a).unwrap();
    hydra.queue(b).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(transport.executed(), vec![url("a"), url("b"), url("c")]);
    assert!(c.response().is_some());
}

#[tokio::test]
async fn test_chained_enqueue_from_callbacks() {
    let (mut hydra, transport) = setup(None, MockTransport::new());
    let first = Request::new(url("0"));
    first.on_complete(|hydra, _| {
        let next = Request::new(url("1"));
        next.on_complete(|hydra, _| {
            hydra.queue(Request::new(url("2")))?;
            Ok(())
        });
        hydra.queue(next)?;
        Ok(())
    });

    hydra.queue(first).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(transport.executed(), vec![url("0"), url("1"), url("2")]);
}

#[tokio::test]
async fn test_requeue_after_completion_starts_new_cycle() {
    let (mut hydra, transport) = setup(None, MockTransport::new());
    let request = Request::new(url("again"));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    request.on_complete(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    hydra.queue(Arc::clone(&request)).unwrap();
    hydra.run().await.unwrap();
    hydra.queue(Arc::clone(&request)).unwrap();
    assert!(request.response().is_none());
    hydra.run().await.unwrap();

    assert_eq!(transport.executions_for(&url("again")), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_queue_front_jumps_the_line() {
    let (mut hydra, transport) = setup(Some(1), MockTransport::new());
    hydra.queue(Request::new(url("a"))).unwrap();
    hydra.queue(Request::new(url("b"))).unwrap();
    hydra.queue_front(Request::new(url("c"))).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(transport.executed(), vec![url("c"), url("a"), url("b")]);
}

#[tokio::test]
async fn test_stats_track_admissions_and_completions() {
    let (mut hydra, _transport) = setup(None, MockTransport::new());
    hydra.queue(Request::new(url("a"))).unwrap();
    hydra.queue(Request::new(url("b"))).unwrap();
    hydra.run().await.unwrap();

    let stats = hydra.stats();
    assert_eq!(stats.admitted, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.intercepted(), 0);
}

#[tokio::test]
async fn test_response_time_filled_in() {
    let transport = MockTransport::new().with_default_delay(Duration::from_millis(5));
    let (mut hydra, _transport) = setup(None, transport);
    let request = Request::new(url("slow"));
    hydra.queue(Arc::clone(&request)).unwrap();
    hydra.run().await.unwrap();

    assert!(request.response().unwrap().time() >= Duration::from_millis(5));
}

#[tokio::test]
async fn test_fire_and_forget_releases_queue() {
    let (mut hydra, transport) = setup(None, MockTransport::new());
    let request = Request::new(url("ff"));
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    request.on_complete(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    hydra.queue(Arc::clone(&request)).unwrap();

    assert_eq!(hydra.fire_and_forget().unwrap(), 1);
    assert_eq!(hydra.queued_len(), 0);

    for _ in 0..100 {
        if request.response().is_some() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(request.response().unwrap().code(), 200);
    assert!(request.performed());
    assert_eq!(transport.execution_count(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_fire_and_forget_needs_runtime() {
    let (mut hydra, _transport) = setup(None, MockTransport::new());
    hydra.queue(Request::new(url("ff"))).unwrap();
    assert!(matches!(hydra.fire_and_forget(), Err(HydraError::Runtime(_))));
    assert_eq!(hydra.queued_len(), 1);
}

#[test]
fn test_config_validation() {
    assert!(HydraConfig::default().validate().is_ok());
    assert!(HydraConfig::default().with_max_concurrency(0).validate().is_err());
    assert!(HydraConfig::default().with_max_concurrency(1).validate().is_ok());
}

#[test]
fn test_config_setters() {
    let (mut hydra, _transport) = setup(None, MockTransport::new());
    hydra.set_max_concurrency(Some(4));
    hydra.disable_memoization();
    hydra.set_retry_connect_timeouts(true);
    hydra.set_retry_codes([7, 56]);

    let config = hydra.config();
    assert_eq!(config.max_concurrency, Some(4));
    assert!(!hydra.memoization_enabled());
    assert!(config.retry.retry_connect_timeouts);
    assert_eq!(config.retry.retry_codes.len(), 2);

    hydra.enable_memoization();
    assert!(hydra.memoization_enabled());
}
