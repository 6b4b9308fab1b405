//! External response cache bridge tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hydra_core::{
    CacheError, CacheHooks, Globals, Hydra, HydraConfig, MemoryCache, MemoryCacheConfig,
    MockTransport, Request, Response, ResponseCache,
};

fn setup() -> (Hydra, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let hydra =
        Hydra::with_globals(HydraConfig::default(), transport.clone(), Arc::new(Globals::new()));
    (hydra, transport)
}

fn url(path: &str) -> String {
    format!("http://localhost:3000/{path}")
}

/// Cache hooks that count reads and writes and answer from `hit`.
fn counting_cache(
    hit: Option<Response>,
) -> (Arc<CacheHooks>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let reads = Arc::new(AtomicUsize::new(0));
    let writes = Arc::new(AtomicUsize::new(0));
    let hit = hit.map(Arc::new);
    let cache = {
        let reads = Arc::clone(&reads);
        let writes = Arc::clone(&writes);
        CacheHooks::new(
            move |_| {
                reads.fetch_add(1, Ordering::SeqCst);
                Ok(hit.clone())
            },
            move |_, _| {
                writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
    };
    (Arc::new(cache), reads, writes)
}

#[tokio::test]
async fn test_cache_hit_skips_transport() {
    let (mut hydra, transport) = setup();
    let (cache, reads, _writes) = counting_cache(Some(Response::new(200).with_body("cached")));
    hydra.set_cache(cache);

    let request = Request::new(url("c"));
    hydra.queue(Arc::clone(&request)).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(request.response().unwrap().text(), "cached");
    assert!(!request.performed());
    assert_eq!(transport.execution_count(), 0);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert_eq!(hydra.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_cache_miss_goes_to_transport() {
    let (mut hydra, transport) = setup();
    let (cache, reads, _writes) = counting_cache(None);
    hydra.set_cache(cache);

    hydra.queue(Request::new(url("miss"))).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert_eq!(transport.execution_count(), 1);
}

#[tokio::test]
async fn test_cache_consulted_for_get_only() {
    let (mut hydra, transport) = setup();
    let (cache, reads, _writes) = counting_cache(Some(Response::new(200)));
    hydra.set_cache(cache);

    hydra.queue(Request::post(url("p")).body("x").build()).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert_eq!(transport.execution_count(), 1);
}

#[tokio::test]
async fn test_write_through_requires_cache_timeout() {
    let (mut hydra, _transport) = setup();
    let (cache, _reads, writes) = counting_cache(None);
    hydra.set_cache(cache);

    hydra.queue(Request::new(url("none"))).unwrap();
    hydra
        .queue(Request::get(url("zero")).cache_timeout(Duration::ZERO).build())
        .unwrap();
    hydra
        .queue(Request::get(url("ttl")).cache_timeout(Duration::from_secs(60)).build())
        .unwrap();
    hydra.run().await.unwrap();

    assert_eq!(writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cache_hit_not_written_back() {
    let (mut hydra, _transport) = setup();
    let (cache, _reads, writes) = counting_cache(Some(Response::new(200)));
    hydra.set_cache(cache);

    hydra
        .queue(Request::get(url("hit")).cache_timeout(Duration::from_secs(60)).build())
        .unwrap();
    hydra.run().await.unwrap();

    assert_eq!(writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cache_errors_are_swallowed() {
    let (mut hydra, transport) = setup();
    hydra.set_cache(Arc::new(CacheHooks::new(
        |_| Err(CacheError::Unavailable("connection refused".into())),
        |_, _| Err(CacheError::Rejected("too large".into())),
    )));
    let fired = Arc::new(AtomicUsize::new(0));

    let request = Request::get(url("e")).cache_timeout(Duration::from_secs(5)).build();
    {
        let fired = Arc::clone(&fired);
        request.on_complete(move |_, response| {
            assert_eq!(response.code(), 200);
            fired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    hydra.queue(request).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(transport.execution_count(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(hydra.stats().cache_errors, 2);
}

#[tokio::test]
async fn test_memory_cache_serves_second_run() {
    let (mut hydra, transport) = setup();
    let cache = Arc::new(MemoryCache::new(MemoryCacheConfig::default()));
    hydra.set_cache(cache.clone());

    let build = || Request::get(url("mem")).cache_timeout(Duration::from_secs(60)).build();

    let first = build();
    hydra.queue(Arc::clone(&first)).unwrap();
    hydra.run().await.unwrap();
    assert_eq!(cache.len(), 1);

    let second = build();
    hydra.queue(Arc::clone(&second)).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(transport.execution_count(), 1);
    assert!(!second.performed());
    assert!(Arc::ptr_eq(&first.response().unwrap(), &second.response().unwrap()));
}

#[tokio::test]
async fn test_clear_cache_detaches_bridge() {
    let (mut hydra, transport) = setup();
    let (cache, reads, _writes) = counting_cache(Some(Response::new(200)));
    hydra.set_cache(cache);
    hydra.clear_cache();

    hydra.queue(Request::new(url("detached"))).unwrap();
    hydra.run().await.unwrap();

    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert_eq!(transport.execution_count(), 1);
}

#[test]
fn test_memory_cache_ttl_expiry() {
    let cache = MemoryCache::default();
    let request = Request::get(url("ttl")).cache_timeout(Duration::from_millis(1)).build();
    cache.set(&request, &Arc::new(Response::new(200))).unwrap();
    assert!(cache.get(&request).unwrap().is_some());

    std::thread::sleep(Duration::from_millis(5));
    assert!(cache.get(&request).unwrap().is_none());
}
