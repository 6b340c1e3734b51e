//! Concurrency properties of the inference lock.
//!
//! The recording extractor sleeps between logging `Embed(i)` and returning, so
//! any interleaving the lock failed to prevent would show up in the log.

mod common;

use std::time::Duration;

use common::harness::{TestServerConfig, build_test_service, spawn_test_server};
use common::recording::Event;

fn batch(range: std::ops::Range<usize>) -> String {
    range.map(|i| format!("q{i}")).collect::<Vec<_>>().join(";")
}

fn slow_config() -> TestServerConfig {
    TestServerConfig {
        embed_delay: Duration::from_millis(15),
        ..TestServerConfig::default()
    }
}

/// Every `Embed(i)` is immediately followed by the matching `Infer(i)`.
fn assert_pairs_unbroken(events: &[Event]) {
    assert_eq!(events.len() % 2, 0, "unpaired events: {events:?}");
    for pair in events.chunks(2) {
        match pair {
            [Event::Embed(a), Event::Infer(b)] => assert_eq!(a, b, "events: {events:?}"),
            other => panic!("expected Embed followed by Infer, got {other:?}"),
        }
    }
}

/// Events for query indices in `range` form one contiguous run, in order.
fn assert_batch_contiguous(events: &[Event], range: std::ops::Range<usize>) {
    let positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| match e {
            Event::Embed(i) | Event::Infer(i) => range.contains(i),
        })
        .map(|(pos, _)| pos)
        .collect();

    assert_eq!(positions.len(), range.len() * 2);
    let first = positions[0];
    assert!(
        positions.iter().enumerate().all(|(k, &p)| p == first + k),
        "batch {range:?} interleaved: {events:?}"
    );

    let embeds: Vec<usize> = events[first..first + positions.len()]
        .iter()
        .filter_map(|e| match e {
            Event::Embed(i) => Some(*i),
            Event::Infer(_) => None,
        })
        .collect();
    assert_eq!(embeds, range.collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_batches_do_not_interleave() {
    let ctx = build_test_service(&slow_config());
    let video = ctx.write_video("match.mp4");
    ctx.service.extract_video(&video).await.unwrap();

    let first = batch(0..5);
    let second = batch(10..15);
    let (a, b) = tokio::join!(
        ctx.service.run_queries(&first),
        ctx.service.run_queries(&second)
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.len(), 5);
    assert_eq!(b.len(), 5);
    assert_eq!(a[0].query, "q0");
    assert_eq!(b[4].query, "q14");

    let events = ctx.log.events();
    assert_eq!(events.len(), 20);
    assert_pairs_unbroken(&events);
    assert_batch_contiguous(&events, 0..5);
    assert_batch_contiguous(&events, 10..15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_single_queries_pair_embed_with_infer() {
    let ctx = build_test_service(&slow_config());
    let video = ctx.write_video("match.mp4");
    ctx.service.extract_video(&video).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = ctx.service.clone();
        handles.push(tokio::spawn(async move {
            let query = format!("q{i}");
            service.run_queries(&query).await
        }));
    }
    for handle in handles {
        let results = handle.await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
    }

    let events = ctx.log.events();
    assert_eq!(events.len(), 16);
    assert_pairs_unbroken(&events);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_extraction_waits_for_running_batch() {
    let ctx = build_test_service(&slow_config());
    let first = ctx.write_video("a.mp4");
    ctx.service.extract_video(&first).await.unwrap();

    let replacement = ctx.write_video("b.mp4");
    let queries = batch(0..4);
    let (results, status) = tokio::join!(ctx.service.run_queries(&queries), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        ctx.service.extract_video(&replacement).await
    });

    assert_eq!(results.unwrap().len(), 4);
    assert_eq!(status.unwrap().clips, 12);

    // The batch observed a single video throughout.
    let events = ctx.log.events();
    assert_pairs_unbroken(&events);
    assert_batch_contiguous(&events, 0..4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_http_batches_do_not_interleave() {
    let server = spawn_test_server(slow_config()).await.unwrap();
    let video = server.inner.write_video("match.mp4");
    server.inner.service.extract_video(&video).await.unwrap();

    let client = reqwest::Client::new();
    let url = format!("{}/api/query", server.url());
    let send = |query: String| {
        let client = client.clone();
        let url = url.clone();
        async move {
            client
                .post(&url)
                .json(&serde_json::json!({ "query": query }))
                .send()
                .await
                .unwrap()
        }
    };

    let (a, b) = tokio::join!(send(batch(0..3)), send(batch(20..23)));
    assert!(a.status().is_success());
    assert!(b.status().is_success());

    let events = server.inner.log.events();
    assert_pairs_unbroken(&events);
    assert_batch_contiguous(&events, 0..3);
    assert_batch_contiguous(&events, 20..23);
}
