// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{main_only, Pipeline};
use parsegen::domain::models::url_prefix::{ProcessingStatus, SampleUrl, UrlPrefix};
use parsegen::domain::models::url_record::{UrlQueueItem, UrlRecord};
use parsegen::workers::Worker;

const PAGE_A: &str = r#"
<html><body>
  <nav><a href="/docs/b">Next</a> <a href="https://other.com/">Elsewhere</a></nav>
  <main><h1>Alpha</h1><p>First page</p></main>
</body></html>
"#;

const PAGE_B: &str = r#"
<html><body>
  <nav><a href="/docs/a">Back</a></nav>
  <main><p>Second page</p></main>
</body></html>
"#;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[tokio::test]
async fn test_url_flows_from_sample_to_parsed_record() {
    let p = Pipeline::new(
        &[
            ("https://example.com/docs/a", PAGE_A),
            ("https://example.com/docs/b", PAGE_B),
        ],
        main_only(),
        0,
    )
    .await;

    p.queue
        .push(&UrlQueueItem::new(UrlRecord::new("https://example.com/docs/a"), now()))
        .await
        .unwrap();

    // no parser yet: the page becomes a sample and the URL goes back on the queue
    p.crawl_worker.tick().await.unwrap();
    let prefix = p.repo.load_prefix("https://example.com/docs").await.unwrap().unwrap();
    assert_eq!(prefix.sample_urls.len(), 1);
    assert_eq!(p.queue.len::<UrlPrefix>().await.unwrap(), 1);
    assert_eq!(p.queue.len::<UrlQueueItem>().await.unwrap(), 1);

    p.synthesis_worker.tick().await.unwrap();
    let prefix = p.repo.load_prefix("https://example.com/docs").await.unwrap().unwrap();
    assert_eq!(prefix.processing_status, ProcessingStatus::Completed);
    assert!(prefix.parser_config.is_some());

    // parser exists now: the requeued URL is parsed and its outlink queued
    p.crawl_worker.tick().await.unwrap();
    let record = p.repo.load_url("https://example.com/docs/a").await.unwrap().unwrap();
    assert_eq!(record.parsed_content.as_deref(), Some("Alpha\n\nFirst page"));
    assert_eq!(record.prefix.as_deref(), Some("https://example.com/docs"));

    let next: UrlQueueItem = p.queue.pop().await.unwrap().unwrap();
    assert_eq!(next.url.url, "https://example.com/docs/b");
    p.queue.push(&next).await.unwrap();

    // page b links back to a, which is already parsed
    p.crawl_worker.tick().await.unwrap();
    let record = p.repo.load_url("https://example.com/docs/b").await.unwrap().unwrap();
    assert_eq!(record.parsed_content.as_deref(), Some("Second page"));
    assert_eq!(p.queue.len::<UrlQueueItem>().await.unwrap(), 0);
    assert_eq!(
        p.repo
            .count_urls_with_prefix("https://example.com/docs")
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_failed_prefix_is_reset_and_claimed() {
    let p = Pipeline::new(&[], main_only(), 30).await;
    let mut prefix = UrlPrefix::new("https://example.com/docs");
    prefix.add_sample(SampleUrl::new(
        "https://example.com/docs/a",
        "<main><p>Alpha</p></main>",
    ));
    prefix.processing_status = ProcessingStatus::Failed;
    p.repo.save_prefix(&prefix).await.unwrap();
    p.queue.push(&prefix).await.unwrap();

    p.synthesis_worker.tick().await.unwrap();

    // generation ran while the stored record was claimed
    assert_eq!(*p.provider.observed.lock(), vec!["in_progress".to_string()]);
    let stored = p.repo.load_prefix("https://example.com/docs").await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
}

#[tokio::test]
async fn test_full_prefix_drops_without_persisting() {
    let p = Pipeline::new(
        &[("https://example.com/docs/new", PAGE_A)],
        main_only(),
        30,
    )
    .await;

    let mut prefix = UrlPrefix::new("https://example.com/docs");
    prefix.processing_status = ProcessingStatus::Completed;
    prefix.parser_config = Some(parsegen::domain::models::parser_config::ParserConfig::new(
        "https://example.com/docs",
        main_only(),
    ));
    p.repo.save_prefix(&prefix).await.unwrap();
    for i in 0..20 {
        let mut record = UrlRecord::new(format!("https://example.com/docs/{}", i));
        record.prefix = Some("https://example.com/docs".to_string());
        record.parsed_content = Some("x".to_string());
        p.repo.save_url(&record).await.unwrap();
    }

    p.queue
        .push(&UrlQueueItem::new(UrlRecord::new("https://example.com/docs/new"), now()))
        .await
        .unwrap();
    p.crawl_worker.tick().await.unwrap();

    assert!(p.repo.load_url("https://example.com/docs/new").await.unwrap().is_none());
    assert_eq!(p.queue.len::<UrlQueueItem>().await.unwrap(), 0);
    assert_eq!(p.queue.len::<UrlPrefix>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_deferred_item_keeps_its_schedule() {
    let p = Pipeline::new(&[], main_only(), 30).await;
    let item = UrlQueueItem {
        url: UrlRecord::new("https://example.com/docs/a"),
        process_from_unix_timestamp: now() + 3600,
        times_queued: 1,
    };
    p.queue.push(&item).await.unwrap();

    p.crawl_worker.tick().await.unwrap();

    let back: UrlQueueItem = p.queue.pop().await.unwrap().unwrap();
    assert_eq!(back, item);
}
