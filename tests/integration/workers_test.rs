// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{main_only, quick_crawl_backoff, Pipeline};
use parsegen::domain::models::run_state::RunState;
use parsegen::domain::models::url_record::{UrlQueueItem, UrlRecord};
use parsegen::workers::{Worker, WorkerManager};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_paused_system_leaves_queue_untouched() {
    let p = Pipeline::new(&[], main_only(), 30).await;
    p.repo.set_run_state(RunState::Paused).await.unwrap();
    p.queue
        .push(&UrlQueueItem::new(UrlRecord::new("https://example.com/docs/a"), 0))
        .await
        .unwrap();

    let pause = p.crawl_worker.tick().await.unwrap();

    assert_eq!(pause, quick_crawl_backoff().paused);
    assert_eq!(p.queue.len::<UrlQueueItem>().await.unwrap(), 1);
}

#[tokio::test]
async fn test_idle_worker_waits() {
    let p = Pipeline::new(&[], main_only(), 30).await;
    let pause = p.crawl_worker.tick().await.unwrap();
    assert_eq!(pause, quick_crawl_backoff().idle);
}

#[tokio::test]
async fn test_manager_runs_both_workers_until_shutdown() {
    let p = Pipeline::new(
        &[("https://example.com/docs/a", "<main><p>Alpha</p></main>")],
        main_only(),
        0,
    )
    .await;
    p.queue
        .push(&UrlQueueItem::new(UrlRecord::new("https://example.com/docs/a"), 0))
        .await
        .unwrap();

    let repo = p.repo.clone();
    let mut manager = WorkerManager::new();
    manager.spawn(Arc::new(p.crawl_worker));
    manager.spawn(Arc::new(p.synthesis_worker));

    let mut parsed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Some(record) = repo.load_url("https://example.com/docs/a").await.unwrap() {
            parsed = record.is_parsed();
            if parsed {
                break;
            }
        }
    }
    manager.shutdown().await;

    assert!(parsed);
}
