// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::settings::CrawlerSettings;
use crate::domain::models::url_record::UrlQueueItem;
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::domain::services::crawl_service::{FrontierService, ProcessOutcome};
use crate::queue::work_queue::JobQueue;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;

/// 抓取工作器的等待时间
#[derive(Debug, Clone, Copy)]
pub struct CrawlBackoff {
    pub idle: Duration,
    pub paused: Duration,
    pub item: Duration,
    pub deferred: Duration,
}

impl From<&CrawlerSettings> for CrawlBackoff {
    fn from(settings: &CrawlerSettings) -> Self {
        Self {
            idle: Duration::from_millis(settings.idle_backoff_ms),
            paused: Duration::from_millis(settings.paused_backoff_ms),
            item: Duration::from_millis(settings.item_backoff_ms),
            deferred: Duration::from_millis(settings.deferred_backoff_ms),
        }
    }
}

/// 抓取工作器
///
/// 从 URL 队列取出一项交给调度服务处理
pub struct CrawlWorker {
    service: FrontierService,
    repo: CrawlRepository,
    queue: JobQueue,
    name: String,
    backoff: CrawlBackoff,
}

impl CrawlWorker {
    pub fn new(
        service: FrontierService,
        repo: CrawlRepository,
        queue: JobQueue,
        backoff: CrawlBackoff,
    ) -> Self {
        Self {
            service,
            repo,
            queue,
            name: format!("crawl worker {}", Uuid::new_v4()),
            backoff,
        }
    }
}

#[async_trait]
impl Worker for CrawlWorker {
    async fn tick(&self) -> Result<Duration, WorkerError> {
        if !self.repo.is_running().await? {
            debug!("System is paused, crawl worker waiting");
            return Ok(self.backoff.paused);
        }

        let Some(item) = self.queue.pop::<UrlQueueItem>().await? else {
            return Ok(self.backoff.idle);
        };

        let outcome = self.service.process_item(item, Utc::now().timestamp()).await?;
        counter!("parsegen_crawl_items_total", "outcome" => outcome.label()).increment(1);

        Ok(match &outcome {
            ProcessOutcome::Deferred => self.backoff.deferred,
            ProcessOutcome::Dropped { .. } => Duration::ZERO,
            ProcessOutcome::Error { .. } => {
                warn!("Crawl item {}", outcome);
                self.backoff.item
            }
            _ => {
                info!("Crawl item {}", outcome);
                self.backoff.item
            }
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
