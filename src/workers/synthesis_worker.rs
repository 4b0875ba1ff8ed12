// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::settings::SynthesisSettings;
use crate::domain::models::url_prefix::UrlPrefix;
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::domain::services::synthesis_service::{JobOutcome, SynthesisService};
use crate::queue::work_queue::JobQueue;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;

/// 解析器生成工作器的等待时间
#[derive(Debug, Clone, Copy)]
pub struct SynthesisBackoff {
    pub idle: Duration,
    pub paused: Duration,
    pub job: Duration,
}

impl From<&SynthesisSettings> for SynthesisBackoff {
    fn from(settings: &SynthesisSettings) -> Self {
        Self {
            idle: Duration::from_millis(settings.idle_backoff_ms),
            paused: Duration::from_millis(settings.paused_backoff_ms),
            job: Duration::from_millis(settings.job_backoff_ms),
        }
    }
}

/// 解析器生成工作器
pub struct SynthesisWorker {
    service: SynthesisService,
    repo: CrawlRepository,
    queue: JobQueue,
    name: String,
    backoff: SynthesisBackoff,
}

impl SynthesisWorker {
    pub fn new(
        service: SynthesisService,
        repo: CrawlRepository,
        queue: JobQueue,
        backoff: SynthesisBackoff,
    ) -> Self {
        Self {
            service,
            repo,
            queue,
            name: format!("synthesis worker {}", Uuid::new_v4()),
            backoff,
        }
    }
}

#[async_trait]
impl Worker for SynthesisWorker {
    async fn tick(&self) -> Result<Duration, WorkerError> {
        if !self.repo.is_running().await? {
            debug!("System is paused, synthesis worker waiting");
            return Ok(self.backoff.paused);
        }

        let Some(prefix) = self.queue.pop::<UrlPrefix>().await? else {
            return Ok(self.backoff.idle);
        };

        let outcome = self.service.process_prefix_job(prefix).await?;
        counter!("parsegen_synthesis_jobs_total", "outcome" => outcome.label()).increment(1);

        match &outcome {
            JobOutcome::Error { .. } => warn!("Synthesis job {}", outcome),
            _ => info!("Synthesis job {}", outcome),
        }
        Ok(self.backoff.job)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
