// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::domain::models::evaluation::{EvaluationResult, EvaluationSummary};
use crate::domain::models::synthesis_config::{SynthesisConfig, SynthesisConfigLoader};
use crate::domain::models::url_prefix::{ProcessingStatus, UrlPrefix};
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::domain::services::extraction_service::Parser;
use crate::domain::services::llm_service::InferenceProvider;
use crate::domain::services::parser_synthesizer::ParserSynthesizer;
use crate::utils::errors::{SynthesisError, WorkerError};

/// 解析器生成任务的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// 前缀正在处理或已经完成
    Skipped { reason: String },
    /// 已生成并保存解析器
    Success { prefix: String, config_name: String },
    /// 生成失败，前缀已标记为 failed（或未被认领）
    Error { reason: String },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Skipped { .. } => "skipped",
            JobOutcome::Success { .. } => "success",
            JobOutcome::Error { .. } => "error",
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            JobOutcome::Success {
                prefix,
                config_name,
            } => write!(f, "success: parser for {} generated with {}", prefix, config_name),
            JobOutcome::Error { reason } => write!(f, "error: {}", reason),
        }
    }
}

/// 解析器生成服务
///
/// 认领前缀、按生产配置生成解析器并写回结果
pub struct SynthesisService {
    repo: CrawlRepository,
    provider: Arc<dyn InferenceProvider>,
    loader: SynthesisConfigLoader,
}

impl SynthesisService {
    pub fn new(
        repo: CrawlRepository,
        provider: Arc<dyn InferenceProvider>,
        loader: SynthesisConfigLoader,
    ) -> Self {
        Self {
            repo,
            provider,
            loader,
        }
    }

    /// 确保设置了生产配置
    ///
    /// 未设置时选用配置目录中按字母序的第一个配置；目录为空时返回 `None`
    pub async fn ensure_production_config(&self) -> Result<Option<String>, SynthesisError> {
        if let Some(name) = self.repo.production_config().await? {
            return Ok(Some(name));
        }

        let Some(first) = self.loader.list()?.into_iter().next() else {
            warn!(
                "No synthesis configs found in {}",
                self.loader.dir().display()
            );
            return Ok(None);
        };

        self.repo.set_production_config(&first).await?;
        info!("No production config set, defaulting to {}", first);
        Ok(Some(first))
    }

    /// 读取当前生产配置
    async fn production_config(&self) -> Result<SynthesisConfig, SynthesisError> {
        let name = self
            .repo
            .production_config()
            .await?
            .ok_or_else(|| SynthesisError::Config("no production config set".to_string()))?;
        self.loader.load(&name)
    }

    /// 处理一个前缀任务
    ///
    /// 以存储中记录的状态为准，队列负载中的样本在认领时合并进已有记录。
    /// failed 的前缀先重置为 none，再和 none 一样以条件写认领为 in_progress。
    /// 认领之后的存储错误不会向上传播，前缀尽量标记为 failed 以便下次重试。
    ///
    /// # 返回值
    ///
    /// * `Ok(JobOutcome)` - 处理结果，生成失败也在其中
    /// * `Err(WorkerError)` - 认领之前的存储错误
    #[instrument(skip_all, fields(prefix = %queued.prefix))]
    pub async fn process_prefix_job(&self, queued: UrlPrefix) -> Result<JobOutcome, WorkerError> {
        let id = queued.prefix.clone();
        let current = self
            .repo
            .load_prefix(&id)
            .await?
            .unwrap_or_else(|| queued.clone());

        match current.processing_status {
            ProcessingStatus::InProgress => {
                info!("URLPrefix {} is already being processed, skipping", id);
                return Ok(JobOutcome::Skipped {
                    reason: "already in progress".to_string(),
                });
            }
            ProcessingStatus::Completed => {
                info!("URLPrefix {} already has a parser, skipping", id);
                return Ok(JobOutcome::Skipped {
                    reason: "already completed".to_string(),
                });
            }
            ProcessingStatus::Failed | ProcessingStatus::None => {}
        }

        let config = match self.production_config().await {
            Ok(config) => config,
            Err(e) => {
                warn!("Cannot load production synthesis config: {}", e);
                return Ok(JobOutcome::Error {
                    reason: e.to_string(),
                });
            }
        };

        let claimed = self
            .repo
            .update_prefix(&id, |stored| {
                let mut prefix = match stored {
                    Some(mut prefix) => {
                        for sample in &queued.sample_urls {
                            prefix.add_sample(sample.clone());
                        }
                        prefix
                    }
                    None => queued.clone(),
                };
                if prefix.processing_status == ProcessingStatus::Failed {
                    info!("Resetting failed URLPrefix {} to none", prefix.prefix);
                    prefix.processing_status = ProcessingStatus::None;
                }
                if !prefix
                    .processing_status
                    .can_transition_to(ProcessingStatus::InProgress)
                {
                    return None;
                }
                prefix.processing_status = ProcessingStatus::InProgress;
                Some(prefix)
            })
            .await?;

        let Some(claimed) = claimed else {
            info!("URLPrefix {} was claimed by another worker, skipping", id);
            return Ok(JobOutcome::Skipped {
                reason: "claimed by another worker".to_string(),
            });
        };

        info!(
            "Generating parser for {} with config {} ({} samples)",
            id,
            config.config_name,
            claimed.sample_urls.len()
        );
        let config_name = config.config_name.clone();
        let synthesizer = ParserSynthesizer::new(self.provider.clone(), config);

        match synthesizer.generate_parser(&claimed).await {
            Ok(parser) => {
                let stored = self
                    .repo
                    .update_prefix(&id, |stored| {
                        let mut prefix = stored?;
                        if !prefix
                            .processing_status
                            .can_transition_to(ProcessingStatus::Completed)
                        {
                            return None;
                        }
                        prefix.parser_config = Some(parser.config.clone());
                        prefix.processing_status = ProcessingStatus::Completed;
                        Some(prefix)
                    })
                    .await;

                let stored = match stored {
                    Ok(Some(stored)) => stored,
                    Ok(None) => {
                        warn!("URLPrefix {} changed state during generation, discarding parser", id);
                        return Ok(JobOutcome::Error {
                            reason: "prefix left in_progress during generation".to_string(),
                        });
                    }
                    Err(e) => {
                        warn!("Failed to store parser for URLPrefix {}: {}", id, e);
                        self.mark_failed(&id).await;
                        return Ok(JobOutcome::Error {
                            reason: format!("Failed to store parser: {}", e),
                        });
                    }
                };

                info!("Successfully generated parser for URLPrefix {}", id);
                self.log_evaluation(&stored, &parser, &config_name);
                Ok(JobOutcome::Success {
                    prefix: id,
                    config_name,
                })
            }
            Err(e) => {
                warn!("Failed to generate parser for URLPrefix {}: {}", id, e);
                self.mark_failed(&id).await;
                Ok(JobOutcome::Error {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// 把认领中的前缀标记为 failed
    ///
    /// 写入失败只记录日志，前缀会停留在 in_progress
    async fn mark_failed(&self, id: &str) {
        let result = self
            .repo
            .update_prefix(id, |stored| {
                let mut prefix = stored?;
                if !prefix
                    .processing_status
                    .can_transition_to(ProcessingStatus::Failed)
                {
                    return None;
                }
                prefix.processing_status = ProcessingStatus::Failed;
                Some(prefix)
            })
            .await;
        if let Err(e) = result {
            error!("Cannot mark URLPrefix {} as failed: {}", id, e);
        }
    }

    /// 在带标签的验证页面上评估新解析器并记录汇总
    fn log_evaluation(&self, prefix: &UrlPrefix, parser: &Parser, config_name: &str) {
        let results: Vec<EvaluationResult> = prefix
            .labeled_validation_urls()
            .filter_map(|sample| {
                let raw = sample.raw_content.as_deref()?;
                match parser.parse(raw) {
                    Ok(parsed) => sample.evaluate(&parsed, config_name, &prefix.prefix),
                    Err(e) => {
                        warn!("Cannot evaluate parser on {}: {}", sample.url, e);
                        None
                    }
                }
            })
            .collect();

        if let Some(summary) = EvaluationSummary::aggregate(&results, Some(&prefix.prefix), Some(config_name)) {
            info!(
                distance_norm = summary.distance_norm,
                exact_match = summary.exact_match,
                missing_content = summary.missing_content,
                extra_content = summary.extra_content,
                count = summary.count,
                "Evaluated parser for {} with {}",
                prefix.prefix,
                config_name
            );
        }
    }
}

#[cfg(test)]
#[path = "synthesis_service_test.rs"]
mod tests;
