// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// 出错后的等待时间
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Worker trait定义
///
/// 所有后台工作器都必须实现此trait。`tick` 处理至多一项工作并返回下一次之前的等待时间，
/// `run` 负责循环、出错退避和关闭信号。
#[async_trait]
pub trait Worker: Send + Sync {
    /// 执行一次迭代
    async fn tick(&self) -> Result<Duration, WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &str;

    /// 运行工作器，直到收到关闭信号
    ///
    /// 关闭信号只在两次迭代之间检查，正在处理的项不会被打断
    async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        info!("{} started", self.name());

        while !*shutdown.borrow() {
            let pause = match self.tick().await {
                Ok(pause) => pause,
                Err(e) => {
                    error!("{} error: {}", self.name(), e);
                    ERROR_BACKOFF
                }
            };

            if pause.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("{} stopped", self.name());
        Ok(())
    }
}
