// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::worker::Worker;
use futures::future::join_all;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 启动工作器并在关闭时等待它们完成当前迭代
pub struct WorkerManager {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// 启动一个工作器
    pub fn spawn(&mut self, worker: Arc<dyn Worker>) {
        let shutdown = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = worker.run(shutdown).await {
                error!("{} exited with error: {}", worker.name(), e);
            }
        });
        self.handles.push(handle);
    }

    /// 发出关闭信号并等待所有工作器退出
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        let _ = self.shutdown_tx.send(true);
        for result in join_all(self.handles.drain(..)).await {
            if let Err(e) = result {
                error!("Worker task failed: {}", e);
            }
        }
        info!("Workers shut down successfully");
    }

    /// 等待关闭信号并关闭工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
        self.shutdown().await;
    }
}
