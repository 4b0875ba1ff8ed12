// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 按负载类型划分的先进先出工作队列
pub mod work_queue;

pub use work_queue::{JobQueue, Queueable, WorkQueue};
