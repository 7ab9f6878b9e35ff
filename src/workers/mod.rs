// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 固定数量的工作者并发消费页面队列
pub mod page_worker_pool;

pub use page_worker_pool::WorkerPool;
