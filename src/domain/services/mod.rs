// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 区间发现（range_discoverer）：把价格域二分为结果数不超过上限的子区间
/// - 结果聚合（result_aggregator）：按分组键合并条目
/// - 分组策略（grouping）：调用方注入的分组键函数
/// - 爬取编排（crawl_orchestrator）：串联发现、抓取与聚合
pub mod crawl_orchestrator;
pub mod grouping;
pub mod range_discoverer;
pub mod result_aggregator;
