// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了爬取过程中的核心实体，包括：
/// - 价格区间（price_range）：单次查询的价格过滤窗口
/// - 搜索查询（query）：基础URL与区间、页码参数的组合
/// - 商品条目（listing）：原始条目与变体分组
/// - 爬取结果（crawl_result）：聚合结果与跳过记录
pub mod crawl_result;
pub mod listing;
pub mod price_range;
pub mod query;
