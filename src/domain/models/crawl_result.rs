// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::models::listing::{RawListing, VariantGroup};
use crate::domain::models::price_range::PriceRange;

/// 超过爬取截止时间时记录的跳过原因
pub const DEADLINE_REASON: &str = "crawl deadline reached";

/// 被跳过的页面
///
/// 两次尝试均失败、会话无法打开或超过爬取截止时间的页面。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedPage {
    pub range: PriceRange,
    pub page: u32,
    /// 实际尝试次数（未尝试时为0）
    pub attempts: u32,
    pub reason: String,
}

/// 被跳过的价格区间
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRange {
    pub range: PriceRange,
    pub reason: String,
}

/// 单个区间的抓取摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSummary {
    pub range: PriceRange,
    /// 站点报告的结果总数
    pub count: u64,
    pub total_pages: u32,
    /// 成功抓取的页数
    pub fetched_pages: u32,
    pub listings: usize,
    /// 不可再分但仍超出上限的区间
    pub capped: bool,
}

/// 爬取结果
///
/// 编排器的输出。返回后完全归调用方所有，核心不再持有任何引用。
/// 除聚合数据外还携带跳过记录，调用方可据此判断结果是否完整。
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub crawl_id: Uuid,
    pub listings: Vec<RawListing>,
    pub variants: Vec<VariantGroup>,
    pub ranges: Vec<RangeSummary>,
    pub skipped_pages: Vec<SkippedPage>,
    pub skipped_ranges: Vec<SkippedRange>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// 是否没有任何页面或区间被跳过，且没有被截断的区间
    pub fn is_complete(&self) -> bool {
        self.skipped_pages.is_empty()
            && self.skipped_ranges.is_empty()
            && self.ranges.iter().all(|r| !r.capped)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
