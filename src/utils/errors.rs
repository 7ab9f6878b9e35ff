// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::models::crawl_result::SkippedRange;
use crate::engines::traits::EngineError;

/// 结果数量探测错误
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 结果数量指示器在超时内未渲染
    #[error("Result count indicator did not render within timeout: {url}")]
    Timeout { url: String },

    /// 指示器文本不含数字
    #[error("Result count indicator has no digits ({text:?}): {url}")]
    Parse { url: String, text: String },

    /// 浏览器会话错误
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// 页面抓取失败
#[derive(Error, Debug, Clone)]
#[error("Page {page} failed after {attempts} attempt(s): {reason}")]
pub struct FetchError {
    pub page: u32,
    pub attempts: u32,
    pub reason: String,
}

/// 爬取错误
///
/// 仅在初始区间发现阶段无法得到任何有效区间时向调用方抛出；
/// 单个页面或区间的失败记录在结果中，不会中断爬取。
#[derive(Error, Debug)]
pub enum CrawlError {
    /// 种子区间不合法（越界、重叠或未覆盖整个价格域）
    #[error("Invalid seed ranges: {0}")]
    InvalidSeeds(String),

    /// 价格域完全无法探测
    #[error("No valid ranges could be discovered ({} range(s) failed)", failures.len())]
    NoValidRanges { failures: Vec<SkippedRange> },
}

/// 上传错误
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Ingestion endpoint responded with status {status}: {body}")]
    Status { status: u16, body: String },
}
