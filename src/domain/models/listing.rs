// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 原始商品条目
///
/// 由页面抓取器产出的最小单位。核心不对其做身份校验，
/// 分组键的计算交由调用方提供的策略完成。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    /// 站点侧商品ID（可能缺失）
    pub id: Option<String>,
    /// 商品标题
    pub title: String,
    /// 售价
    pub price: Option<f64>,
    /// 商品详情页绝对URL
    pub url: Option<String>,
    /// 额外字段（如以旧换新的代金券/现金价）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl RawListing {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            price: None,
            url: None,
            extra: BTreeMap::new(),
        }
    }
}

/// 变体分组
///
/// 共享同一归一化分组键的条目集合。`key` 保留首个创建该组的条目的原始大小写。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantGroup {
    pub key: String,
    pub listings: Vec<RawListing>,
}

impl VariantGroup {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            listings: Vec::new(),
        }
    }

    /// 归一化键（小写）
    pub fn normalized_key(&self) -> String {
        normalize_key(&self.key)
    }
}

/// 分组键归一化：统一为小写
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}
