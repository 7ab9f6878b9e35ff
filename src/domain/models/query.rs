// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::price_range::PriceRange;
use url::Url;

/// 搜索查询
///
/// 核心只把查询视为 `(base_url, price_range) -> url`：价格过滤以一个追加的
/// 区间参数表达，分页以页码参数表达。具体类目参数由调用方在 `base_url` 中给出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// 基础搜索URL（可含类目参数）
    pub base_url: Url,
    /// 价格区间参数名
    pub price_param: String,
    /// 页码参数名
    pub page_param: String,
}

impl SearchQuery {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            price_param: "price".to_string(),
            page_param: "page".to_string(),
        }
    }

    pub fn with_params(mut self, price_param: &str, page_param: &str) -> Self {
        self.price_param = price_param.to_string();
        self.page_param = page_param.to_string();
        self
    }

    /// 构建带价格过滤的查询URL（结果首页）
    pub fn range_url(&self, range: &PriceRange) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair(
            &self.price_param,
            &format!("{}:{}", range.min(), range.max()),
        );
        url
    }

    /// 构建指定页码的查询URL（页码从1开始）
    pub fn page_url(&self, range: &PriceRange, page: u32) -> Url {
        let mut url = self.range_url(range);
        url.query_pairs_mut()
            .append_pair(&self.page_param, &page.to_string());
        url
    }

    /// 从URL中解析价格区间参数
    pub fn parse_range(&self, url: &Url) -> Option<PriceRange> {
        let value = url
            .query_pairs()
            .find(|(k, _)| k == self.price_param.as_str())?
            .1;
        let (min, max) = value.split_once(':')?;
        PriceRange::new(min.parse().ok()?, max.parse().ok()?).ok()
    }

    /// 从URL中解析页码参数
    pub fn parse_page(&self, url: &Url) -> Option<u32> {
        url.query_pairs()
            .find(|(k, _)| k == self.page_param.as_str())
            .and_then(|(_, v)| v.parse().ok())
    }
}
