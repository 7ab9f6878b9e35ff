// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use url::Url;

use crate::domain::models::listing::RawListing;
use crate::utils::text_processing::parse_price;
use crate::utils::url_utils::{query_param, resolve_url};

/// 条目提取回调
///
/// 页面抓取器只负责加载和等待渲染稳定，字段解析交给此接口。
pub trait ListingExtractor: Send + Sync {
    /// 从页面HTML中提取条目
    fn extract(&self, html: &str, page_url: &Url) -> Vec<RawListing>;
}

impl<F> ListingExtractor for F
where
    F: Fn(&str, &Url) -> Vec<RawListing> + Send + Sync,
{
    fn extract(&self, html: &str, page_url: &Url) -> Vec<RawListing> {
        self(html, page_url)
    }
}

/// 页面选择器配置
///
/// `container`、`count` 与可选的 `no_results` 是爬取核心需要的三个选择器；
/// 其余用于条目字段提取。
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// 条目容器选择器
    pub container: String,
    /// 结果数量指示器选择器
    pub count: String,
    /// "无结果" 指示器选择器
    #[serde(default)]
    pub no_results: Option<String>,
    /// 标题选择器（相对容器）
    pub title: String,
    /// 价格选择器（相对容器）
    pub price: String,
    /// 链接选择器（相对容器）
    pub url: String,
    /// 容器上携带ID的属性名
    #[serde(default)]
    pub id_attribute: Option<String>,
    /// 链接中携带ID的查询参数名
    #[serde(default = "default_id_query_param")]
    pub id_query_param: String,
    /// 提取前点击的元素（如以旧换新价格开关）
    #[serde(default)]
    pub pre_extract_click: Option<String>,
    /// 额外字段：字段名 -> 选择器（相对容器）
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

fn default_id_query_param() -> String {
    "id".to_string()
}

/// 基于CSS选择器的条目提取器
pub struct SelectorExtractor {
    container: Selector,
    title: Selector,
    price: Selector,
    url: Selector,
    id_attribute: Option<String>,
    id_query_param: String,
    extra: Vec<(String, Selector)>,
}

impl SelectorExtractor {
    /// 编译选择器
    ///
    /// # 返回值
    ///
    /// * `Ok(SelectorExtractor)` - 所有选择器合法
    /// * `Err(String)` - 第一个无法解析的选择器
    pub fn new(config: &SelectorConfig) -> Result<Self, String> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| format!("Invalid selector {:?}: {}", s, e));

        let mut extra = config
            .extra
            .iter()
            .map(|(name, sel)| Ok((name.clone(), parse(sel)?)))
            .collect::<Result<Vec<_>, String>>()?;
        extra.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            container: parse(&config.container)?,
            title: parse(&config.title)?,
            price: parse(&config.price)?,
            url: parse(&config.url)?,
            id_attribute: config.id_attribute.clone(),
            id_query_param: config.id_query_param.clone(),
            extra,
        })
    }

    fn text_of(card: &ElementRef<'_>, selector: &Selector) -> Option<String> {
        card.select(selector)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn extract_card(&self, card: ElementRef<'_>, page_url: &Url) -> Option<RawListing> {
        let title = Self::text_of(&card, &self.title)?;
        let price_text = Self::text_of(&card, &self.price)?;

        let url = card
            .select(&self.url)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| resolve_url(page_url, href).ok());

        let id = self
            .id_attribute
            .as_deref()
            .and_then(|attr| card.value().attr(attr))
            .map(|s| s.to_string())
            .or_else(|| url.as_ref().and_then(|u| query_param(u, &self.id_query_param)));

        let extra: BTreeMap<String, String> = self
            .extra
            .iter()
            .filter_map(|(name, sel)| Self::text_of(&card, sel).map(|v| (name.clone(), v)))
            .collect();

        Some(RawListing {
            id,
            title,
            price: parse_price(&price_text),
            url: url.map(String::from),
            extra,
        })
    }
}

impl ListingExtractor for SelectorExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();
        let mut dropped = 0usize;

        for card in document.select(&self.container) {
            match self.extract_card(card, page_url) {
                Some(listing) => listings.push(listing),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(dropped, url = %page_url, "Skipped cards without title or price");
        }

        listings
    }
}
