// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::domain::models::price_range::PriceRange;
use crate::domain::models::query::SearchQuery;
use crate::engines::count_probe::ProbeOptions;
use crate::engines::listing_extractor::SelectorConfig;
use crate::engines::page_fetcher::FetchOptions;
use crate::utils::retry_policy::RetryPolicy;

/// 应用程序配置设置
///
/// 包含浏览器、爬取参数、页面选择器、搜索列表与结果上传等配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 爬取参数
    pub crawl: CrawlSettings,
    /// 页面选择器
    pub selectors: SelectorConfig,
    /// 搜索列表
    #[serde(default)]
    pub searches: Vec<SearchSettings>,
    /// 结果上传配置
    pub ingest: IngestSettings,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程调试地址（为空时启动本地浏览器）
    pub remote_debugging_url: Option<String>,
    /// CDP请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 自定义User-Agent
    pub user_agent: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
}

/// 爬取参数设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 每个区间的并发工作者数
    pub concurrency: usize,
    /// 每页结果数
    pub page_size: u32,
    /// 单次查询可分页访问的最大结果数
    pub result_cap: u64,
    /// 结果数量探测超时（秒）
    pub probe_timeout_secs: u64,
    /// 等待条目容器超时（秒）
    pub container_timeout_secs: u64,
    /// 等待条目数量稳定超时（秒）
    pub stabilize_timeout_secs: u64,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 判定稳定所需的连续相同采样数
    pub stable_samples: usize,
    /// 每页最大尝试次数
    pub max_attempts: u32,
    /// 重试前等待时间（毫秒）
    pub retry_backoff_ms: u64,
    /// 整体截止时间（秒）
    pub deadline_secs: Option<u64>,
}

impl CrawlSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// 构建结果数量探测选项
    pub fn probe_options(&self, selectors: &SelectorConfig) -> ProbeOptions {
        ProbeOptions {
            count_selector: selectors.count.clone(),
            no_results_selector: selectors.no_results.clone(),
            timeout: Duration::from_secs(self.probe_timeout_secs),
            poll_interval: self.poll_interval(),
        }
    }

    /// 构建页面抓取选项
    pub fn fetch_options(&self, selectors: &SelectorConfig) -> FetchOptions {
        FetchOptions {
            container_selector: selectors.container.clone(),
            pre_extract_click: selectors.pre_extract_click.clone(),
            container_timeout: Duration::from_secs(self.container_timeout_secs),
            stabilize_timeout: Duration::from_secs(self.stabilize_timeout_secs),
            poll_interval: self.poll_interval(),
            stable_samples: self.stable_samples.max(1),
            retry: RetryPolicy::for_pages(
                self.max_attempts,
                Duration::from_millis(self.retry_backoff_ms),
            ),
        }
    }
}

/// 单个搜索配置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// 搜索名称（上传时作为商品名）
    pub name: String,
    /// 基础搜索URL
    pub base_url: String,
    #[serde(default = "default_price_param")]
    pub price_param: String,
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// 完整价格域
    pub domain: PriceRange,
    /// 初始划分
    #[serde(default)]
    pub seed_ranges: Vec<PriceRange>,
}

impl SearchSettings {
    /// 解析为查询对象
    pub fn query(&self) -> Result<SearchQuery, url::ParseError> {
        let base_url = Url::parse(&self.base_url)?;
        Ok(SearchQuery::new(base_url).with_params(&self.price_param, &self.page_param))
    }
}

fn default_price_param() -> String {
    "price".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

/// 结果上传配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
    /// 上传接口地址（为空时不上传）
    pub endpoint: Option<String>,
    /// 竞争对手名称
    pub competitor: String,
    pub category_name: String,
    pub subcategory_name: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Settings {
    /// 从默认配置目录加载
    ///
    /// 加载顺序：内置默认值 → `config/default` → `config/{APP_ENVIRONMENT}` → `PRICECRAWL__*` 环境变量
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_dir("config")
    }

    /// 从指定目录加载配置
    pub fn from_dir(dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Browser defaults
            .set_default("browser.request_timeout_secs", 30)?
            .set_default("browser.window_width", 1280)?
            .set_default("browser.window_height", 800)?
            // Crawl defaults
            .set_default("crawl.concurrency", 3)?
            .set_default("crawl.page_size", 17)?
            .set_default("crawl.result_cap", 1000)?
            .set_default("crawl.probe_timeout_secs", 15)?
            .set_default("crawl.container_timeout_secs", 10)?
            .set_default("crawl.stabilize_timeout_secs", 10)?
            .set_default("crawl.poll_interval_ms", 250)?
            .set_default("crawl.stable_samples", 3)?
            .set_default("crawl.max_attempts", 2)?
            .set_default("crawl.retry_backoff_ms", 500)?
            // Selector defaults
            .set_default("selectors.container", ".wrapper-box")?
            .set_default("selectors.count", ".ais-Stats.stats-text p")?
            .set_default("selectors.title", ".content .card-title a")?
            .set_default("selectors.price", ".content .product-main-price")?
            .set_default("selectors.url", ".content .card-title a")?
            .set_default(
                "selectors.pre_extract_click",
                "div.trade-price-sort-panel .toggle-switch label span.slider",
            )?
            // Ingest defaults
            .set_default("ingest.competitor", "CEX")?
            .set_default("ingest.category_name", "smartphones and mobile")?
            .set_default("ingest.timeout_secs", 30)?
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", dir, env)).required(false))
            .add_source(Environment::with_prefix("PRICECRAWL").separator("__"));

        builder.build()?.try_deserialize()
    }
}
