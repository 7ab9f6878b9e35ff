// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use pricecrawl::domain::models::price_range::PriceRange;
use pricecrawl::domain::models::query::SearchQuery;
use pricecrawl::engines::listing_extractor::SelectorConfig;
use pricecrawl::engines::traits::{BrowserSession, EngineError, SessionFactory};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const BASE_URL: &str = "https://shop.example/search?stext=phone";

/// 商品目录中的一个条目
#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub price: u32,
}

/// 内存中的分页商品站点
///
/// 按URL中的价格区间与页码参数渲染HTML，统计页面加载与会话并发，
/// 并可按 (区间, 页码) 注入导航失败。
pub struct FakeSite {
    pub query: SearchQuery,
    items: Vec<Item>,
    page_size: usize,
    load_delay: Duration,
    page_failures: Mutex<HashMap<(PriceRange, u32), u32>>,
    dead_ranges: Mutex<HashSet<PriceRange>>,
    failing_sessions: AtomicUsize,
    pub page_loads: Mutex<HashMap<(PriceRange, u32), usize>>,
    pub probed: Mutex<Vec<PriceRange>>,
    pub open_sessions: AtomicUsize,
    pub max_open_sessions: AtomicUsize,
    pub sessions_opened: AtomicUsize,
}

impl FakeSite {
    pub fn new(items: Vec<Item>, page_size: usize) -> Arc<Self> {
        Arc::new(Self::build(items, page_size, Duration::ZERO))
    }

    pub fn with_delay(items: Vec<Item>, page_size: usize, load_delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(items, page_size, load_delay))
    }

    fn build(mut items: Vec<Item>, page_size: usize, load_delay: Duration) -> Self {
        items.sort_by_key(|item| item.price);
        Self {
            query: SearchQuery::new(Url::parse(BASE_URL).unwrap()),
            items,
            page_size,
            load_delay,
            page_failures: Mutex::new(HashMap::new()),
            dead_ranges: Mutex::new(HashSet::new()),
            failing_sessions: AtomicUsize::new(0),
            page_loads: Mutex::new(HashMap::new()),
            probed: Mutex::new(Vec::new()),
            open_sessions: AtomicUsize::new(0),
            max_open_sessions: AtomicUsize::new(0),
            sessions_opened: AtomicUsize::new(0),
        }
    }

    /// 一件商品一个价格：`prices[i]` 生成标题 `Phone {i}`
    pub fn catalog(prices: &[u32]) -> Vec<Item> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| Item {
                id: format!("SKU{}", i),
                title: format!("Phone {}", i),
                price,
            })
            .collect()
    }

    /// 接下来对该页的 `times` 次尝试都会导航失败（含重载）
    pub fn fail_page(&self, range: PriceRange, page: u32, times: u32) {
        self.page_failures
            .lock()
            .unwrap()
            .insert((range, page), times);
    }

    /// 该区间的数量指示器永不渲染
    pub fn kill_range(&self, range: PriceRange) {
        self.dead_ranges.lock().unwrap().insert(range);
    }

    /// 接下来 `n` 次打开会话失败
    pub fn fail_sessions(&self, n: usize) {
        self.failing_sessions.store(n, Ordering::SeqCst);
    }

    pub fn count_in(&self, range: &PriceRange) -> usize {
        self.items_in(range).len()
    }

    pub fn loads_of(&self, range: PriceRange, page: u32) -> usize {
        self.page_loads
            .lock()
            .unwrap()
            .get(&(range, page))
            .copied()
            .unwrap_or(0)
    }

    fn items_in(&self, range: &PriceRange) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.price >= range.min() && item.price <= range.max())
            .collect()
    }

    fn render(&self, range: &PriceRange, page: Option<u32>) -> String {
        let matching = self.items_in(range);
        let mut html = String::from("<html><body>");

        if self.dead_ranges.lock().unwrap().contains(range) {
            html.push_str("<div class=\"loading\">Loading</div></body></html>");
            return html;
        }

        if matching.is_empty() {
            html.push_str("<div class=\"no-results\">No results found</div>");
        } else {
            html.push_str(&format!(
                "<div class=\"ais-Stats stats-text\"><p>{} results</p></div>",
                with_commas(matching.len())
            ));
        }

        let page = page.unwrap_or(1).max(1) as usize;
        for item in matching
            .iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
        {
            html.push_str(&format!(
                "<div class=\"wrapper-box\"><div class=\"content\">\
                 <div class=\"card-title\"><a href=\"/product-detail?id={}\">{}</a></div>\
                 <div class=\"product-main-price\">£{}.00</div></div></div>",
                item.id, item.title, item.price
            ));
        }

        html.push_str("</body></html>");
        html
    }
}

fn with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// 与 [`FakeSite`] 标记一致的选择器
pub fn selectors() -> SelectorConfig {
    SelectorConfig {
        container: ".wrapper-box".to_string(),
        count: ".stats-text p".to_string(),
        no_results: Some(".no-results".to_string()),
        title: ".card-title a".to_string(),
        price: ".product-main-price".to_string(),
        url: ".card-title a".to_string(),
        id_attribute: None,
        id_query_param: "id".to_string(),
        pre_extract_click: None,
        extra: HashMap::new(),
    }
}

pub struct FakeFactory {
    pub site: Arc<FakeSite>,
}

impl FakeFactory {
    pub fn new(site: Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self { site })
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, EngineError> {
        let refused = self
            .site
            .failing_sessions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(EngineError::Browser("tab limit reached".to_string()));
        }

        let open = self.site.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.site.max_open_sessions.fetch_max(open, Ordering::SeqCst);
        self.site.sessions_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            site: self.site.clone(),
            html: String::new(),
            committed: None,
        }))
    }
}

pub struct FakeSession {
    site: Arc<FakeSite>,
    html: String,
    committed: Option<String>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<(), EngineError> {
        if !self.site.load_delay.is_zero() {
            tokio::time::sleep(self.site.load_delay).await;
        }

        let url = Url::parse(url).map_err(|e| EngineError::Navigation(e.to_string()))?;
        let range = self
            .site
            .query
            .parse_range(&url)
            .ok_or_else(|| EngineError::Navigation(format!("no price range in {}", url)))?;
        let page = self.site.query.parse_page(&url);

        match page {
            Some(page) => {
                let mut failures = self.site.page_failures.lock().unwrap();
                if let Some(remaining) = failures.get_mut(&(range, page)) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        // Fails before commit, so the previous page stays loaded
                        return Err(EngineError::Navigation("net::ERR_CONNECTION_RESET".to_string()));
                    }
                }
                drop(failures);
                *self
                    .site
                    .page_loads
                    .lock()
                    .unwrap()
                    .entry((range, page))
                    .or_insert(0) += 1;
            }
            None => self.site.probed.lock().unwrap().push(range),
        }

        self.html = self.site.render(&range, page);
        self.committed = Some(url.to_string());
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn current_url(&mut self) -> Result<Option<String>, EngineError> {
        Ok(self.committed.clone())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, EngineError> {
        Ok(select_texts(&self.html, selector)?.len())
    }

    async fn visible_texts(&mut self, selector: &str) -> Result<Vec<String>, EngineError> {
        Ok(select_texts(&self.html, selector)?
            .into_iter()
            .filter(|text| !text.is_empty())
            .collect())
    }

    async fn click(&mut self, selector: &str) -> Result<bool, EngineError> {
        Ok(!select_texts(&self.html, selector)?.is_empty())
    }

    async fn content(&mut self) -> Result<String, EngineError> {
        Ok(self.html.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), EngineError> {
        self.site.open_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn select_texts(html: &str, selector: &str) -> Result<Vec<String>, EngineError> {
    let selector = Selector::parse(selector)
        .map_err(|e| EngineError::Evaluation(format!("bad selector {}: {:?}", selector, e)))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect())
}
