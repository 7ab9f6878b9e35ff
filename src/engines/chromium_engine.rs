// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::settings::BrowserSettings;
use crate::engines::traits::{BrowserSession, EngineError, SessionFactory};

/// 基于 chromiumoxide 的会话工厂
///
/// 整个爬取过程共享一个浏览器实例，每个会话对应一个新标签页。
pub struct ChromiumSessionFactory {
    browser: Arc<Browser>,
    user_agent: Option<String>,
    handler: JoinHandle<()>,
}

impl ChromiumSessionFactory {
    /// 启动本地Chrome或连接远程实例
    ///
    /// 远程调试地址优先取配置，其次取 `CHROMIUM_REMOTE_DEBUGGING_URL` 环境变量。
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, EngineError> {
        let remote_debugging_url = settings
            .remote_debugging_url
            .clone()
            .or_else(|| std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok());

        let (browser, mut handler) = if let Some(ref url) = remote_debugging_url {
            tracing::info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url).await.map_err(|e| {
                EngineError::Browser(format!("Failed to connect to remote Chrome: {}", e))
            })?
        } else {
            let builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(Duration::from_secs(settings.request_timeout_secs))
                .window_size(settings.window_width, settings.window_height)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-blink-features=AutomationControlled");

            Browser::launch(builder.build().map_err(EngineError::Browser)?)
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?
        };

        // Browser events must be drained for CDP calls to make progress
        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            user_agent: settings.user_agent.clone(),
            handler,
        })
    }
}

impl Drop for ChromiumSessionFactory {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, EngineError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))?;

        if let Some(ua) = &self.user_agent {
            page.set_user_agent(ua.as_str())
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;
        }

        Ok(Box::new(ChromiumSession { page }))
    }
}

/// 单个标签页会话
pub struct ChromiumSession {
    page: Page,
}

impl ChromiumSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, EngineError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| EngineError::Evaluation(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| EngineError::Evaluation(e.to_string()))
    }
}

/// 将选择器编码为JS字符串字面量
fn js_string(selector: &str) -> String {
    serde_json::Value::String(selector.to_string()).to_string()
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<(), EngineError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| EngineError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), EngineError> {
        self.page
            .reload()
            .await
            .map_err(|e| EngineError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<Option<String>, EngineError> {
        self.page
            .url()
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))
    }

    async fn count(&mut self, selector: &str) -> Result<usize, EngineError> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        );
        self.eval(script).await
    }

    async fn visible_texts(&mut self, selector: &str) -> Result<Vec<String>, EngineError> {
        let script = format!(
            r#"Array.from(document.querySelectorAll({}))
                .filter((el) => {{
                    const style = window.getComputedStyle(el);
                    const rect = el.getBoundingClientRect();
                    return style.visibility !== "hidden" && style.display !== "none"
                        && (rect.width > 0 || rect.height > 0);
                }})
                .map((el) => (el.textContent || "").trim())"#,
            js_string(selector)
        );
        self.eval(script).await
    }

    async fn click(&mut self, selector: &str) -> Result<bool, EngineError> {
        match self.page.find_element(selector).await {
            Ok(element) => {
                element
                    .click()
                    .await
                    .map_err(|e| EngineError::Browser(format!("Click failed: {}", e)))?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn content(&mut self) -> Result<String, EngineError> {
        self.page
            .content()
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), EngineError> {
        self.page
            .close()
            .await
            .map_err(|e| EngineError::Browser(e.to_string()))
    }
}
