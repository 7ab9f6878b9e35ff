// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::models::crawl_result::CrawlResult;
use crate::domain::models::listing::{RawListing, VariantGroup};
use crate::utils::errors::IngestError;

/// 上传时附带的商品元数据
#[derive(Debug, Clone)]
pub struct IngestMeta {
    pub competitor: String,
    pub category_name: String,
    pub subcategory_name: String,
    /// 型号名称（通常为搜索名称）
    pub model_name: String,
}

/// 单个分组的上传负载
#[derive(Debug, Clone, Serialize)]
pub struct GroupPayload {
    pub item_name: String,
    pub category_name: String,
    pub subcategory_name: String,
    pub model_name: String,
    pub results: Vec<ListingPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPayload {
    pub competitor: String,
    pub title: String,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub condition: String,
    pub store: String,
    pub stable_id: Option<String>,
}

/// 上传统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub failed: usize,
}

impl GroupPayload {
    pub fn from_group(group: &VariantGroup, meta: &IngestMeta) -> Self {
        Self {
            item_name: group.key.clone(),
            category_name: meta.category_name.clone(),
            subcategory_name: meta.subcategory_name.clone(),
            model_name: meta.model_name.clone(),
            results: group
                .listings
                .iter()
                .map(|listing| ListingPayload::from_listing(listing, &meta.competitor))
                .collect(),
        }
    }
}

impl ListingPayload {
    fn from_listing(listing: &RawListing, competitor: &str) -> Self {
        let extra = |name: &str| listing.extra.get(name).cloned().unwrap_or_default();
        Self {
            competitor: competitor.to_string(),
            title: listing.title.clone(),
            url: listing.url.clone(),
            price: listing.price,
            condition: extra("condition"),
            store: extra("store"),
            stable_id: listing.id.clone(),
        }
    }
}

/// 结果上传客户端
///
/// 每个分组发送一次 JSON POST，单个分组失败只记录日志，不影响其余分组。
pub struct IngestClient {
    client: reqwest::Client,
    endpoint: String,
}

impl IngestClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// 上传单个分组
    pub async fn send(&self, payload: &GroupPayload) -> Result<(), IngestError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(IngestError::Status { status, body })
        }
    }

    /// 上传一次爬取的全部分组
    pub async fn upload(&self, result: &CrawlResult, meta: &IngestMeta) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for group in &result.variants {
            let payload = GroupPayload::from_group(group, meta);
            match self.send(&payload).await {
                Ok(()) => {
                    info!(item = %payload.item_name, listings = payload.results.len(), "Group uploaded");
                    summary.accepted += 1;
                }
                Err(e) => {
                    warn!(item = %payload.item_name, error = %e, "Group upload failed");
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
