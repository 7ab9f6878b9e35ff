// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;

use crate::domain::models::listing::{normalize_key, RawListing, VariantGroup};
use crate::domain::services::grouping::GroupingStrategy;

/// 合并条目到已有分组
///
/// 对每个条目计算 `lower(key(listing))`：分组不存在时以原始大小写的键创建，
/// 然后追加条目。相同ID的条目不去重。
///
/// 合并满足交换律与结合律（以归一化键与组内成员为准），输出按归一化键排序。
pub fn merge(
    existing: Vec<VariantGroup>,
    incoming: Vec<RawListing>,
    strategy: &dyn GroupingStrategy,
) -> Vec<VariantGroup> {
    let aggregator = ResultAggregator::new();
    for group in existing {
        aggregator.absorb_group(group);
    }
    aggregator.add_all(incoming, strategy);
    aggregator.finish()
}

/// 并发安全的结果聚合器
///
/// 以小写分组键为索引，可在多个区间、多个工作者之间共享。
#[derive(Debug, Default)]
pub struct ResultAggregator {
    groups: DashMap<String, VariantGroup>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加单个条目
    pub fn add(&self, listing: RawListing, strategy: &dyn GroupingStrategy) {
        let key = strategy.group_key(&listing);
        self.groups
            .entry(normalize_key(&key))
            .or_insert_with(|| VariantGroup::new(key))
            .listings
            .push(listing);
    }

    /// 添加一批条目
    pub fn add_all(&self, listings: Vec<RawListing>, strategy: &dyn GroupingStrategy) {
        for listing in listings {
            self.add(listing, strategy);
        }
    }

    fn absorb_group(&self, group: VariantGroup) {
        let VariantGroup { key, listings } = group;
        self.groups
            .entry(normalize_key(&key))
            .or_insert_with(|| VariantGroup::new(key))
            .listings
            .extend(listings);
    }

    /// 当前分组数量
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 取出所有分组，按归一化键排序
    pub fn finish(self) -> Vec<VariantGroup> {
        let mut groups: Vec<(String, VariantGroup)> = self.groups.into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups.into_iter().map(|(_, g)| g).collect()
    }
}
