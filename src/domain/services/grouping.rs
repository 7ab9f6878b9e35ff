// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::RawListing;

/// 分组策略
///
/// 每个类目一个纯函数 `(RawListing) -> 分组键`，注入到爬取核心中。
/// 键的大小写不影响分组，聚合时统一按小写比较。
pub trait GroupingStrategy: Send + Sync {
    fn group_key(&self, listing: &RawListing) -> String;
}

impl<F> GroupingStrategy for F
where
    F: Fn(&RawListing) -> String + Send + Sync,
{
    fn group_key(&self, listing: &RawListing) -> String {
        self(listing)
    }
}

/// 以去除首尾空白的标题为分组键
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleKey;

impl GroupingStrategy for TitleKey {
    fn group_key(&self, listing: &RawListing) -> String {
        listing.title.trim().to_string()
    }
}
