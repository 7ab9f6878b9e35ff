// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 价格区间错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// 下界大于上界
    #[error("Inverted price range: min {min} > max {max}")]
    Inverted { min: u32, max: u32 },
}

/// 价格区间
///
/// 一次查询的价格过滤窗口，上下界均为闭区间。
/// 通过 [`PriceRange::new`] 构造时保证 `min <= max`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PriceRange {
    min: u32,
    max: u32,
}

impl PriceRange {
    /// 创建价格区间
    ///
    /// # 参数
    ///
    /// * `min` - 下界（包含）
    /// * `max` - 上界（包含）
    ///
    /// # 返回值
    ///
    /// * `Ok(PriceRange)` - 合法区间
    /// * `Err(RangeError::Inverted)` - 下界大于上界
    pub fn new(min: u32, max: u32) -> Result<Self, RangeError> {
        if min > max {
            return Err(RangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// 区间中点（向下取整）
    pub fn midpoint(&self) -> u32 {
        // min + (max - min) / 2 == floor((min + max) / 2) for unsigned bounds, without overflow
        self.min + (self.max - self.min) / 2
    }

    /// 二分区间
    ///
    /// 返回 `[min, mid]` 与 `[mid + 1, max]`。当中点与任一端点重合时区间不可再分，返回 `None`。
    pub fn bisect(&self) -> Option<(PriceRange, PriceRange)> {
        let mid = self.midpoint();
        if mid == self.min || mid == self.max {
            return None;
        }
        Some((
            PriceRange {
                min: self.min,
                max: mid,
            },
            PriceRange {
                min: mid + 1,
                max: self.max,
            },
        ))
    }

    /// 判断是否完全包含另一个区间
    pub fn contains(&self, other: &PriceRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// 判断两个区间是否有交集
    pub fn overlaps(&self, other: &PriceRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

impl TryFrom<(u32, u32)> for PriceRange {
    type Error = RangeError;

    fn try_from((min, max): (u32, u32)) -> Result<Self, Self::Error> {
        PriceRange::new(min, max)
    }
}

// Deserialize through the validating constructor so config files cannot smuggle in inverted pairs
impl<'de> Deserialize<'de> for PriceRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Pair(u32, u32),
            Named { min: u32, max: u32 },
        }

        let (min, max) = match Raw::deserialize(deserializer)? {
            Raw::Pair(min, max) => (min, max),
            Raw::Named { min, max } => (min, max),
        };
        PriceRange::new(min, max).map_err(serde::de::Error::custom)
    }
}
