// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 页面文本解析
//!
//! 从渲染后的页面文本中提取价格与结果数量。

use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid price regex"));

static COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d[\d,]*)\s+results?\b").expect("valid count regex"));

static DIGIT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*").expect("valid digit run regex"));

/// 解析价格文本
///
/// 支持 `"£1,299.99"`、`"£399"`、`"(£12.50)"` 等形式；区间价格 `"£399 to £499"`
/// 取第一个值。无数字时返回 `None`。
pub fn parse_price(text: &str) -> Option<f64> {
    let text = text.split(" to ").next().unwrap_or(text);
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '£' | ',' | '(' | ')'))
        .collect();
    PRICE_RE
        .find(cleaned.trim())
        .and_then(|m| m.as_str().parse().ok())
}

/// 解析结果数量文本
///
/// 取紧跟 `results` 的数字（允许千位逗号），如 `"1 - 17 of 1,234 results"` → `1234`。
/// 没有 `results` 字样时，仅当文本只含一段数字才采用该数字。
pub fn parse_count(text: &str) -> Option<u64> {
    let digits = match COUNT_RE.captures(text) {
        Some(caps) => caps.get(1)?.as_str(),
        None => {
            let mut runs = DIGIT_RUN_RE.find_iter(text);
            let only = runs.next()?;
            if runs.next().is_some() {
                return None;
            }
            only.as_str()
        }
    };
    digits.replace(',', "").parse().ok()
}

/// 判断文本是否包含数字
pub fn has_digits(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}
