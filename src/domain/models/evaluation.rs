// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::domain::models::url_prefix::SampleUrl;

/// 单个验证页面的评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// 编辑距离除以标签长度
    pub distance_norm: f64,
    pub exact_match: bool,
    /// 标签不是解析结果的子串
    pub missing_content: bool,
    /// 解析结果不是标签的子串
    pub extra_content: bool,
    pub config_name: String,
    pub prefix: String,
    pub url: String,
    pub expected: String,
    pub parsed: String,
}

impl SampleUrl {
    /// 与标签比较，未标注的页面返回 None
    pub fn evaluate(&self, parsed: &str, config_name: &str, prefix: &str) -> Option<EvaluationResult> {
        let expected = &self.label.as_ref()?.content;
        let distance = strsim::levenshtein(expected, parsed);
        let expected_len = expected.chars().count();
        let distance_norm = if expected_len == 0 {
            if parsed.is_empty() {
                0.0
            } else {
                1.0
            }
        } else {
            distance as f64 / expected_len as f64
        };

        Some(EvaluationResult {
            distance_norm,
            exact_match: expected == parsed,
            missing_content: !parsed.contains(expected.as_str()),
            extra_content: !expected.contains(parsed),
            config_name: config_name.to_string(),
            prefix: prefix.to_string(),
            url: self.url.clone(),
            expected: expected.clone(),
            parsed: parsed.to_string(),
        })
    }
}

/// 评估结果汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub distance_norm: f64,
    pub exact_match: f64,
    pub missing_content: f64,
    pub extra_content: f64,
    pub count: usize,
    pub prefix: Option<String>,
    pub config_name: Option<String>,
}

impl EvaluationSummary {
    /// 按前缀和配置名过滤后求平均，没有匹配结果时返回 None
    pub fn aggregate(
        results: &[EvaluationResult],
        prefix: Option<&str>,
        config_name: Option<&str>,
    ) -> Option<Self> {
        let selected: Vec<&EvaluationResult> = results
            .iter()
            .filter(|r| prefix.is_none_or(|p| r.prefix == p))
            .filter(|r| config_name.is_none_or(|c| r.config_name == c))
            .collect();

        if selected.is_empty() {
            return None;
        }

        let n = selected.len() as f64;
        let rate = |f: fn(&EvaluationResult) -> bool| {
            selected.iter().filter(|r| f(r)).count() as f64 / n
        };

        Some(Self {
            distance_norm: selected.iter().map(|r| r.distance_norm).sum::<f64>() / n,
            exact_match: rate(|r| r.exact_match),
            missing_content: rate(|r| r.missing_content),
            extra_content: rate(|r| r.extra_content),
            count: selected.len(),
            prefix: prefix.map(str::to_string),
            config_name: config_name.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let sample = SampleUrl::new("https://example.com/a", "<p>Hello</p>").with_label("Hello");
        let result = sample.evaluate("Hello", "baseline", "https://example.com").unwrap();
        assert!(result.exact_match);
        assert_eq!(result.distance_norm, 0.0);
        assert!(!result.missing_content);
        assert!(!result.extra_content);
    }

    #[test]
    fn test_extra_content() {
        let sample = SampleUrl::new("https://example.com/a", "").with_label("Hello");
        let result = sample.evaluate("Menu Hello", "baseline", "https://example.com").unwrap();
        assert!(!result.exact_match);
        assert!(!result.missing_content);
        assert!(result.extra_content);
        assert!((result.distance_norm - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unlabeled_sample_is_not_evaluated() {
        let sample = SampleUrl::new("https://example.com/a", "");
        assert!(sample.evaluate("Hello", "baseline", "https://example.com").is_none());
    }

    #[test]
    fn test_aggregate_filters_by_prefix() {
        let a = SampleUrl::new("https://a.com/1", "").with_label("abc");
        let b = SampleUrl::new("https://b.com/1", "").with_label("abc");
        let results = vec![
            a.evaluate("abc", "baseline", "https://a.com").unwrap(),
            b.evaluate("xyz", "baseline", "https://b.com").unwrap(),
        ];

        let all = EvaluationSummary::aggregate(&results, None, None).unwrap();
        assert_eq!(all.count, 2);
        assert!((all.exact_match - 0.5).abs() < f64::EPSILON);

        let only_a = EvaluationSummary::aggregate(&results, Some("https://a.com"), None).unwrap();
        assert_eq!(only_a.count, 1);
        assert_eq!(only_a.exact_match, 1.0);

        assert!(EvaluationSummary::aggregate(&results, None, Some("other")).is_none());
    }
}
