// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::ops::Add;

/// 解析参数
///
/// 由 LLM 生成、可被人工调整的提取配方。四个字段都是选择器集合，
/// 重复项和顺序都没有意义，所以使用 `BTreeSet` 保存，序列化结果稳定。
///
/// 反序列化是严格的：缺字段、多字段或类型不符都会失败，不做任何强制转换。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserParameters {
    /// 根选择器，只保留匹配元素及其祖先和后代
    pub root: BTreeSet<String>,
    /// 保留选择器，在 drop / unwrap 之后再次收窄
    pub keep: BTreeSet<String>,
    /// 删除选择器，匹配元素连同子树一起删除
    pub drop: BTreeSet<String>,
    /// 解包选择器，删除标签本身但保留子节点
    pub unwrap: BTreeSet<String>,
}

impl ParserParameters {
    /// 从四个字符串列表构建参数
    pub fn new<I, S>(root: I, keep: I, drop: I, unwrap: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into_iter().map(Into::into).collect(),
            keep: keep.into_iter().map(Into::into).collect(),
            drop: drop.into_iter().map(Into::into).collect(),
            unwrap: unwrap.into_iter().map(Into::into).collect(),
        }
    }

    /// 合并两组参数，逐字段取并集
    pub fn merge(&self, other: &ParserParameters) -> ParserParameters {
        ParserParameters {
            root: self.root.union(&other.root).cloned().collect(),
            keep: self.keep.union(&other.keep).cloned().collect(),
            drop: self.drop.union(&other.drop).cloned().collect(),
            unwrap: self.unwrap.union(&other.unwrap).cloned().collect(),
        }
    }

    /// 暴露给推理服务的 JSON Schema
    ///
    /// 四个字符串数组字段，全部必填，不允许额外属性。
    pub fn json_schema() -> Value {
        let selector_list = json!({ "type": "array", "items": { "type": "string" } });
        json!({
            "type": "object",
            "properties": {
                "root": selector_list,
                "keep": selector_list,
                "drop": selector_list,
                "unwrap": selector_list,
            },
            "required": ["root", "keep", "drop", "unwrap"],
            "additionalProperties": false,
        })
    }
}

impl Add for ParserParameters {
    type Output = ParserParameters;

    fn add(self, other: ParserParameters) -> ParserParameters {
        self.merge(&other)
    }
}

/// 解析器配置
///
/// 将解析参数绑定到所属的 URL 前缀，前缀名即实体 ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    pub parameters: ParserParameters,
    pub prefix_name: String,
}

impl ParserConfig {
    pub fn new(prefix_name: impl Into<String>, parameters: ParserParameters) -> Self {
        Self {
            parameters,
            prefix_name: prefix_name.into(),
        }
    }

    /// 合并同一前缀下的两个配置，保留左侧的前缀名
    pub fn merge(&self, other: &ParserConfig) -> ParserConfig {
        ParserConfig {
            parameters: self.parameters.merge(&other.parameters),
            prefix_name: self.prefix_name.clone(),
        }
    }
}

impl Add for ParserConfig {
    type Output = ParserConfig;

    fn add(self, other: ParserConfig) -> ParserConfig {
        self.merge(&other)
    }
}
