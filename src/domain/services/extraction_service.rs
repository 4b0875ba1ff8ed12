// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use ego_tree::iter::Edge;
use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeSet, HashSet};

use crate::domain::models::parser_config::{ParserConfig, ParserParameters};
use crate::utils::errors::ExtractionError;

/// 非正文元素和隐藏元素
static CLEANUP_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "style,svg,canvas,template,head,meta,noscript",
        "[hidden], [aria-hidden='true'], [style*='display:none'], [style*='visibility:hidden']",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// 剪枝时永不删除的文档容器
const PROTECTED_TAGS: &[&str] = &["html", "head", "body"];

/// 前后需要换行的块级元素
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "aside", "main", "nav", "h1", "h2", "h3",
    "h4", "h5", "h6", "li", "ul", "ol", "table", "thead", "tbody", "tr", "td", "th", "figure",
    "figcaption", "pre",
];

/// 文本不输出的元素
const SILENT_TAGS: &[&str] = &["script", "style"];

fn parse_selectors(selectors: &BTreeSet<String>) -> Result<Vec<Selector>, ExtractionError> {
    selectors
        .iter()
        .map(|s| {
            Selector::parse(s)
                .map_err(|e| ExtractionError::InvalidSelector(format!("{}: {:?}", s, e)))
        })
        .collect()
}

/// 按文档顺序返回匹配任一选择器的元素
///
/// 从根节点遍历，已经摘除的节点不会被选中
fn select_ids(html: &Html, selectors: &[Selector]) -> Vec<NodeId> {
    html.tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| selectors.iter().any(|selector| selector.matches(element)))
        .map(|element| element.id())
        .collect()
}

fn detach_all(html: &mut Html, ids: &[NodeId]) {
    for id in ids {
        if let Some(mut node) = html.tree.get_mut(*id) {
            node.detach();
        }
    }
}

/// 只保留选中元素及其祖先和后代
///
/// 没有任何匹配时不做限制。只删除元素节点，保留容器下的零散文本。
fn restrict(html: &mut Html, selectors: &[Selector]) {
    let selected = select_ids(html, selectors);
    if selected.is_empty() {
        return;
    }

    let mut keep: HashSet<NodeId> = HashSet::new();
    for id in selected {
        if let Some(node) = html.tree.get(id) {
            keep.extend(node.ancestors().map(|ancestor| ancestor.id()));
            keep.extend(node.descendants().map(|descendant| descendant.id()));
        }
    }

    let doomed: Vec<NodeId> = html
        .tree
        .root()
        .descendants()
        .filter(|node| match node.value() {
            Node::Element(element) => !PROTECTED_TAGS.contains(&element.name()),
            _ => false,
        })
        .map(|node| node.id())
        .filter(|id| !keep.contains(id))
        .collect();
    detach_all(html, &doomed);
}

/// 删除匹配元素及其子树
fn drop_matching(html: &mut Html, selectors: &[Selector]) {
    let doomed = select_ids(html, selectors);
    detach_all(html, &doomed);
}

/// 删除匹配元素的标签，子节点原位提升到父节点
fn unwrap_matching(html: &mut Html, selectors: &[Selector]) {
    for id in select_ids(html, selectors) {
        let children: Vec<NodeId> = match html.tree.get(id) {
            Some(node) if node.parent().is_some() => node.children().map(|child| child.id()).collect(),
            _ => continue,
        };
        if let Some(mut node) = html.tree.get_mut(id) {
            for child in children {
                node.insert_id_before(child);
            }
            node.detach();
        }
    }
}

/// 删除非正文元素和隐藏元素
fn clean(html: &mut Html) {
    let doomed = select_ids(html, &CLEANUP_SELECTORS);
    detach_all(html, &doomed);
}

/// 输出可见文本
///
/// 块级元素前后和 `<br>` 处换行，相邻文本段之间用一个空格连接
fn serialize(html: &Html) -> String {
    let mut out = String::new();
    let mut after_text = false;
    let mut silent_depth = 0usize;

    for edge in html.tree.root().traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) => {
                    if silent_depth > 0 || SILENT_TAGS.contains(&element.name()) {
                        silent_depth += 1;
                    } else if element.name() == "br" || BLOCK_TAGS.contains(&element.name()) {
                        out.push('\n');
                        after_text = false;
                    }
                }
                Node::Text(text) if silent_depth == 0 => {
                    let run = text.trim();
                    if !run.is_empty() {
                        if after_text {
                            out.push(' ');
                        }
                        out.push_str(run);
                        after_text = true;
                    }
                }
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(element) = node.value() {
                    if silent_depth > 0 {
                        silent_depth -= 1;
                    } else if BLOCK_TAGS.contains(&element.name()) {
                        out.push('\n');
                        after_text = false;
                    }
                }
            }
        }
    }

    let text = SPACE_RUNS.replace_all(&out, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// 提取服务
///
/// 按解析参数剪枝 DOM 并输出纯文本。纯函数，相同输入得到相同输出。
pub struct ExtractionService;

impl ExtractionService {
    /// 提取正文
    ///
    /// 处理顺序：root 限制、drop、unwrap、keep 限制、内容清洗、文本输出。
    /// 每一步都作用于上一步修改后的文档树。
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 提取出的文本
    /// * `Err(ExtractionError)` - 存在无法解析的选择器
    pub fn extract(raw_html: &str, parameters: &ParserParameters) -> Result<String, ExtractionError> {
        let root = parse_selectors(&parameters.root)?;
        let drop = parse_selectors(&parameters.drop)?;
        let unwrap = parse_selectors(&parameters.unwrap)?;
        let keep = parse_selectors(&parameters.keep)?;

        let mut html = Html::parse_document(raw_html);
        if !root.is_empty() {
            restrict(&mut html, &root);
        }
        if !drop.is_empty() {
            drop_matching(&mut html, &drop);
        }
        if !unwrap.is_empty() {
            unwrap_matching(&mut html, &unwrap);
        }
        if !keep.is_empty() {
            restrict(&mut html, &keep);
        }
        clean(&mut html);

        Ok(serialize(&html))
    }

    /// 只做内容清洗，返回 HTML
    ///
    /// 用于构造提示词：去掉样式、隐藏元素等噪音，但不做任何剪枝
    pub fn clean_html(raw_html: &str) -> String {
        let mut html = Html::parse_document(raw_html);
        clean(&mut html);
        html.html()
    }
}

/// 解析器
///
/// 绑定到某个前缀的解析配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parser {
    pub config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// 用当前配置提取正文
    pub fn parse(&self, raw_html: &str) -> Result<String, ExtractionError> {
        ExtractionService::extract(raw_html, &self.config.parameters)
    }
}

#[cfg(test)]
#[path = "extraction_service_test.rs"]
mod tests;
