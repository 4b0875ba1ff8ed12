// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 需要移除的跟踪参数（不区分大小写），`utm_` 开头的参数另行处理
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "campaign",
    "sessionid",
    "sid",
    "token",
    "auth",
    "key",
];

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// 规范化URL
///
/// 协议和主机小写，去掉 `www.` 和默认端口，去掉非根路径的末尾斜杠，
/// 丢弃片段、跟踪参数和空值参数，其余参数按 (键, 值) 排序。
/// 无法解析的输入原样返回。该函数是幂等的。
pub fn normalize_url(raw: &str) -> String {
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Failed to normalize URL {}: {}", raw, e);
            return raw.to_string();
        }
    };

    url.set_fragment(None);

    if let Some(host) = url.host_str() {
        let mut stripped = host;
        while let Some(rest) = stripped.strip_prefix("www.") {
            stripped = rest;
        }
        if stripped.len() != host.len() {
            let stripped = stripped.to_string();
            if url.set_host(Some(&stripped)).is_err() {
                return raw.to_string();
            }
        }
    }

    // Url already drops the scheme's default port; this covers explicit ones it kept
    let default_port = match url.scheme() {
        "https" => Some(443),
        "http" => Some(80),
        _ => None,
    };
    if default_port.is_some() && url.port() == default_port {
        let _ = url.set_port(None);
    }

    if !url.cannot_be_a_base() {
        let path = url.path().to_string();
        let trimmed = path.trim_end_matches('/');
        if trimmed.len() != path.len() {
            url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
        }
    }

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, value)| !is_tracking_param(key) && !value.trim().is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    url.to_string()
}

/// 推导URL所属的最深前缀
///
/// 去掉查询和片段后按 `/` 切分；有域名之后的路径时去掉末尾空段和最后一段，
/// 否则返回域名本身。
pub fn derive_prefix(url: &str) -> String {
    let url = url.split('?').next().unwrap_or(url);
    let url = url.split('#').next().unwrap_or(url);

    let mut parts: Vec<&str> = url.split('/').collect();
    if parts.len() > 3 {
        while parts.last().is_some_and(|part| part.is_empty()) {
            parts.pop();
        }
        // Domain root with a trailing slash keeps its domain
        if parts.len() > 3 {
            parts.pop();
        }
    }
    parts.join("/")
}

/// 候选前缀，从最长到最短
///
/// 按 `/` 切分后依次取前 i 段（i 从段数递减到 1）
pub fn candidate_prefixes(url: &str) -> Vec<String> {
    let parts: Vec<&str> = url.split('/').collect();
    (1..=parts.len())
        .rev()
        .map(|i| parts[..i].join("/"))
        .collect()
}
