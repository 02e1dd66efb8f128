//! 代码片段持久化客户端
//!
//! 对 `/api/snippets` 的三个调用（创建、局部更新、删除）。所有请求都经过
//! `ResilientFetcher`，错误原样向上抛出。
//!
//! 局部更新前先用 `SnippetPatch::prepare` 归一化为服务端接受的线上格式。
//!
//! 服务端按会话 Cookie 鉴权：配置了会话令牌时，每个请求都附带
//! `Cookie: next-auth.session-token=<token>`，否则服务端返回 `UNAUTHORIZED`。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fetcher::{DEFAULT_RETRY_COUNT, ResilientFetcher};
use super::transport::{ApiRequest, HttpMethod, HttpTransport};
use crate::device::Connectivity;
use crate::error::SnapError;

/// 带 id 的可选项（语言、主题、字体）。线上只发送 `id`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// 客户端侧的局部更新。`None` 表示该字段未改动。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetPatch {
    pub title: Option<String>,
    pub code: Option<String>,
    pub language: Option<Choice>,
    pub theme: Option<Choice>,
    pub font_family: Option<Choice>,
    pub font_size: Option<String>,
    pub line_numbers: Option<bool>,
    pub padding: Option<String>,
    pub custom_colors: Option<Vec<String>>,
    pub color_mode: Option<String>,
    pub angle: Option<f64>,
    pub grain: Option<bool>,
}

/// 归一化后的线上格式。
///
/// `title` / `code` 使用双层 `Option`：外层 `None` 不发送，`Some(None)` 发送 `null`。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedSnippet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_numbers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_colors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PreparedSnippet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl SnippetPatch {
    /// 归一化局部更新；只要有任一字段被设置，就附带 `updatedAt`。
    pub fn prepare(&self, now: DateTime<Utc>) -> Result<PreparedSnippet, SnapError> {
        let custom_colors = match &self.custom_colors {
            Some(colors) => Some(serde_json::to_string(colors).map_err(|e| {
                SnapError::InvalidConfig(format!("自定义颜色序列化失败：{}", e))
            })?),
            None => None,
        };

        let mut prepared = PreparedSnippet {
            title: self.title.as_ref().map(|title| {
                let trimmed = title.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }),
            code: self
                .code
                .as_ref()
                .map(|code| (!code.is_empty()).then(|| code.clone())),
            language: self.language.as_ref().map(|c| c.id.clone()),
            theme: self.theme.as_ref().map(|c| c.id.clone()),
            font_family: self.font_family.as_ref().map(|c| c.id.clone()),
            font_size: non_empty(&self.font_size),
            line_numbers: self.line_numbers,
            padding: non_empty(&self.padding),
            custom_colors,
            color_mode: non_empty(&self.color_mode),
            angle: self.angle,
            grain: self.grain.filter(|grain| *grain),
            updated_at: None,
        };

        if !prepared.is_empty() {
            prepared.updated_at = Some(now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string());
        }
        Ok(prepared)
    }
}

/// 服务端返回的片段记录；除 `id` 外的字段原样保留。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedSnippet {
    pub id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    snippet_count: u32,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    id: &'a str,
    #[serde(flatten)]
    prepared: PreparedSnippet,
}

/// 会话 Cookie 名称。
pub const SESSION_COOKIE: &str = "next-auth.session-token";

/// 片段持久化接口客户端。
pub struct SnippetClient<T, C> {
    fetcher: ResilientFetcher<T, C>,
    base_url: String,
    session_token: Option<String>,
    max_retries: u32,
    clock: fn() -> DateTime<Utc>,
}

impl<T: HttpTransport, C: Connectivity> SnippetClient<T, C> {
    pub fn new(fetcher: ResilientFetcher<T, C>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: None,
            max_retries: DEFAULT_RETRY_COUNT,
            clock: Utc::now,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 设置会话令牌；空白令牌视为未登录。
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        self.session_token = (!token.is_empty()).then(|| token.to_string());
        self
    }

    pub fn has_session(&self) -> bool {
        self.session_token.is_some()
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn fetcher(&self) -> &ResilientFetcher<T, C> {
        &self.fetcher
    }

    fn endpoint(&self) -> String {
        format!("{}/api/snippets", self.base_url)
    }

    fn authorize(&self, request: ApiRequest) -> ApiRequest {
        match &self.session_token {
            Some(token) => request.with_header("Cookie", format!("{SESSION_COOKIE}={token}")),
            None => request,
        }
    }

    /// 创建片段。`snippet_count` 为当前用户已有片段数，服务端据此限额。
    pub async fn create_snippet(&self, snippet_count: u32) -> Result<Snippet, SnapError> {
        let request = ApiRequest::new(HttpMethod::Post, self.endpoint())
            .with_json(&CreateBody { snippet_count })?;
        let request = self.authorize(request);
        let snippet: Snippet = self.fetcher.request(request, self.max_retries).await?;
        log::info!("✅ 片段已创建：{}", snippet.id);
        Ok(snippet)
    }

    /// 局部更新片段。
    pub async fn update_snippet(
        &self,
        id: &str,
        patch: &SnippetPatch,
    ) -> Result<Snippet, SnapError> {
        let prepared = patch.prepare((self.clock)())?;
        let request = ApiRequest::new(HttpMethod::Patch, self.endpoint())
            .with_json(&UpdateBody { id, prepared })?;
        let request = self.authorize(request);
        let snippet: Snippet = self.fetcher.request(request, self.max_retries).await?;
        log::debug!("📝 片段已更新：{}", snippet.id);
        Ok(snippet)
    }

    /// 删除片段。
    pub async fn delete_snippet(&self, id: &str) -> Result<DeletedSnippet, SnapError> {
        let url = reqwest::Url::parse_with_params(&self.endpoint(), &[("id", id)])
            .map_err(|e| SnapError::InvalidConfig(format!("接口地址非法：{}", e)))?;
        let request = self.authorize(ApiRequest::delete(url.as_str()));
        let deleted: DeletedSnippet = self.fetcher.request(request, self.max_retries).await?;
        log::info!("🗑️ 片段已删除：{}", deleted.id);
        Ok(deleted)
    }
}
