//! HTTP 传输层
//!
//! `HttpTransport` 是请求层唯一依赖的网络接缝：实现方只负责"发出请求、
//! 拿回状态码和原始字节"，JSON 解析、重试与状态上报都在 `fetcher` 中完成。
//! 原生实现 `ReqwestTransport` 基于 `reqwest::Client`。

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::error::SnapError;

/// 请求方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// 一次待发送的请求。
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// 以 JSON 作为请求体。
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, SnapError> {
        let text = serde_json::to_string(body)
            .map_err(|e| SnapError::InvalidConfig(format!("请求体序列化失败：{}", e)))?;
        self.body = Some(text);
        Ok(self)
    }

    /// 追加或覆盖请求头（名称大小写不敏感）。
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// 按名称读取请求头。
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 传输层返回的原始响应。
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 网络传输接缝。
///
/// 失败时只应返回网络层错误：`Network` / `Timeout` / `FailedToFetch`。
pub trait HttpTransport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, SnapError>> + Send;
}

/// 基于 `reqwest` 的原生传输实现。
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self, SnapError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .map_err(|e| SnapError::InvalidConfig(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> SnapError {
        if e.is_timeout() {
            SnapError::Timeout(format!("请求超时（{}ms）", self.request_timeout.as_millis()))
        } else if e.is_connect() {
            SnapError::FailedToFetch(format!("无法连接：{}", e))
        } else {
            SnapError::Network(format!("请求失败：{}", e))
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SnapError> {
        log::debug!("🌐 {} {}", request.method.as_str(), request.url);

        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_reqwest_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_reqwest_error(e))?;

        Ok(ApiResponse { status, body })
    }
}
