//! 弹性请求层
//!
//! # 设计思路
//!
//! 所有对持久化接口的调用都经过 `ResilientFetcher::request`：
//! 离线检测、超时、状态上报、结构化错误码和有限次数的线性退避重试
//! 只在这里实现一次。
//!
//! # 实现思路
//!
//! - 每次尝试前检查在线状态；离线立即失败，不重试。
//! - 429 与网络层瞬时错误共用同一个线性 `RetryState`。
//! - 先判断 429，再解析 JSON，最后检查状态码；解析失败与业务错误都不重试。
//! - `fetch_with_timeout` 超时后直接丢弃进行中的请求 future，即中止请求。

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::backoff::RetryState;
use super::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::device::Connectivity;
use crate::error::SnapError;
use crate::status::{StatusReporter, codes};

/// 默认重试次数。
pub const DEFAULT_RETRY_COUNT: u32 = 2;
/// 线性退避步长。
pub const RETRY_DELAY_MS: u64 = 1000;
/// `fetch_with_timeout` 的默认超时。
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("Content-Type", "application/json"),
    ("Cache-Control", "no-cache"),
];

/// 以超时竞速发送请求。超时后请求 future 被丢弃，返回 `Timeout`。
pub async fn fetch_with_timeout<T: HttpTransport>(
    transport: &T,
    request: ApiRequest,
    timeout: Duration,
) -> Result<ApiResponse, SnapError> {
    match tokio::time::timeout(timeout, transport.send(request)).await {
        Ok(result) => result,
        Err(_) => Err(SnapError::Timeout(format!(
            "请求在 {}ms 内未完成",
            timeout.as_millis()
        ))),
    }
}

/// 带离线检测、超时与线性退避的请求执行器。
pub struct ResilientFetcher<T, C> {
    transport: T,
    connectivity: C,
    status: StatusReporter,
    timeout: Duration,
    retry_delay_ms: u64,
}

impl<T: HttpTransport, C: Connectivity> ResilientFetcher<T, C> {
    pub fn new(transport: T, connectivity: C, status: StatusReporter) -> Self {
        Self {
            transport,
            connectivity,
            status,
            timeout: DEFAULT_FETCH_TIMEOUT,
            retry_delay_ms: RETRY_DELAY_MS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// 发送请求并把响应体解析为 `R`。
    pub async fn request<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
        max_retries: u32,
    ) -> Result<R, SnapError> {
        let request = with_default_headers(request);
        let mut retry = RetryState::linear(max_retries, self.retry_delay_ms);

        loop {
            if !self.connectivity.is_online() {
                self.status.publish(codes::OFFLINE);
                log::warn!("📴 设备离线，放弃请求：{}", request.url);
                return Err(SnapError::Offline);
            }

            if retry.attempt() == 0 {
                self.status.publish(codes::LOADING);
            } else {
                self.status.publish(codes::RETRYING_REQUEST);
            }

            let response =
                match fetch_with_timeout(&self.transport, request.clone(), self.timeout).await {
                    Ok(response) => response,
                    Err(e) if e.is_transient_network() => {
                        if let Some(delay) = retry.advance() {
                            log::warn!(
                                "🔄 网络错误，{}ms 后重试（{}/{}）：{}",
                                delay.as_millis(),
                                retry.attempt(),
                                retry.max_attempts(),
                                e
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        self.status.publish(e.code());
                        log::error!("❌ 请求失败，重试已耗尽：{}", e);
                        return Err(e);
                    }
                    Err(e) => {
                        self.status.publish(e.code());
                        return Err(e);
                    }
                };

            if response.status == 429 {
                self.status.publish(codes::TOO_MANY_REQUESTS);
                if let Some(delay) = retry.advance() {
                    log::warn!(
                        "⏳ 请求被限流，{}ms 后重试（{}/{}）",
                        delay.as_millis(),
                        retry.attempt(),
                        retry.max_attempts()
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(SnapError::TooManyRequests);
            }

            return self.interpret(response);
        }
    }

    fn interpret<R: DeserializeOwned>(&self, response: ApiResponse) -> Result<R, SnapError> {
        let body: serde_json::Value = match serde_json::from_slice(&response.body) {
            Ok(body) => body,
            Err(e) => {
                self.status.publish(codes::INVALID_RESPONSE);
                return Err(SnapError::InvalidResponse(format!("响应不是合法 JSON：{}", e)));
            }
        };

        if !response.is_success() {
            let code = body
                .get("code")
                .and_then(|c| c.as_str())
                .filter(|c| !c.is_empty());
            return match code {
                Some(code) => {
                    self.status.publish(code);
                    Err(SnapError::Api {
                        status: response.status,
                        code: code.to_string(),
                    })
                }
                None => {
                    self.status.publish(codes::UNKNOWN_ERROR);
                    Err(SnapError::UnknownError(format!("HTTP {}", response.status)))
                }
            };
        }

        self.status.clear();
        serde_json::from_value(body).map_err(|e| {
            self.status.publish(codes::INVALID_RESPONSE);
            SnapError::InvalidResponse(format!("响应结构不符：{}", e))
        })
    }
}

/// 默认请求头在前，调用方同名请求头覆盖默认值。
fn with_default_headers(request: ApiRequest) -> ApiRequest {
    let caller_headers = request.headers.clone();
    let mut merged = ApiRequest {
        headers: Vec::new(),
        ..request
    };
    for (name, value) in DEFAULT_HEADERS {
        merged = merged.with_header(name, value);
    }
    for (name, value) in caller_headers {
        merged = merged.with_header(name, value);
    }
    merged
}
