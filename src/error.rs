//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 快照导出链路中的所有失败（网络、截图、剪贴板、文件、配置）都收敛到
//! 同一个 `SnapError` 枚举，替代零散的字符串错误。
//!
//! 每个分支都对应一个稳定的状态码（`SnapError::code`），状态通道与前端
//! 展示只依赖状态码，不依赖人类可读文案。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - `code()` 给出机器可读状态码，与 `status::codes` 中的常量一一对应。
//! - `ErrorReport` 是可序列化的错误负载（`code` + `message`），供命令行输出。

use serde::Serialize;

use crate::status::codes;

/// 快照与导出链路的统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum SnapError {
    /// 设备处于离线状态，请求未发出
    #[error("网络不可用（离线）")]
    Offline,

    /// 网络层错误（连接被重置、响应缺失等）
    #[error("网络错误：{0}")]
    Network(String),

    /// 请求超时
    #[error("请求超时：{0}")]
    Timeout(String),

    /// 无法建立连接
    #[error("请求发送失败：{0}")]
    FailedToFetch(String),

    /// 服务端限流（HTTP 429），重试已耗尽
    #[error("请求过于频繁")]
    TooManyRequests,

    /// 响应体不是合法 JSON 或结构不符
    #[error("响应格式错误：{0}")]
    InvalidResponse(String),

    /// 服务端返回了结构化错误码
    #[error("接口错误（HTTP {status}）：{code}")]
    Api { status: u16, code: String },

    /// 服务端返回非 2xx 且没有错误码
    #[error("未知错误：{0}")]
    UnknownError(String),

    /// 截图目标不存在或尺寸为零
    #[error("截图目标不可用：{0}")]
    TargetNotFound(String),

    /// 栅格化或结果解码失败
    #[error("截图失败：{0}")]
    CaptureFailed(String),

    /// 没有任何可用的剪贴板能力
    #[error("当前环境不支持剪贴板写入")]
    ClipboardUnsupported,

    /// 剪贴板能力存在，但写入失败
    #[error("剪贴板写入失败：{0}")]
    ClipboardWrite(String),

    /// 传统复制命令返回失败
    #[error("传统复制命令执行失败")]
    FallbackCopyFailed,

    /// 受保护的异步操作超时
    #[error("操作超时（{0}ms）")]
    OperationTimedOut(u64),

    /// 文件保存失败
    #[error("文件错误：{0}")]
    FileSystem(String),

    /// 配置非法
    #[error("配置错误：{0}")]
    InvalidConfig(String),

    /// 底层 I/O 错误
    #[error("I/O 错误：{0}")]
    Io(#[from] std::io::Error),
}

impl SnapError {
    /// 机器可读状态码。
    ///
    /// `Api` 分支直接透传服务端给出的 `code`。
    pub fn code(&self) -> &str {
        match self {
            Self::Offline => codes::OFFLINE,
            Self::Network(_) => codes::NETWORK_ERROR,
            Self::Timeout(_) => codes::TIMEOUT_ERROR,
            Self::FailedToFetch(_) => codes::FAILED_TO_FETCH,
            Self::TooManyRequests => codes::TOO_MANY_REQUESTS,
            Self::InvalidResponse(_) => codes::INVALID_RESPONSE,
            Self::Api { code, .. } => code.as_str(),
            Self::UnknownError(_) => codes::UNKNOWN_ERROR,
            Self::TargetNotFound(_) => codes::EDITOR_NOT_FOUND,
            Self::CaptureFailed(_) => codes::IMAGE_CREATION_FAILED,
            Self::ClipboardUnsupported => codes::CLIPBOARD_API_NOT_SUPPORTED,
            Self::ClipboardWrite(_) => codes::CLIPBOARD_WRITE_FAILED,
            Self::FallbackCopyFailed => codes::FALLBACK_COPY_FAILED,
            Self::OperationTimedOut(_) => codes::OPERATION_TIMED_OUT,
            Self::FileSystem(_) => codes::FILE_SAVE_FAILED,
            Self::InvalidConfig(_) => codes::INVALID_CONFIG,
            Self::Io(_) => codes::IO_ERROR,
        }
    }

    /// 是否属于可重试的网络层瞬时错误。
    pub fn is_transient_network(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::FailedToFetch(_)
        )
    }
}

/// 可序列化的错误负载。
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&SnapError> for ErrorReport {
    fn from(error: &SnapError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_passes_server_code_through() {
        let err = SnapError::Api {
            status: 403,
            code: "LIMIT_REACHED".to_string(),
        };
        assert_eq!(err.code(), "LIMIT_REACHED");
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn only_network_level_errors_are_transient() {
        assert!(SnapError::Network("reset".into()).is_transient_network());
        assert!(SnapError::Timeout("10s".into()).is_transient_network());
        assert!(SnapError::FailedToFetch("refused".into()).is_transient_network());
        assert!(!SnapError::TooManyRequests.is_transient_network());
        assert!(!SnapError::Offline.is_transient_network());
        assert!(!SnapError::InvalidResponse("eof".into()).is_transient_network());
    }

    #[test]
    fn error_report_carries_code_and_message() {
        let report = ErrorReport::from(&SnapError::ClipboardUnsupported);
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["code"], "CLIPBOARD_API_NOT_SUPPORTED");
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}
