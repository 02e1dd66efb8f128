//! 状态通道模块
//!
//! # 设计思路
//!
//! 整个导出链路只有一个"当前状态"，任何阶段都可以覆盖它（后写者胜），
//! 不保留历史、不排队。状态仅用于界面提示，因此并发覆盖是可接受的。
//!
//! # 实现思路
//!
//! - 底层使用 `tokio::sync::watch`：天然是"单值 + 订阅"模型。
//! - `StatusReporter` 可 `Clone`，便于注入到各组件；测试可创建独立实例。
//! - 同时提供一个惰性创建的进程级实例 `StatusReporter::global()`，
//!   生命周期与进程一致，无需显式销毁。

use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::watch;

/// 机器可读状态码。
pub mod codes {
    pub const LOADING: &str = "LOADING";
    pub const RETRYING_REQUEST: &str = "RETRYING_REQUEST";
    pub const OFFLINE: &str = "OFFLINE";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";
    pub const FAILED_TO_FETCH: &str = "FAILED_TO_FETCH";
    pub const TOO_MANY_REQUESTS: &str = "TOO_MANY_REQUESTS";
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
    pub const EDITOR_NOT_FOUND: &str = "EDITOR_NOT_FOUND";
    pub const PROCESSING_IMAGE: &str = "PROCESSING_IMAGE";
    pub const IMAGE_CREATION_FAILED: &str = "IMAGE_CREATION_FAILED";
    pub const IMAGE_COPIED: &str = "IMAGE_COPIED";
    pub const IMAGE_DOWNLOADED: &str = "IMAGE_DOWNLOADED";
    pub const IMAGE_OPERATION_FAILED: &str = "IMAGE_OPERATION_FAILED";
    pub const LINK_COPIED: &str = "LINK_COPIED";
    pub const COPY_LINK_FAILED: &str = "COPY_LINK_FAILED";
    pub const CLIPBOARD_API_NOT_SUPPORTED: &str = "CLIPBOARD_API_NOT_SUPPORTED";
    pub const CLIPBOARD_WRITE_FAILED: &str = "CLIPBOARD_WRITE_FAILED";
    pub const FALLBACK_COPY_FAILED: &str = "FALLBACK_COPY_FAILED";
    pub const OPERATION_TIMED_OUT: &str = "OPERATION_TIMED_OUT";
    pub const FILE_SAVE_FAILED: &str = "FILE_SAVE_FAILED";
    pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
    pub const IO_ERROR: &str = "IO_ERROR";
}

static GLOBAL_STATUS: Lazy<StatusReporter> = Lazy::new(StatusReporter::new);

/// 进程级单值状态通道（后写者胜）。
#[derive(Debug, Clone)]
pub struct StatusReporter {
    sender: Arc<watch::Sender<String>>,
}

impl StatusReporter {
    /// 创建一个初始为空的独立通道。
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::Sender::new(String::new())),
        }
    }

    /// 进程级共享实例。
    pub fn global() -> Self {
        GLOBAL_STATUS.clone()
    }

    /// 覆盖当前状态。没有订阅者时同样生效。
    pub fn publish(&self, code: impl Into<String>) {
        let code = code.into();
        log::debug!("📣 状态更新：{}", if code.is_empty() { "<empty>" } else { &code });
        self.sender.send_replace(code);
    }

    /// 清空状态。
    pub fn clear(&self) {
        self.publish(String::new());
    }

    /// 读取当前状态快照。
    pub fn current(&self) -> String {
        self.sender.borrow().clone()
    }

    /// 订阅状态变化。
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_and_last_write_wins() {
        let status = StatusReporter::new();
        assert_eq!(status.current(), "");

        status.publish(codes::LOADING);
        status.publish(codes::RETRYING_REQUEST);
        assert_eq!(status.current(), codes::RETRYING_REQUEST);

        status.clear();
        assert_eq!(status.current(), "");
    }

    #[test]
    fn clones_share_the_same_slot() {
        let status = StatusReporter::new();
        let other = status.clone();
        other.publish(codes::IMAGE_COPIED);
        assert_eq!(status.current(), codes::IMAGE_COPIED);
    }

    #[tokio::test]
    async fn subscribers_observe_latest_value() {
        let status = StatusReporter::new();
        let mut rx = status.subscribe();

        status.publish(codes::PROCESSING_IMAGE);
        rx.changed().await.expect("sender alive");
        assert_eq!(*rx.borrow_and_update(), codes::PROCESSING_IMAGE);
    }

    #[test]
    fn independent_instances_do_not_interfere() {
        let a = StatusReporter::new();
        let b = StatusReporter::new();
        a.publish(codes::OFFLINE);
        assert_eq!(b.current(), "");
    }
}
