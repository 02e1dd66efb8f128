//! 异步操作保护模块
//!
//! # 设计思路
//!
//! 导出操作（截图、写剪贴板、保存文件）都可能挂起或失败，但调用方只关心
//! "成功拿到结果"或"已经提示过失败"。`OperationGuard::run` 把一次操作包成
//! 永不向上抛错的调用：超时、错误都转成 `on_error` 回调加一条日志，返回 `None`。
//!
//! # 实现思路
//!
//! - 超时按设备放宽：移动设备为 `min(timeout * 1.5, 30s)`。
//! - 用 `tokio::time::timeout` 竞速，超时后操作 future 被直接丢弃。
//! - 失败被归一化为 `GuardFailure`，附带采集到的设备信息。
//!
//! 同目录下还有两个独立工具：`Debouncer`（合并突发调用）与
//! `retry_with_backoff`（指数退避重试）。

mod debounce;
mod retry;

use std::future::Future;
use std::time::Duration;

pub use debounce::{DebounceError, DebounceHandle, Debouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use retry::retry_with_backoff;

use crate::device::{DeviceClass, DeviceInfo, DeviceProfile};
use crate::error::SnapError;

/// 默认超时。
pub const DEFAULT_GUARD_TIMEOUT: Duration = Duration::from_millis(15_000);
/// 移动设备放宽后的超时上限。
pub const MOBILE_TIMEOUT_CAP: Duration = Duration::from_millis(30_000);

/// 按设备分类计算实际超时。
pub fn effective_timeout(timeout: Duration, class: DeviceClass) -> Duration {
    if class.is_mobile() {
        timeout.mul_f64(1.5).min(MOBILE_TIMEOUT_CAP)
    } else {
        timeout
    }
}

/// 被保护操作的失败信息。
#[derive(Debug)]
pub struct GuardFailure {
    pub error: SnapError,
    pub device_info: Option<DeviceInfo>,
}

/// 超时 + 回调 + 吞错的操作包装器。
#[derive(Debug, Clone)]
pub struct OperationGuard {
    timeout: Duration,
    device: Option<DeviceProfile>,
}

impl OperationGuard {
    pub fn new(device: Option<DeviceProfile>) -> Self {
        Self {
            timeout: DEFAULT_GUARD_TIMEOUT,
            device,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 实际生效的超时。设备未知时按桌面处理。
    pub fn effective_timeout(&self) -> Duration {
        let class = self
            .device
            .as_ref()
            .map(DeviceProfile::class)
            .unwrap_or(DeviceClass::Desktop);
        effective_timeout(self.timeout, class)
    }

    /// 执行操作；成功返回 `Some`，失败或超时返回 `None`，不会向上传播错误。
    pub async fn run<T, Fut, S, E>(&self, op: Fut, on_success: S, on_error: E) -> Option<T>
    where
        Fut: Future<Output = Result<T, SnapError>>,
        S: FnOnce(&T),
        E: FnOnce(&GuardFailure),
    {
        self.run_with_failure(op, on_success, on_error).await.ok()
    }

    /// 与 `run` 相同，但把归一化后的失败交还给调用方。
    pub async fn run_with_failure<T, Fut, S, E>(
        &self,
        op: Fut,
        on_success: S,
        on_error: E,
    ) -> Result<T, GuardFailure>
    where
        Fut: Future<Output = Result<T, SnapError>>,
        S: FnOnce(&T),
        E: FnOnce(&GuardFailure),
    {
        let timeout = self.effective_timeout();
        let outcome = match tokio::time::timeout(timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(SnapError::OperationTimedOut(timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(value) => {
                on_success(&value);
                Ok(value)
            }
            Err(error) => {
                let failure = GuardFailure {
                    error,
                    device_info: self.device.as_ref().map(DeviceProfile::info),
                };
                on_error(&failure);
                log::error!(
                    "❌ 异步操作失败：{}（设备：{:?}）",
                    failure.error,
                    failure.device_info
                );
                Err(failure)
            }
        }
    }
}

/// `OperationGuard::run` 的便捷形式。
pub async fn safe_async<T, Fut, S, E>(
    op: Fut,
    on_success: S,
    on_error: E,
    timeout: Duration,
    device: Option<DeviceProfile>,
) -> Option<T>
where
    Fut: Future<Output = Result<T, SnapError>>,
    S: FnOnce(&T),
    E: FnOnce(&GuardFailure),
{
    OperationGuard::new(device)
        .with_timeout(timeout)
        .run(op, on_success, on_error)
        .await
}
