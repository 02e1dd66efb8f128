//! # 剪贴板能力模块
//!
//! ## 设计思路
//!
//! 导出策略只通过 `ClipboardBackend` 与剪贴板交互：先探测能力，再调用写入。
//! 三类能力彼此独立：
//! - 异步写文本（`write_text`）
//! - 异步写图片（`write_image`）
//! - 传统复制命令（`legacy_copy_*`，同步返回是否成功）
//!
//! ## 实现思路（`SystemClipboard`）
//!
//! - 基于 `arboard`，写入放在 `spawn_blocking` 中执行，避免阻塞 async 运行时。
//! - 图片先在打开剪贴板之前解码为 RGBA，缩短持有剪贴板的时间。
//! - 失败按 Busy / Transient / Fatal 分类；可重试错误走指数退避 + 抖动，
//!   并受总重试预算约束。
//! - 没有传统复制命令，对应能力探测恒为 `false`。

use std::borrow::Cow;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::capture::PngBlob;
use crate::error::SnapError;

/// 剪贴板能力接缝。
pub trait ClipboardBackend: Send + Sync {
    fn supports_write_text(&self) -> bool;

    fn write_text(&self, text: &str) -> impl Future<Output = Result<(), SnapError>> + Send;

    fn supports_write_image(&self) -> bool;

    fn write_image(&self, png: &PngBlob) -> impl Future<Output = Result<(), SnapError>> + Send;

    fn supports_legacy_copy(&self) -> bool;

    /// 传统复制命令复制文本，返回命令是否成功。
    fn legacy_copy_text(&self, text: &str) -> bool;

    /// 把图片 data URL 放入可编辑容器后执行传统复制命令。
    fn legacy_copy_image(&self, data_url: &str) -> bool;
}

/// 系统剪贴板写入的重试参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardRetryConfig {
    /// 最大尝试次数
    pub retries: u32,
    /// 退避基准（毫秒）
    pub retry_delay_ms: u64,
    /// 单次等待上限（毫秒）
    pub retry_max_delay_ms: u64,
    /// 总重试预算（毫秒）
    pub retry_max_total_ms: u64,
}

impl Default for ClipboardRetryConfig {
    fn default() -> Self {
        Self {
            retries: 4,
            retry_delay_ms: 60,
            retry_max_delay_ms: 400,
            retry_max_total_ms: 1500,
        }
    }
}

/// 一次写入失败的分类。
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteFailure {
    /// 剪贴板被其他进程占用
    Busy(String),
    /// 其他可能自行恢复的错误
    Transient(String),
    /// 格式不支持等，重试无意义
    Fatal(String),
}

impl WriteFailure {
    fn from_arboard(action: &str, error: arboard::Error) -> Self {
        let message = format!("{}失败：{}", action, error);
        match error {
            arboard::Error::ClipboardOccupied => Self::Busy(message),
            arboard::Error::ClipboardNotSupported | arboard::Error::ConversionFailure => {
                Self::Fatal(message)
            }
            _ => Self::Transient(message),
        }
    }

    fn retryable(&self) -> bool {
        !matches!(self, Self::Fatal(_))
    }

    fn into_message(self) -> String {
        match self {
            Self::Busy(m) | Self::Transient(m) | Self::Fatal(m) => m,
        }
    }
}

/// 第 `retry` 次重试前的等待：`base * 2^(retry-1)` 封顶 `cap_ms`，再叠加至多三分之一的抖动。
fn retry_wait_ms(base_ms: u64, retry: u32, cap_ms: u64) -> u64 {
    let shift = retry.saturating_sub(1).min(8);
    let wait = base_ms.saturating_mul(1 << shift).min(cap_ms.max(base_ms));
    wait + jitter_ms(wait / 3)
}

/// `0..=bound` 内的抖动，取时钟纳秒位与计数器混合。
fn jitter_ms(bound: u64) -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    let salt = COUNTER.fetch_add(0x9E37_79B9, Ordering::Relaxed);
    let mixed = (nanos ^ salt).wrapping_mul(0x2545_F491_4F6C_DD1D);
    (mixed >> 33) % (bound + 1)
}

/// 阻塞线程内执行的写入内容。
enum ClipboardPayload {
    Text(String),
    Image {
        width: usize,
        height: usize,
        rgba: Vec<u8>,
    },
}

impl ClipboardPayload {
    fn write_once(&self) -> Result<(), WriteFailure> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| WriteFailure::Busy(format!("打开剪贴板失败：{}", e)))?;

        match self {
            Self::Text(text) => clipboard
                .set_text(text.as_str())
                .map_err(|e| WriteFailure::from_arboard("写入文本", e)),
            Self::Image {
                width,
                height,
                rgba,
            } => clipboard
                .set_image(arboard::ImageData {
                    width: *width,
                    height: *height,
                    bytes: Cow::Borrowed(rgba),
                })
                .map_err(|e| WriteFailure::from_arboard("写入图片", e)),
        }
    }
}

/// 基于 `arboard` 的系统剪贴板。
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    available: bool,
    retry: ClipboardRetryConfig,
}

impl SystemClipboard {
    /// 探测系统剪贴板是否可用。
    pub fn detect(retry: ClipboardRetryConfig) -> Self {
        let available = match arboard::Clipboard::new() {
            Ok(_) => true,
            Err(e) => {
                log::warn!("⚠️ 系统剪贴板不可用：{}", e);
                false
            }
        };
        Self { available, retry }
    }

    async fn write(&self, payload: ClipboardPayload) -> Result<(), SnapError> {
        if !self.available {
            return Err(SnapError::ClipboardUnsupported);
        }
        let retry = self.retry;
        tokio::task::spawn_blocking(move || write_with_retry(&payload, retry))
            .await
            .map_err(|e| SnapError::ClipboardWrite(format!("线程执行失败：{}", e)))?
    }
}

/// 阻塞线程内的写入循环。可重试的失败按退避等待后重来，总等待受预算约束。
fn write_with_retry(
    payload: &ClipboardPayload,
    config: ClipboardRetryConfig,
) -> Result<(), SnapError> {
    let attempts = config.retries.max(1);
    let started = Instant::now();
    let mut failure = None;

    for attempt in 1..=attempts {
        match payload.write_once() {
            Ok(()) => {
                log::debug!("📋 剪贴板写入成功（第 {} 次）", attempt);
                return Ok(());
            }
            Err(e) => {
                log::warn!("⚠️ 剪贴板写入第 {}/{} 次失败：{:?}", attempt, attempts, e);
                let retryable = e.retryable();
                failure = Some(e);
                if !retryable || attempt == attempts {
                    break;
                }
            }
        }

        let wait_ms =
            retry_wait_ms(config.retry_delay_ms.max(1), attempt, config.retry_max_delay_ms);
        let spent_ms = started.elapsed().as_millis() as u64;
        if spent_ms + wait_ms > config.retry_max_total_ms {
            log::warn!(
                "⏱️ 重试预算耗尽（已用 {}ms，需再等 {}ms，预算 {}ms）",
                spent_ms,
                wait_ms,
                config.retry_max_total_ms
            );
            break;
        }
        std::thread::sleep(Duration::from_millis(wait_ms));
    }

    Err(SnapError::ClipboardWrite(
        failure.map_or_else(|| "未知错误".to_string(), WriteFailure::into_message),
    ))
}

impl ClipboardBackend for SystemClipboard {
    fn supports_write_text(&self) -> bool {
        self.available
    }

    async fn write_text(&self, text: &str) -> Result<(), SnapError> {
        self.write(ClipboardPayload::Text(text.to_string())).await
    }

    fn supports_write_image(&self) -> bool {
        self.available
    }

    async fn write_image(&self, png: &PngBlob) -> Result<(), SnapError> {
        let rgba = image::load_from_memory_with_format(&png.bytes, image::ImageFormat::Png)
            .map_err(|e| SnapError::ClipboardWrite(format!("图片解码失败：{}", e)))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        self.write(ClipboardPayload::Image {
            width: width as usize,
            height: height as usize,
            rgba: rgba.into_raw(),
        })
        .await
    }

    fn supports_legacy_copy(&self) -> bool {
        false
    }

    fn legacy_copy_text(&self, _text: &str) -> bool {
        false
    }

    fn legacy_copy_image(&self, _data_url: &str) -> bool {
        false
    }
}
