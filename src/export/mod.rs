//! # 导出模块
//!
//! ## 设计思路
//!
//! 三种导出方式共用一个入口 `Exporter::snap(mode)`：
//! - **复制链接**：把页面地址写入剪贴板
//! - **复制图片**：截图后写入剪贴板
//! - **下载图片**：截图后保存为 PNG 文件
//!
//! 每种方式的剪贴板/文件操作都是一条"能力探测 + 逐级回退"的链（`LinkTier`、
//! `ImageTier`），每一级可以单独测试。
//!
//! ## 实现思路
//!
//! 1. 定位截图目标；不存在时上报 `EDITOR_NOT_FOUND` 并直接返回错误
//! 2. 复制链接：在保护器中执行回退链
//! 3. 图片模式：应用响应式外框布局 → 重新测量目标 → 解析截图参数 →
//!    在保护器中截图并执行回退链或保存文件
//! 4. 保护器吞掉的失败仍以 `Err` 返回给调用方，供按钮切换到 `Failure`

pub mod button;
pub mod clipboard;
pub mod download;
pub mod image_chain;
pub mod link_chain;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use button::{ActionButton, ActionSpec, ButtonState, DEFAULT_RESET_DELAY};
pub use clipboard::{ClipboardBackend, ClipboardRetryConfig, SystemClipboard};
pub use download::{DiskFileSaver, FileSaver, download_filename};
pub use image_chain::{ImageTier, copy_image, reencode_png};
pub use link_chain::{LinkTier, copy_link};

use crate::capture::{CaptureTarget, DEFAULT_TARGET_ID, Page, Rasterizer, SnapshotCapturer};
use crate::device::DeviceProfile;
use crate::error::SnapError;
use crate::guard::{DEFAULT_GUARD_TIMEOUT, OperationGuard};
use crate::render::{RenderConfig, RenderInputs, height_percentage, resolve_layout};
use crate::status::{StatusReporter, codes};

/// 导出方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationMode {
    CopyLink,
    CopyImage,
    DownloadImage,
}

/// 成功导出的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    LinkCopied(LinkTier),
    ImageCopied(ImageTier),
    Downloaded(PathBuf),
}

/// 导出参数。
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub target_element_id: String,
    /// 用户设置的内边距（px）
    pub padding: f64,
    pub guard_timeout: Duration,
    /// 下载文件名使用的标题
    pub title: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            target_element_id: DEFAULT_TARGET_ID.to_string(),
            padding: 64.0,
            guard_timeout: DEFAULT_GUARD_TIMEOUT,
            title: None,
        }
    }
}

/// 导出编排器。
pub struct Exporter<P, R, B, S> {
    page: P,
    rasterizer: R,
    clipboard: B,
    saver: S,
    status: StatusReporter,
    capturer: SnapshotCapturer,
    device: DeviceProfile,
    options: ExportOptions,
    clock: fn() -> DateTime<Utc>,
}

impl<P, R, B, S> Exporter<P, R, B, S>
where
    P: Page,
    R: Rasterizer,
    B: ClipboardBackend,
    S: FileSaver,
{
    pub fn new(
        page: P,
        rasterizer: R,
        clipboard: B,
        saver: S,
        status: StatusReporter,
        device: DeviceProfile,
    ) -> Self {
        Self {
            page,
            rasterizer,
            clipboard,
            saver,
            capturer: SnapshotCapturer::new(status.clone()),
            status,
            device,
            options: ExportOptions::default(),
            clock: Utc::now,
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_capturer(mut self, capturer: SnapshotCapturer) -> Self {
        self.capturer = capturer;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn clipboard(&self) -> &B {
        &self.clipboard
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    fn guard(&self) -> OperationGuard {
        OperationGuard::new(Some(self.device.clone())).with_timeout(self.options.guard_timeout)
    }

    fn locate_target(&self) -> Option<CaptureTarget> {
        self.page
            .find_target(&self.options.target_element_id)
            .filter(CaptureTarget::has_area)
    }

    /// 执行一次导出。
    pub async fn snap(&self, mode: OperationMode) -> Result<ExportOutcome, SnapError> {
        let started = Instant::now();
        let Some(target) = self.locate_target() else {
            self.status.publish(codes::EDITOR_NOT_FOUND);
            log::error!("❌ 未找到截图目标 #{}", self.options.target_element_id);
            return Err(SnapError::TargetNotFound(self.options.target_element_id.clone()));
        };

        let result = match mode {
            OperationMode::CopyLink => self.copy_link().await,
            OperationMode::CopyImage | OperationMode::DownloadImage => {
                self.export_image(mode, target).await
            }
        };

        if result.is_ok() {
            log::info!(
                "✅ 导出完成 - 模式: {:?} 耗时: {}ms",
                mode,
                started.elapsed().as_millis()
            );
        }
        result
    }

    async fn copy_link(&self) -> Result<ExportOutcome, SnapError> {
        let url = self.page.location();
        let op = async {
            copy_link(&self.clipboard, &url)
                .await
                .map(ExportOutcome::LinkCopied)
                .map_err(|e| {
                    self.status.publish(codes::CLIPBOARD_API_NOT_SUPPORTED);
                    e
                })
        };

        self.guard()
            .run_with_failure(
                op,
                |_| self.status.publish(codes::LINK_COPIED),
                |_| self.status.publish(codes::COPY_LINK_FAILED),
            )
            .await
            .map_err(|failure| failure.error)
    }

    /// 应用外框布局后重新测量目标，并解析本次截图参数。
    fn prepare_render(&self, target: &CaptureTarget) -> Result<RenderConfig, SnapError> {
        let viewport = self.page.viewport();
        let layout = resolve_layout(
            viewport.width,
            self.options.padding,
            height_percentage(target.client_height, viewport.height),
        );
        self.page.apply_layout(&layout);

        let measured = self.locate_target().ok_or_else(|| {
            self.status.publish(codes::IMAGE_CREATION_FAILED);
            SnapError::CaptureFailed(format!(
                "应用布局后目标 #{} 不可用",
                self.options.target_element_id
            ))
        })?;

        let config = RenderConfig::resolve(&RenderInputs {
            viewport,
            client_width: measured.client_width,
            client_height: measured.client_height,
            device_pixel_ratio: self.device.device_pixel_ratio,
            class: self.device.class(),
        });
        log::debug!(
            "📐 截图参数 - {}x{} scale={} quality={} padding={:.1}",
            config.width_px,
            config.height_px,
            config.scale,
            config.quality,
            layout.padding_px
        );
        Ok(config)
    }

    async fn export_image(
        &self,
        mode: OperationMode,
        target: CaptureTarget,
    ) -> Result<ExportOutcome, SnapError> {
        let config = self.prepare_render(&target)?;

        let op = async {
            let png = self
                .capturer
                .capture(
                    &self.page,
                    &self.rasterizer,
                    &self.options.target_element_id,
                    &config,
                )
                .await?;

            if mode == OperationMode::DownloadImage {
                let filename = download_filename(self.options.title.as_deref(), (self.clock)());
                self.saver
                    .save(&png, &filename)
                    .await
                    .map(ExportOutcome::Downloaded)
            } else {
                copy_image(&self.clipboard, &png)
                    .await
                    .map(ExportOutcome::ImageCopied)
            }
        };

        let success_code = if mode == OperationMode::DownloadImage {
            codes::IMAGE_DOWNLOADED
        } else {
            codes::IMAGE_COPIED
        };

        self.guard()
            .run_with_failure(
                op,
                |_| self.status.publish(success_code),
                |_| self.status.publish(codes::IMAGE_OPERATION_FAILED),
            )
            .await
            .map_err(|failure| failure.error)
    }
}
