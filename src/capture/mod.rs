//! 截图模块
//!
//! # 设计思路
//!
//! 截图只依赖两个接缝：
//! - `Page`：实时文档（视口、目标元素、页面地址、浮层显隐、布局应用）
//! - `Rasterizer`：栅格化原语，把目标元素渲染为 PNG data URL
//!
//! `SnapshotCapturer` 负责编排：上报状态 → 隐藏浮层 → 等待界面稳定 →
//! 栅格化 → 解码校验。
//!
//! # 实现思路
//!
//! - 浮层隐藏使用 `OverlayGuard`（RAII）：构造时隐藏，`Drop` 时恢复原显示值，
//!   无论成功、失败还是超时被丢弃都会恢复。
//! - 等待时长可配置，但不少于 100ms。
//! - 栅格化或解码的任何失败都归一为 `CaptureFailed`。

pub mod data_url;
pub mod rasterizer;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub use data_url::{MAX_DATA_URL_BYTES, PngBlob, decode_data_url, to_data_url};
pub use rasterizer::{FrameRasterizer, FrameSource};

use crate::device::Viewport;
use crate::error::SnapError;
use crate::render::{RasterOptions, RenderConfig, WrapperLayout};
use crate::status::{StatusReporter, codes};

/// 截图前的最短等待。
pub const MIN_SETTLE_DELAY: Duration = Duration::from_millis(100);
/// 默认截图目标元素 id。
pub const DEFAULT_TARGET_ID: &str = "screenshot";
/// 默认状态浮层元素 id。
pub const DEFAULT_OVERLAY_ID: &str = "message-container";

/// 截图目标的实时测量值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub element_id: String,
    pub client_width: u32,
    pub client_height: u32,
}

impl CaptureTarget {
    pub fn has_area(&self) -> bool {
        self.client_width > 0 && self.client_height > 0
    }
}

/// 实时文档接缝。
pub trait Page: Send + Sync {
    fn viewport(&self) -> Viewport;

    /// 查找并测量目标元素。
    fn find_target(&self, element_id: &str) -> Option<CaptureTarget>;

    /// 当前页面地址（复制链接使用）。
    fn location(&self) -> String;

    /// 元素当前的 display 值；元素不存在时为 `None`。
    fn overlay_display(&self, element_id: &str) -> Option<String>;

    fn set_overlay_display(&self, element_id: &str, display: &str);

    /// 应用外框布局。默认不做任何事。
    fn apply_layout(&self, _layout: &WrapperLayout) {}
}

/// 栅格化原语接缝。
pub trait Rasterizer: Send + Sync {
    fn to_png(
        &self,
        target: &CaptureTarget,
        options: &RasterOptions,
    ) -> impl Future<Output = Result<String, SnapError>> + Send;
}

/// 截图期间隐藏浮层，离开作用域时恢复。
pub struct OverlayGuard<'a, P: Page + ?Sized> {
    page: &'a P,
    element_id: String,
    original: Option<String>,
}

impl<'a, P: Page + ?Sized> OverlayGuard<'a, P> {
    /// 隐藏浮层；元素不存在时什么都不做。
    pub fn hide(page: &'a P, element_id: &str) -> Self {
        let original = page.overlay_display(element_id);
        if original.is_some() {
            page.set_overlay_display(element_id, "none");
            log::debug!("🙈 已隐藏浮层 #{}", element_id);
        }
        Self {
            page,
            element_id: element_id.to_string(),
            original,
        }
    }
}

impl<P: Page + ?Sized> Drop for OverlayGuard<'_, P> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.page.set_overlay_display(&self.element_id, &original);
            log::debug!("👀 已恢复浮层 #{}", self.element_id);
        }
    }
}

/// 截图编排器。
#[derive(Debug, Clone)]
pub struct SnapshotCapturer {
    status: StatusReporter,
    overlay_element_id: String,
    settle_delay: Duration,
    max_bytes: u64,
}

impl SnapshotCapturer {
    pub fn new(status: StatusReporter) -> Self {
        Self {
            status,
            overlay_element_id: DEFAULT_OVERLAY_ID.to_string(),
            settle_delay: MIN_SETTLE_DELAY,
            max_bytes: MAX_DATA_URL_BYTES,
        }
    }

    pub fn with_overlay_element(mut self, element_id: impl Into<String>) -> Self {
        self.overlay_element_id = element_id.into();
        self
    }

    /// 设置截图前等待时长，低于 100ms 时按 100ms 处理。
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay.max(MIN_SETTLE_DELAY);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// 截取目标元素为 PNG。
    pub async fn capture<P, R>(
        &self,
        page: &P,
        rasterizer: &R,
        target_id: &str,
        config: &RenderConfig,
    ) -> Result<PngBlob, SnapError>
    where
        P: Page,
        R: Rasterizer,
    {
        let started = Instant::now();
        self.status.publish(codes::PROCESSING_IMAGE);

        let _overlay = OverlayGuard::hide(page, &self.overlay_element_id);
        tokio::time::sleep(self.settle_delay).await;

        let target = page
            .find_target(target_id)
            .filter(CaptureTarget::has_area)
            .ok_or_else(|| SnapError::CaptureFailed(format!("截图时未找到目标 #{}", target_id)))?;

        let data_url = rasterizer
            .to_png(&target, &config.raster_options())
            .await
            .map_err(|e| match e {
                SnapError::CaptureFailed(_) => e,
                other => SnapError::CaptureFailed(other.to_string()),
            })?;

        let blob = decode_data_url(&data_url, self.max_bytes)?;
        log::info!(
            "📸 截图完成 - {}x{} {} KB 耗时: {}ms",
            blob.width,
            blob.height,
            blob.len() / 1024,
            started.elapsed().as_millis()
        );
        Ok(blob)
    }
}

/// 固定尺寸的内存页面，供命令行与测试使用。
///
/// 应用外框布局时，目标宽度至少为布局给出的最小截图宽度。
#[derive(Debug)]
pub struct StaticPage {
    viewport: Viewport,
    location: String,
    targets: HashMap<String, (u32, u32)>,
    displays: Mutex<HashMap<String, String>>,
    layout: Mutex<Option<WrapperLayout>>,
}

impl StaticPage {
    pub fn new(viewport: Viewport, location: impl Into<String>) -> Self {
        Self {
            viewport,
            location: location.into(),
            targets: HashMap::new(),
            displays: Mutex::new(HashMap::new()),
            layout: Mutex::new(None),
        }
    }

    pub fn with_target(mut self, element_id: impl Into<String>, width: u32, height: u32) -> Self {
        self.targets.insert(element_id.into(), (width, height));
        self
    }

    pub fn with_overlay(self, element_id: impl Into<String>, display: impl Into<String>) -> Self {
        if let Ok(mut displays) = self.displays.lock() {
            displays.insert(element_id.into(), display.into());
        }
        self
    }

    pub fn applied_layout(&self) -> Option<WrapperLayout> {
        self.layout.lock().ok().and_then(|layout| *layout)
    }
}

impl Page for StaticPage {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn find_target(&self, element_id: &str) -> Option<CaptureTarget> {
        let (width, height) = *self.targets.get(element_id)?;
        let min_width = self
            .applied_layout()
            .map(|layout| layout.min_capture_width_px)
            .unwrap_or(0);
        Some(CaptureTarget {
            element_id: element_id.to_string(),
            client_width: if width == 0 { 0 } else { width.max(min_width) },
            client_height: height,
        })
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn overlay_display(&self, element_id: &str) -> Option<String> {
        self.displays.lock().ok()?.get(element_id).cloned()
    }

    fn set_overlay_display(&self, element_id: &str, display: &str) {
        if let Ok(mut displays) = self.displays.lock() {
            displays.insert(element_id.to_string(), display.to_string());
        }
    }

    fn apply_layout(&self, layout: &WrapperLayout) {
        if let Ok(mut slot) = self.layout.lock() {
            *slot = Some(*layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::data_url::tests::tiny_png;
    use crate::device::DeviceClass;
    use crate::render::{RenderInputs, resolve_layout};

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        async fn to_png(&self, _: &CaptureTarget, _: &RasterOptions) -> Result<String, SnapError> {
            Err(SnapError::Network("tainted canvas".into()))
        }
    }

    /// 断言栅格化时浮层已被隐藏。
    struct OverlayCheckingRasterizer<'a> {
        page: &'a StaticPage,
    }

    impl Rasterizer for OverlayCheckingRasterizer<'_> {
        async fn to_png(&self, _: &CaptureTarget, _: &RasterOptions) -> Result<String, SnapError> {
            assert_eq!(
                self.page.overlay_display(DEFAULT_OVERLAY_ID).as_deref(),
                Some("none")
            );
            Ok(to_data_url(&tiny_png(2, 2)))
        }
    }

    fn page() -> StaticPage {
        StaticPage::new(Viewport::default(), "https://snipshare.dev/abc")
            .with_target(DEFAULT_TARGET_ID, 2, 2)
            .with_overlay(DEFAULT_OVERLAY_ID, "flex")
    }

    fn config() -> RenderConfig {
        RenderConfig::resolve(&RenderInputs {
            viewport: Viewport::default(),
            client_width: 2,
            client_height: 2,
            device_pixel_ratio: None,
            class: DeviceClass::Desktop,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_is_hidden_during_capture_and_restored_after() {
        let page = page();
        let status = StatusReporter::new();
        let capturer = SnapshotCapturer::new(status.clone());

        let blob = capturer
            .capture(
                &page,
                &OverlayCheckingRasterizer { page: &page },
                DEFAULT_TARGET_ID,
                &config(),
            )
            .await
            .expect("capture");

        assert_eq!((blob.width, blob.height), (2, 2));
        assert_eq!(page.overlay_display(DEFAULT_OVERLAY_ID).as_deref(), Some("flex"));
        assert_eq!(status.current(), codes::PROCESSING_IMAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn rasterizer_errors_become_capture_failed_and_overlay_restores() {
        let page = page();
        let capturer = SnapshotCapturer::new(StatusReporter::new());

        let result = capturer
            .capture(&page, &FailingRasterizer, DEFAULT_TARGET_ID, &config())
            .await;

        assert!(matches!(result, Err(SnapError::CaptureFailed(_))));
        assert_eq!(page.overlay_display(DEFAULT_OVERLAY_ID).as_deref(), Some("flex"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_target_at_capture_time_fails() {
        let page = page();
        let capturer = SnapshotCapturer::new(StatusReporter::new());

        let result = capturer
            .capture(&page, &FailingRasterizer, "nope", &config())
            .await;

        assert!(matches!(result, Err(SnapError::CaptureFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_is_at_least_100ms() {
        let capturer = SnapshotCapturer::new(StatusReporter::new())
            .with_settle_delay(Duration::from_millis(10));
        assert_eq!(capturer.settle_delay(), MIN_SETTLE_DELAY);

        let page = page();
        let start = tokio::time::Instant::now();
        let _ = capturer
            .capture(
                &page,
                &OverlayCheckingRasterizer { page: &page },
                DEFAULT_TARGET_ID,
                &config(),
            )
            .await;
        assert!(start.elapsed() >= MIN_SETTLE_DELAY);
    }

    #[test]
    fn overlay_guard_skips_missing_elements() {
        let page = StaticPage::new(Viewport::default(), "https://x");
        {
            let _guard = OverlayGuard::hide(&page, DEFAULT_OVERLAY_ID);
        }
        assert_eq!(page.overlay_display(DEFAULT_OVERLAY_ID), None);
    }

    #[test]
    fn applied_layout_widens_narrow_targets() {
        let page = StaticPage::new(Viewport { width: 375, height: 800 }, "https://x")
            .with_target(DEFAULT_TARGET_ID, 200, 120);
        page.apply_layout(&resolve_layout(375, 64.0, 20.0));

        let target = page.find_target(DEFAULT_TARGET_ID).expect("target");
        assert_eq!(target.client_width, 260);
        assert_eq!(target.client_height, 120);
    }
}
