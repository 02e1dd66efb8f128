//! 截图参数解析
//!
//! 每次截图前根据实时测量值算出一份 `RenderConfig`，截图期间不再变化。
//!
//! # 规则
//!
//! - `pixel_ratio = min(dpr ?? 1, 移动端 ? 2 : 3)`
//! - `scale = 移动端 ? 1 : pixel_ratio`
//! - `quality = 移动端 ? 0.95 : 1.0`
//! - 输出尺寸 = 目标元素尺寸 × `scale`（四舍五入到整数像素）
//!
//! 纯函数：相同输入必然得到相同输出。

use serde::Serialize;

use crate::device::{DeviceClass, Viewport};

/// 移动端像素比上限。
pub const MOBILE_MAX_PIXEL_RATIO: f64 = 2.0;
/// 桌面端像素比上限。
pub const DESKTOP_MAX_PIXEL_RATIO: f64 = 3.0;

/// 解析截图参数所需的实时测量值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInputs {
    pub viewport: Viewport,
    pub client_width: u32,
    pub client_height: u32,
    pub device_pixel_ratio: Option<f64>,
    pub class: DeviceClass,
}

/// 传给栅格化器的样式覆盖。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOverrides {
    pub max_width: &'static str,
    pub max_height: &'static str,
    pub transform: String,
    pub transform_origin: &'static str,
    pub background_color: &'static str,
}

impl StyleOverrides {
    fn for_scale(scale: f64) -> Self {
        Self {
            max_width: "none",
            max_height: "none",
            transform: format!("scale({})", scale),
            transform_origin: "top left",
            background_color: "transparent",
        }
    }
}

/// 单次截图的冻结参数。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    pub width_px: u32,
    pub height_px: u32,
    pub scale: f64,
    pub pixel_ratio: f64,
    pub quality: f64,
    pub background_color: &'static str,
    pub cache_bust: bool,
    pub style: StyleOverrides,
}

impl RenderConfig {
    pub fn resolve(inputs: &RenderInputs) -> Self {
        let mobile = inputs.class.is_mobile();
        let dpr = inputs
            .device_pixel_ratio
            .filter(|dpr| dpr.is_finite() && *dpr > 0.0)
            .unwrap_or(1.0);
        let cap = if mobile {
            MOBILE_MAX_PIXEL_RATIO
        } else {
            DESKTOP_MAX_PIXEL_RATIO
        };
        let pixel_ratio = dpr.min(cap);
        let scale = if mobile { 1.0 } else { pixel_ratio };

        Self {
            width_px: scaled(inputs.client_width, scale),
            height_px: scaled(inputs.client_height, scale),
            scale,
            pixel_ratio,
            quality: if mobile { 0.95 } else { 1.0 },
            background_color: "transparent",
            cache_bust: true,
            style: StyleOverrides::for_scale(scale),
        }
    }

    /// 栅格化调用参数。
    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions {
            width: self.width_px,
            height: self.height_px,
            style: self.style.clone(),
            quality: self.quality,
            cache_bust: self.cache_bust,
        }
    }
}

fn scaled(length: u32, scale: f64) -> u32 {
    (f64::from(length) * scale).round() as u32
}

/// 栅格化原语接收的参数。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterOptions {
    pub width: u32,
    pub height: u32,
    pub style: StyleOverrides,
    pub quality: f64,
    pub cache_bust: bool,
}
