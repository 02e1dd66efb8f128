//! 原生栅格化原语
//!
//! # 设计思路
//!
//! 命令行环境没有 DOM，`FrameRasterizer` 以一张按 1x 预渲染好的目标帧（PNG）作为
//! "页面"，按截图参数重采样到目标尺寸后编码为 PNG data URL，满足 `Rasterizer` 契约。
//!
//! # 实现思路
//!
//! 1. `cache_bust = false` 时复用已解码的帧，否则重新读取并解码
//! 2. 帧按原始宽高比缩放到能放进目标尺寸的最大值，居中贴到透明画布上；
//!    外框被布局撑宽时只多出透明边，内容不会被拉伸
//! 3. 优先用 `fast_image_resize` 重采样，失败回退 `image::resize_exact`
//! 4. 解码、缩放、编码都在 `spawn_blocking` 中执行，不阻塞 async 运行时

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use fast_image_resize as fr;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, ImageEncoder, Rgba, RgbaImage};

use super::data_url::to_data_url;
use super::{CaptureTarget, Rasterizer};
use crate::error::SnapError;
use crate::render::RasterOptions;

/// 帧来源。
#[derive(Debug, Clone)]
pub enum FrameSource {
    File(PathBuf),
    Memory(Bytes),
}

/// 基于预渲染帧的栅格化器。
pub struct FrameRasterizer {
    source: FrameSource,
    filter: FilterType,
    cached: Arc<Mutex<Option<Arc<RgbaImage>>>>,
}

impl FrameRasterizer {
    pub fn new(source: FrameSource) -> Self {
        Self {
            source,
            filter: FilterType::Lanczos3,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(FrameSource::File(path.into()))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(FrameSource::Memory(bytes.into()))
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// 读取帧尺寸（1x），命令行用它作为截图目标的尺寸。
    pub fn frame_dimensions(&self) -> Result<(u32, u32), SnapError> {
        let frame = self.load_frame(false)?;
        Ok(frame.dimensions())
    }

    fn load_frame(&self, cache_bust: bool) -> Result<Arc<RgbaImage>, SnapError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| SnapError::CaptureFailed("帧缓存锁已中毒".to_string()))?;

        if !cache_bust {
            if let Some(frame) = cached.as_ref() {
                return Ok(Arc::clone(frame));
            }
        }

        let bytes = match &self.source {
            FrameSource::File(path) => std::fs::read(path).map(Bytes::from).map_err(|e| {
                SnapError::CaptureFailed(format!("无法读取帧文件 {}：{}", path.display(), e))
            })?,
            FrameSource::Memory(bytes) => bytes.clone(),
        };
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| SnapError::CaptureFailed(format!("帧解码失败：{}", e)))?
            .to_rgba8();

        let frame = Arc::new(decoded);
        *cached = Some(Arc::clone(&frame));
        Ok(frame)
    }

    fn render(&self, options: &RasterOptions) -> Result<Vec<u8>, SnapError> {
        if options.width == 0 || options.height == 0 {
            return Err(SnapError::CaptureFailed("截图尺寸为零".to_string()));
        }

        let frame = self.load_frame(options.cache_bust)?;
        let (fit_width, fit_height) =
            fit_within(frame.dimensions(), (options.width, options.height));
        let fitted = if frame.dimensions() == (fit_width, fit_height) {
            frame.as_ref().clone()
        } else {
            match resize_with_fast_image_resize(&frame, fit_width, fit_height, self.filter) {
                Ok(resized) => resized,
                Err(err) => {
                    log::warn!("⚠️ fast_image_resize 重采样失败，回退 resize_exact：{}", err);
                    DynamicImage::ImageRgba8(frame.as_ref().clone())
                        .resize_exact(fit_width, fit_height, self.filter)
                        .to_rgba8()
                }
            }
        };

        let rendered = if (fit_width, fit_height) == (options.width, options.height) {
            fitted
        } else {
            let mut canvas =
                RgbaImage::from_pixel(options.width, options.height, Rgba([0, 0, 0, 0]));
            let x = (options.width - fit_width) / 2;
            let y = (options.height - fit_height) / 2;
            imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));
            canvas
        };

        // PNG 无损，quality < 1 时只换用更快的压缩档位
        let compression = if options.quality < 1.0 {
            CompressionType::Fast
        } else {
            CompressionType::Default
        };
        let mut png = Vec::new();
        PngEncoder::new_with_quality(&mut png, compression, PngFilter::Adaptive)
            .write_image(
                rendered.as_raw(),
                rendered.width(),
                rendered.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| SnapError::CaptureFailed(format!("PNG 编码失败：{}", e)))?;
        Ok(png)
    }
}

impl Clone for FrameRasterizer {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            filter: self.filter,
            cached: Arc::clone(&self.cached),
        }
    }
}

impl Rasterizer for FrameRasterizer {
    async fn to_png(
        &self,
        target: &CaptureTarget,
        options: &RasterOptions,
    ) -> Result<String, SnapError> {
        let started = Instant::now();
        let this = self.clone();
        let opts = options.clone();

        let png = tokio::task::spawn_blocking(move || this.render(&opts))
            .await
            .map_err(|e| SnapError::CaptureFailed(format!("线程执行失败：{}", e)))??;

        log::info!(
            "🖼️ 栅格化完成 - 目标: #{} 输出: {}x{} 体积: {} KB 耗时: {}ms",
            target.element_id,
            options.width,
            options.height,
            png.len() / 1024,
            started.elapsed().as_millis()
        );
        Ok(to_data_url(&png))
    }
}

/// 保持宽高比放进 `bounds` 的最大尺寸（每边至少 1px，不超过 `bounds`）。
fn fit_within(frame: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (frame_w, frame_h) = (f64::from(frame.0.max(1)), f64::from(frame.1.max(1)));
    let scale = (f64::from(bounds.0) / frame_w).min(f64::from(bounds.1) / frame_h);
    let width = ((frame_w * scale).round() as u32).clamp(1, bounds.0);
    let height = ((frame_h * scale).round() as u32).clamp(1, bounds.1);
    (width, height)
}

fn resize_with_fast_image_resize(
    frame: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, SnapError> {
    let src_image = fr::images::Image::from_vec_u8(
        frame.width(),
        frame.height(),
        frame.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| SnapError::CaptureFailed(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| SnapError::CaptureFailed(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| SnapError::CaptureFailed("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
