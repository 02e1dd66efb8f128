//! 复制图片的回退链
//!
//! 1. `AsyncWrite`：直接把 PNG 写入剪贴板
//! 2. `CanvasReencode`：解码为 RGBA 后重新编码为 PNG，再写一次
//! 3. `EditableContainer`：把重新编码后的 data URL 放入可编辑容器，执行传统复制命令
//!
//! 每一级只在上一级不可用或失败时才尝试。

use image::codecs::png::PngEncoder;
use image::ImageEncoder;

use super::clipboard::ClipboardBackend;
use crate::capture::PngBlob;
use crate::error::SnapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTier {
    AsyncWrite,
    CanvasReencode,
    EditableContainer,
}

impl ImageTier {
    pub const CHAIN: [ImageTier; 3] = [
        ImageTier::AsyncWrite,
        ImageTier::CanvasReencode,
        ImageTier::EditableContainer,
    ];

    pub fn available<B: ClipboardBackend>(self, backend: &B) -> bool {
        match self {
            Self::AsyncWrite | Self::CanvasReencode => backend.supports_write_image(),
            Self::EditableContainer => backend.supports_legacy_copy(),
        }
    }

    pub async fn attempt<B: ClipboardBackend>(
        self,
        backend: &B,
        png: &PngBlob,
    ) -> Result<(), SnapError> {
        match self {
            Self::AsyncWrite => backend.write_image(png).await,
            Self::CanvasReencode => {
                let reencoded = reencode_png(png)?;
                backend.write_image(&reencoded).await
            }
            Self::EditableContainer => {
                let reencoded = reencode_png(png)?;
                if backend.legacy_copy_image(&reencoded.to_data_url()) {
                    Ok(())
                } else {
                    Err(SnapError::FallbackCopyFailed)
                }
            }
        }
    }
}

/// 解码为 RGBA 后重新编码为 PNG。
pub fn reencode_png(png: &PngBlob) -> Result<PngBlob, SnapError> {
    let rgba = image::load_from_memory_with_format(&png.bytes, image::ImageFormat::Png)
        .map_err(|e| SnapError::ClipboardWrite(format!("图片重新解码失败：{}", e)))?
        .to_rgba8();

    let mut out = Vec::with_capacity(png.len());
    PngEncoder::new(&mut out)
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| SnapError::ClipboardWrite(format!("图片重新编码失败：{}", e)))?;

    PngBlob::from_png_bytes(out)
}

/// 依次尝试各级回退。全部不可用时返回 `ClipboardUnsupported`，否则返回最后一级的错误。
pub async fn copy_image<B: ClipboardBackend>(
    backend: &B,
    png: &PngBlob,
) -> Result<ImageTier, SnapError> {
    let mut last_error = None;

    for tier in ImageTier::CHAIN {
        if !tier.available(backend) {
            log::debug!("⏭️ 复制图片：{:?} 不可用", tier);
            continue;
        }
        match tier.attempt(backend, png).await {
            Ok(()) => {
                log::info!("📋 图片已复制（{:?}）", tier);
                return Ok(tier);
            }
            Err(e) => {
                log::warn!("⚠️ 复制图片 {:?} 失败，尝试下一级：{}", tier, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(SnapError::ClipboardUnsupported))
}
