//! PNG data URL 编解码
//!
//! 栅格化原语返回 `data:image/png;base64,...`。解码前先按 base64 长度估算
//! 解码后体积上限，超限直接拒绝；解码后用文件签名确认是 PNG，再从头部读取宽高。

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use crate::error::SnapError;

/// data URL 解码后允许的最大体积。
pub const MAX_DATA_URL_BYTES: u64 = 64 * 1024 * 1024;

const PNG_MIME: &str = "image/png";

/// 经过校验的 PNG 字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngBlob {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

impl PngBlob {
    /// 校验签名并读取尺寸。
    pub fn from_png_bytes(bytes: impl Into<Bytes>) -> Result<Self, SnapError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SnapError::CaptureFailed("图片内容为空".to_string()));
        }

        let kind = infer::get(&bytes)
            .ok_or_else(|| SnapError::CaptureFailed("无法识别图片类型".to_string()))?;
        if kind.mime_type() != PNG_MIME {
            return Err(SnapError::CaptureFailed(format!(
                "截图结果不是 PNG：{}",
                kind.mime_type()
            )));
        }

        let (width, height) = image::ImageReader::with_format(
            Cursor::new(bytes.as_ref()),
            image::ImageFormat::Png,
        )
        .into_dimensions()
        .map_err(|e| SnapError::CaptureFailed(format!("无法读取图片尺寸：{}", e)))?;

        Ok(Self {
            bytes,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        to_data_url(&self.bytes)
    }
}

/// base64 解码后体积的上界。
fn estimate_decoded_upper_bound(encoded: &str) -> u64 {
    (encoded.len() as u64).div_ceil(4) * 3
}

/// 把 PNG data URL 解码为 `PngBlob`。
pub fn decode_data_url(data_url: &str, max_bytes: u64) -> Result<PngBlob, SnapError> {
    let normalized = data_url.trim();
    if !normalized.starts_with("data:image/") {
        return Err(SnapError::CaptureFailed("不是图片 data URL".to_string()));
    }

    let marker = normalized
        .find(";base64,")
        .ok_or_else(|| SnapError::CaptureFailed("缺少 base64 标记".to_string()))?;
    let payload = &normalized[marker + ";base64,".len()..];

    let estimated = estimate_decoded_upper_bound(payload);
    if estimated > max_bytes {
        return Err(SnapError::CaptureFailed(format!(
            "截图数据过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            max_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| SnapError::CaptureFailed(format!("Base64 解码失败：{}", e)))?;

    PngBlob::from_png_bytes(bytes)
}

pub fn to_data_url(png: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        PNG_MIME,
        general_purpose::STANDARD.encode(png)
    )
}
