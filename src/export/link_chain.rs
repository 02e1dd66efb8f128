//! 复制链接的回退链：异步写文本 → 传统复制命令。

use super::clipboard::ClipboardBackend;
use crate::error::SnapError;

/// 复制链接的一级回退。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTier {
    AsyncWriteText,
    LegacyTextarea,
}

impl LinkTier {
    pub const CHAIN: [LinkTier; 2] = [LinkTier::AsyncWriteText, LinkTier::LegacyTextarea];

    pub fn available<B: ClipboardBackend>(self, backend: &B) -> bool {
        match self {
            Self::AsyncWriteText => backend.supports_write_text(),
            Self::LegacyTextarea => backend.supports_legacy_copy(),
        }
    }

    pub async fn attempt<B: ClipboardBackend>(
        self,
        backend: &B,
        url: &str,
    ) -> Result<(), SnapError> {
        match self {
            Self::AsyncWriteText => backend.write_text(url).await,
            Self::LegacyTextarea => {
                if backend.legacy_copy_text(url) {
                    Ok(())
                } else {
                    Err(SnapError::FallbackCopyFailed)
                }
            }
        }
    }
}

/// 依次尝试各级回退。全部不可用时返回 `ClipboardUnsupported`，否则返回最后一级的错误。
pub async fn copy_link<B: ClipboardBackend>(backend: &B, url: &str) -> Result<LinkTier, SnapError> {
    let mut last_error = None;

    for tier in LinkTier::CHAIN {
        if !tier.available(backend) {
            log::debug!("⏭️ 复制链接：{:?} 不可用", tier);
            continue;
        }
        match tier.attempt(backend, url).await {
            Ok(()) => {
                log::info!("🔗 链接已复制（{:?}）", tier);
                return Ok(tier);
            }
            Err(e) => {
                log::warn!("⚠️ 复制链接 {:?} 失败，尝试下一级：{}", tier, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(SnapError::ClipboardUnsupported))
}
