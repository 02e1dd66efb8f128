//! 下载图片：文件名生成与文件保存接缝。

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::capture::PngBlob;
use crate::error::SnapError;

/// 标题为空时使用的文件名前缀。
pub const DEFAULT_TITLE: &str = "code-snippet";

/// 生成 `{标题}-{时间戳}.png`，时间戳为 ISO-8601（毫秒、`Z`），其中 `:` 与 `.` 替换为 `-`。
pub fn download_filename(title: Option<&str>, now: DateTime<Utc>) -> String {
    let title = title.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TITLE);
    let timestamp = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("{}-{}.png", title, timestamp)
}

/// 文件保存接缝。返回最终写入的位置。
pub trait FileSaver: Send + Sync {
    fn save(
        &self,
        png: &PngBlob,
        filename: &str,
    ) -> impl Future<Output = Result<PathBuf, SnapError>> + Send;
}

/// 写入本地目录的文件保存器。
#[derive(Debug, Clone)]
pub struct DiskFileSaver {
    dir: PathBuf,
}

impl DiskFileSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// 去掉路径分隔符，防止标题把文件写到目录之外。
fn sanitize_filename(filename: &str) -> String {
    let cleaned = filename.replace(['/', '\\'], "_");
    if cleaned.trim_matches('.').is_empty() {
        format!("{}.png", DEFAULT_TITLE)
    } else {
        cleaned
    }
}

impl FileSaver for DiskFileSaver {
    async fn save(&self, png: &PngBlob, filename: &str) -> Result<PathBuf, SnapError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            SnapError::FileSystem(format!("无法创建目录 {}：{}", self.dir.display(), e))
        })?;

        let path = self.dir.join(sanitize_filename(filename));
        tokio::fs::write(&path, &png.bytes)
            .await
            .map_err(|e| SnapError::FileSystem(format!("无法写入 {}：{}", path.display(), e)))?;

        log::info!("💾 图片已保存：{}", path.display());
        Ok(path)
    }
}
