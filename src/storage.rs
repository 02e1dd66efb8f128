//! 下载目录管理
//!
//! - 优先使用设置中的自定义目录。
//! - 未设置时回退到当前工作目录下的 `snapshots` 子目录。
//! - 目录不存在时自动创建。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SnapError;

/// 默认下载子目录名。
pub const DEFAULT_DOWNLOAD_SUBDIR: &str = "snapshots";

/// 解析并确保下载目录存在。
pub fn resolve_download_dir(custom_dir: Option<&str>) -> Result<PathBuf, SnapError> {
    let base = std::env::current_dir()
        .map_err(|e| SnapError::FileSystem(format!("获取当前目录失败：{}", e)))?;
    resolve_download_dir_in(custom_dir, &base)
}

/// 同 [`resolve_download_dir`]，默认目录相对 `base` 而非当前工作目录。
pub fn resolve_download_dir_in(
    custom_dir: Option<&str>,
    base: &Path,
) -> Result<PathBuf, SnapError> {
    let dir = match custom_dir.map(str::trim).filter(|d| !d.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => base.join(DEFAULT_DOWNLOAD_SUBDIR),
    };

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            SnapError::FileSystem(format!("创建下载目录 '{}' 失败：{}", dir.display(), e))
        })?;
    }
    Ok(dir)
}
