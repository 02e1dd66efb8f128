//! 应用设置
//!
//! 设置保存在一个 JSON 文件中。文件缺失或内容损坏时回退到默认值并记录日志，
//! 不阻断启动；`validate` 负责数值范围校验。

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SnapError;
use crate::export::ClipboardRetryConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 持久化接口地址
    pub api_base_url: String,
    /// 复制链接时写入的页面地址
    pub page_url: String,
    /// 登录会话；为空视为未登录
    pub session_token: String,
    /// 下载目录；为空时使用默认目录
    pub download_dir: Option<String>,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub guard_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub button_reset_ms: u64,
    /// 外框内边距（px）
    pub padding: f64,
    pub target_element_id: String,
    pub overlay_element_id: String,
    pub clipboard: ClipboardRetryConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            page_url: "http://localhost:3000".to_string(),
            session_token: String::new(),
            download_dir: None,
            request_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            max_retries: 2,
            retry_delay_ms: 1_000,
            guard_timeout_ms: 15_000,
            settle_delay_ms: 100,
            button_reset_ms: 2_500,
            padding: 64.0,
            target_element_id: "screenshot".to_string(),
            overlay_element_id: "message-container".to_string(),
            clipboard: ClipboardRetryConfig::default(),
        }
    }
}

impl AppSettings {
    /// 读取设置文件；缺失或无法解析时回退到默认值。
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("⚙️ 设置文件不存在，使用默认设置：{}", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("⚠️ 解析设置文件失败，使用默认设置：{}", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("⚠️ 读取设置文件失败，使用默认设置：{}", e);
                Self::default()
            }
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), SnapError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SnapError::InvalidConfig(format!("序列化设置失败：{}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SnapError> {
        if self.request_timeout_ms == 0 {
            return Err(SnapError::InvalidConfig("request_timeout_ms 必须大于 0".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(SnapError::InvalidConfig("connect_timeout_ms 必须大于 0".to_string()));
        }
        if self.guard_timeout_ms == 0 {
            return Err(SnapError::InvalidConfig("guard_timeout_ms 必须大于 0".to_string()));
        }
        if self.max_retries > 10 {
            return Err(SnapError::InvalidConfig(format!(
                "max_retries 过大：{}（上限 10）",
                self.max_retries
            )));
        }
        if !(self.padding.is_finite() && (0.0..=512.0).contains(&self.padding)) {
            return Err(SnapError::InvalidConfig(format!(
                "padding 超出范围：{}（0~512）",
                self.padding
            )));
        }
        if self.target_element_id.trim().is_empty() {
            return Err(SnapError::InvalidConfig("target_element_id 不能为空".to_string()));
        }
        if self.clipboard.retries == 0 {
            return Err(SnapError::InvalidConfig("clipboard.retries 必须大于 0".to_string()));
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        !self.session_token.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn button_reset_delay(&self) -> Duration {
        Duration::from_millis(self.button_reset_ms)
    }
}
