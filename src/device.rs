//! 设备识别模块
//!
//! # 设计思路
//!
//! 截图参数、超时倍率都依赖"是否移动设备"这一判断。这里把判断收敛为
//! 可注入的 `DeviceClass`：上层可以直接传入预先算好的分类，测试无需构造
//! User-Agent 字符串。
//!
//! # 实现思路
//!
//! - 视口宽度 `< 768` 或 User-Agent 命中移动设备特征即视为移动设备。
//! - User-Agent 正则通过 `once_cell::sync::Lazy` 首次使用时编译。
//! - `DeviceProfile` 是一次操作开始时采集的设备快照，失败时附带到错误报告。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// 移动端断点（像素）。
pub const MOBILE_BREAKPOINT_PX: u32 = 768;

static MOBILE_UA: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini").ok()
});

/// 设备分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    /// 按视口宽度与 User-Agent 判定设备分类。
    pub fn detect(viewport_width: u32, user_agent: &str) -> Self {
        if viewport_width < MOBILE_BREAKPOINT_PX || is_mobile_user_agent(user_agent) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub fn is_mobile(self) -> bool {
        matches!(self, Self::Mobile)
    }
}

/// User-Agent 是否命中常见移动设备特征。
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    MOBILE_UA
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(user_agent))
}

/// 视口尺寸（CSS 像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// 一次操作开始时采集的设备快照。
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub viewport: Viewport,
    pub user_agent: String,
    /// 设备像素比；宿主无法提供时为 `None`（按 1 处理）。
    pub device_pixel_ratio: Option<f64>,
    pub online: bool,
    /// 显式指定的分类，优先于自动识别。
    pub class_override: Option<DeviceClass>,
}

impl DeviceProfile {
    pub fn class(&self) -> DeviceClass {
        self.class_override
            .unwrap_or_else(|| DeviceClass::detect(self.viewport.width, &self.user_agent))
    }

    /// 附带到错误报告中的设备信息。
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            width: self.viewport.width,
            height: self.viewport.height,
            online: self.online,
            user_agent: self.user_agent.clone(),
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            user_agent: String::new(),
            device_pixel_ratio: Some(1.0),
            online: true,
            class_override: None,
        }
    }
}

/// 错误上下文中的设备信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub width: u32,
    pub height: u32,
    pub online: bool,
    pub user_agent: String,
}

/// 在线状态探测。
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// 可在运行时切换的在线状态，克隆体共享同一开关。
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    online: Arc<AtomicBool>,
}

impl SharedConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for SharedConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    #[test]
    fn narrow_viewport_is_mobile() {
        assert_eq!(DeviceClass::detect(767, DESKTOP_UA), DeviceClass::Mobile);
        assert_eq!(DeviceClass::detect(768, DESKTOP_UA), DeviceClass::Desktop);
    }

    #[test]
    fn mobile_user_agent_wins_on_wide_viewport() {
        let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(DeviceClass::detect(1366, ipad), DeviceClass::Mobile);
        assert!(is_mobile_user_agent("opera mini/36"));
        assert!(!is_mobile_user_agent(DESKTOP_UA));
    }

    #[test]
    fn override_takes_precedence() {
        let profile = DeviceProfile {
            viewport: Viewport { width: 320, height: 640 },
            class_override: Some(DeviceClass::Desktop),
            ..Default::default()
        };
        assert_eq!(profile.class(), DeviceClass::Desktop);
    }

    #[test]
    fn info_snapshot_mirrors_profile() {
        let profile = DeviceProfile {
            viewport: Viewport { width: 390, height: 844 },
            user_agent: "iPhone".to_string(),
            online: false,
            ..Default::default()
        };
        let info = profile.info();
        assert_eq!((info.width, info.height), (390, 844));
        assert!(!info.online);
        assert_eq!(info.user_agent, "iPhone");
    }

    #[test]
    fn shared_connectivity_toggles_across_clones() {
        let conn = SharedConnectivity::default();
        let other = conn.clone();
        assert!(conn.is_online());
        other.set_online(false);
        assert!(!conn.is_online());
    }
}
