//! 响应式外框布局
//!
//! 外框（包裹截图目标的容器）的内边距、顶部外边距、圆角和宽度都随视口宽度变化。
//! 这里的函数都是纯函数，输入视口尺寸与用户设置，输出唯一结果。
//!
//! # 断点
//!
//! | 视口宽度 | 内边距 | 外框宽度 | 最小截图宽度 |
//! |---|---|---|---|
//! | `< 360` | `max(4, p/4)` | 95vw | 220px |
//! | `< 480` | `max(8, p/3)` | 92vw | 260px |
//! | `< 768` | `max(12, p/2)` | 90vw | 300px |
//! | 其他 | `p` | auto | 512px |

use serde::Serialize;

/// 默认顶部外边距（vh）。
pub const DEFAULT_MARGIN_TOP_VH: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Tiny,
    Small,
    Medium,
    Large,
}

impl Breakpoint {
    pub fn for_width(viewport_width: u32) -> Self {
        match viewport_width {
            0..360 => Self::Tiny,
            360..480 => Self::Small,
            480..768 => Self::Medium,
            _ => Self::Large,
        }
    }
}

/// 外框宽度。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapperWidth {
    Vw(f64),
    Auto,
}

/// 按视口宽度收缩内边距。
pub fn responsive_padding(viewport_width: u32, padding: f64) -> f64 {
    match Breakpoint::for_width(viewport_width) {
        Breakpoint::Tiny => (padding / 4.0).max(4.0),
        Breakpoint::Small => (padding / 3.0).max(8.0),
        Breakpoint::Medium => (padding / 2.0).max(12.0),
        Breakpoint::Large => padding,
    }
}

/// 外框高度占视口高度的百分比。视口高度为零时视为 0。
pub fn height_percentage(wrapper_height: u32, viewport_height: u32) -> f64 {
    if viewport_height == 0 {
        return 0.0;
    }
    f64::from(wrapper_height) / f64::from(viewport_height) * 100.0
}

/// 顶部外边距（vh）。内容越高，外边距越小。
pub fn margin_top(viewport_width: u32, height_pct: f64) -> f64 {
    let mut margin = if viewport_width < 480 {
        (5.0 - height_pct / 20.0).max(1.0)
    } else if viewport_width < 768 {
        (6.0 - height_pct / 15.0).max(2.0)
    } else if viewport_width < 1024 {
        (8.0 - height_pct / 12.0).max(3.0)
    } else if height_pct > 40.0 {
        let excess = height_pct - 40.0;
        (15.0 - (excess / 0.5) * 0.35).max(2.0)
    } else {
        DEFAULT_MARGIN_TOP_VH
    };

    if viewport_width < 360 {
        margin = (margin - 1.0).max(0.5);
    }
    margin
}

pub fn border_radius(viewport_width: u32, padding: f64) -> f64 {
    if viewport_width < 768 {
        6.0
    } else {
        8.0 + padding / 10.0
    }
}

/// 外框布局的完整结果。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperLayout {
    pub breakpoint: Breakpoint,
    pub padding_px: f64,
    pub margin_top_vh: f64,
    pub border_radius_px: f64,
    pub wrapper_width: WrapperWidth,
    pub min_capture_width_px: u32,
}

pub fn resolve_layout(viewport_width: u32, padding: f64, height_pct: f64) -> WrapperLayout {
    let breakpoint = Breakpoint::for_width(viewport_width);
    let (wrapper_width, min_capture_width_px) = match breakpoint {
        Breakpoint::Tiny => (WrapperWidth::Vw(95.0), 220),
        Breakpoint::Small => (WrapperWidth::Vw(92.0), 260),
        Breakpoint::Medium => (WrapperWidth::Vw(90.0), 300),
        Breakpoint::Large => (WrapperWidth::Auto, 512),
    };

    WrapperLayout {
        breakpoint,
        padding_px: responsive_padding(viewport_width, padding),
        margin_top_vh: margin_top(viewport_width, height_pct),
        border_radius_px: border_radius(viewport_width, padding),
        wrapper_width,
        min_capture_width_px,
    }
}

/// 跟踪当前顶部外边距；尺寸变化时只在结果变化后才返回新值。
#[derive(Debug, Clone)]
pub struct LayoutTracker {
    margin_top_vh: f64,
}

impl LayoutTracker {
    pub fn new() -> Self {
        Self {
            margin_top_vh: DEFAULT_MARGIN_TOP_VH,
        }
    }

    pub fn margin_top_vh(&self) -> f64 {
        self.margin_top_vh
    }

    pub fn observe(
        &mut self,
        viewport_width: u32,
        viewport_height: u32,
        wrapper_height: u32,
    ) -> Option<f64> {
        let next = margin_top(
            viewport_width,
            height_percentage(wrapper_height, viewport_height),
        );
        if next == self.margin_top_vh {
            return None;
        }
        log::debug!("📐 顶部外边距：{:.2}vh -> {:.2}vh", self.margin_top_vh, next);
        self.margin_top_vh = next;
        Some(next)
    }
}

impl Default for LayoutTracker {
    fn default() -> Self {
        Self::new()
    }
}
