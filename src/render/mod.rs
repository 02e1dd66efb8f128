//! 渲染参数：截图几何（`config`）与响应式外框布局（`layout`）。

pub mod config;
pub mod layout;

pub use config::{RasterOptions, RenderConfig, RenderInputs, StyleOverrides};
pub use layout::{
    Breakpoint, LayoutTracker, WrapperLayout, WrapperWidth, border_radius, height_percentage,
    margin_top, resolve_layout, responsive_padding,
};
