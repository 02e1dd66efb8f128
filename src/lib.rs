//! # SnipShare 快照导出：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 调用方 (命令行 / 宿主界面)                │
//! │                                                          │
//! │  ActionButton ── Default → Loading → Success/Failure     │
//! │       │              (定时恢复 Default)                   │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↓ Exporter::snap(mode)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓                                                  │
//! │  ┌─ export ───── 复制链接 / 复制图片 / 下载图片           │
//! │  │   ├─ link_chain   剪贴板文本回退链                     │
//! │  │   ├─ image_chain  剪贴板图片回退链                     │
//! │  │   └─ download     文件名 + 落盘                        │
//! │  │                                                       │
//! │  ├─ guard ────── 超时 + 吞错 (OperationGuard)            │
//! │  ├─ capture ──── 浮层隐藏 (RAII) + 栅格化 + 解码          │
//! │  ├─ render ───── 截图参数 / 响应式外框布局                │
//! │  ├─ net ──────── 离线检测 · 超时 · 线性退避 · 片段接口    │
//! │  └─ status ───── 单值状态通道 (watch，后写者胜)           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `SnapError` 与状态码映射 |
//! | [`status`] | 进程级单值状态通道与状态码常量 |
//! | [`device`] | 移动设备识别、设备快照、在线状态 |
//! | [`net`] | 弹性请求层（离线/超时/退避/429）与片段持久化客户端 |
//! | [`guard`] | 异步操作保护、防抖、指数退避重试 |
//! | [`render`] | 截图尺寸/倍率/质量解析，响应式外框布局 |
//! | [`capture`] | 截图编排：浮层隐藏、等待稳定、栅格化、PNG 校验 |
//! | [`export`] | 三种导出方式及其剪贴板/文件回退链、导出按钮状态机 |
//! | [`settings`] | JSON 设置文件的读写与校验 |
//! | [`storage`] | 下载目录的获取与自动创建 |

pub mod capture;
pub mod device;
pub mod error;
pub mod export;
pub mod guard;
pub mod net;
pub mod render;
pub mod settings;
pub mod status;
pub mod storage;
