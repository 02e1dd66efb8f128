//! 导出按钮状态机
//!
//! `Default → Loading → {Success, Failure} → (2500ms 后) → Default`。
//! 非 `Default` 状态下按钮禁用，同一按钮不会重入；复制链接在未登录时也禁用。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use super::OperationMode;
use crate::error::SnapError;

/// 结果状态保持多久后恢复默认。
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonState {
    Default,
    Loading,
    Success,
    Failure,
}

/// 按钮元数据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    pub id: &'static str,
    pub mode: OperationMode,
    pub default_label: &'static str,
    pub success_label: &'static str,
    pub hotkey: &'static str,
    pub prevent_default: bool,
    pub requires_session: bool,
}

impl ActionSpec {
    pub fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::CopyLink => Self {
                id: "copy-link",
                mode,
                default_label: "Copy link",
                success_label: "Link Copied",
                hotkey: "meta+shift+c",
                prevent_default: true,
                requires_session: true,
            },
            OperationMode::CopyImage => Self {
                id: "copy-image",
                mode,
                default_label: "Copy image",
                success_label: "Image copied",
                hotkey: "meta+c",
                prevent_default: false,
                requires_session: false,
            },
            OperationMode::DownloadImage => Self {
                id: "download-image",
                mode,
                default_label: "Download as PNG",
                success_label: "Image download started",
                hotkey: "meta+s",
                prevent_default: true,
                requires_session: false,
            },
        }
    }

    pub fn all() -> [Self; 3] {
        [
            Self::for_mode(OperationMode::CopyLink),
            Self::for_mode(OperationMode::CopyImage),
            Self::for_mode(OperationMode::DownloadImage),
        ]
    }

    /// 按快捷键查找按钮。
    pub fn by_hotkey(hotkey: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|spec| spec.hotkey.eq_ignore_ascii_case(hotkey))
    }

    /// 当前状态下显示的文案；只有成功状态有专属文案。
    pub fn label(&self, state: ButtonState) -> &'static str {
        match state {
            ButtonState::Success => self.success_label,
            _ => self.default_label,
        }
    }
}

/// 单个导出按钮。
pub struct ActionButton {
    spec: ActionSpec,
    state: Arc<watch::Sender<ButtonState>>,
    reset_delay: Duration,
}

impl ActionButton {
    pub fn new(spec: ActionSpec) -> Self {
        Self {
            spec,
            state: Arc::new(watch::Sender::new(ButtonState::Default)),
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }

    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    pub fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    pub fn state(&self) -> ButtonState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ButtonState> {
        self.state.subscribe()
    }

    pub fn label(&self) -> &'static str {
        self.spec.label(self.state())
    }

    pub fn is_disabled(&self, authenticated: bool) -> bool {
        self.state() != ButtonState::Default || (self.spec.requires_session && !authenticated)
    }

    /// 点击按钮。按钮禁用时不执行动作，返回 `None`。
    ///
    /// 动作结束后按钮进入 `Success` / `Failure`，并在后台计时恢复为 `Default`，
    /// 因此需要在 tokio 运行时内调用。
    pub async fn click<T, F, Fut>(
        &self,
        authenticated: bool,
        action: F,
    ) -> Option<Result<T, SnapError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SnapError>>,
    {
        if self.spec.requires_session && !authenticated {
            log::debug!("🚫 按钮 {} 需要登录会话", self.spec.id);
            return None;
        }

        // 只有从 Default 切到 Loading 的那一次点击获得执行权。
        let acquired = self.state.send_if_modified(|state| {
            if *state == ButtonState::Default {
                *state = ButtonState::Loading;
                true
            } else {
                false
            }
        });
        if !acquired {
            log::debug!("🚫 按钮 {} 当前不可用（{:?}）", self.spec.id, self.state());
            return None;
        }

        let result = action().await;
        let next = if result.is_ok() {
            ButtonState::Success
        } else {
            ButtonState::Failure
        };
        self.state.send_replace(next);
        log::debug!("🔘 按钮 {} -> {:?}", self.spec.id, next);

        let state = Arc::clone(&self.state);
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.send_replace(ButtonState::Default);
        });

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_matches_actions_bar() {
        let link = ActionSpec::for_mode(OperationMode::CopyLink);
        assert_eq!(link.label(ButtonState::Default), "Copy link");
        assert_eq!(link.label(ButtonState::Success), "Link Copied");
        assert_eq!(link.label(ButtonState::Failure), "Copy link");
        assert!(link.prevent_default);

        assert_eq!(ActionSpec::by_hotkey("META+C").map(|s| s.id), Some("copy-image"));
        assert_eq!(
            ActionSpec::by_hotkey("meta+s").map(|s| s.mode),
            Some(OperationMode::DownloadImage)
        );
        assert!(ActionSpec::by_hotkey("meta+x").is_none());
    }

    #[test]
    fn copy_link_requires_session() {
        let button = ActionButton::new(ActionSpec::for_mode(OperationMode::CopyLink));
        assert!(button.is_disabled(false));
        assert!(!button.is_disabled(true));

        let image = ActionButton::new(ActionSpec::for_mode(OperationMode::CopyImage));
        assert!(!image.is_disabled(false));
    }

    #[tokio::test(start_paused = true)]
    async fn success_then_reverts_after_delay() {
        let button = ActionButton::new(ActionSpec::for_mode(OperationMode::CopyImage));
        let mut rx = button.subscribe();

        let result = button.click(true, || async { Ok(()) }).await;
        assert!(matches!(result, Some(Ok(()))));
        assert_eq!(button.state(), ButtonState::Success);
        assert_eq!(button.label(), "Image copied");
        assert!(button.is_disabled(true));

        let _ = rx.borrow_and_update();
        rx.changed().await.expect("button alive");
        assert_eq!(*rx.borrow(), ButtonState::Default);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_state_and_reentrancy_guard() {
        let button = ActionButton::new(ActionSpec::for_mode(OperationMode::DownloadImage));

        let result = button
            .click(true, || async { Err::<(), _>(SnapError::ClipboardUnsupported) })
            .await;
        assert!(matches!(result, Some(Err(SnapError::ClipboardUnsupported))));
        assert_eq!(button.state(), ButtonState::Failure);

        let blocked = button.click(true, || async { Ok(()) }).await;
        assert!(blocked.is_none());

        tokio::time::sleep(DEFAULT_RESET_DELAY + Duration::from_millis(1)).await;
        assert_eq!(button.state(), ButtonState::Default);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_clicks_run_the_action_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let button = Arc::new(ActionButton::new(ActionSpec::for_mode(
            OperationMode::DownloadImage,
        )));
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let button = Arc::clone(&button);
                let runs = Arc::clone(&runs);
                tokio::spawn(async move {
                    button
                        .click(true, || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(())
                        })
                        .await
                        .is_some()
                })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.expect("click task") {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(button.state(), ButtonState::Success);
    }

    #[tokio::test]
    async fn loading_is_visible_while_action_runs() {
        let button = ActionButton::new(ActionSpec::for_mode(OperationMode::CopyImage));
        let rx = button.subscribe();

        let _ = button
            .click(true, || async {
                assert_eq!(*rx.borrow(), ButtonState::Loading);
                Ok(())
            })
            .await;
    }
}
