//! 异步防抖
//!
//! 窗口期内的一串调用只触发一次底层调用（使用最后一次的参数），结果只交给
//! 最后一次调用者；被覆盖的调用者拿到 `DebounceError::Superseded`，
//! 永远不会收到过期调用的结果。
//!
//! 每次调用递增代数计数器；延时结束、底层调用返回时各检查一次代数，
//! 不一致即放弃。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::SnapError;

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, thiserror::Error)]
pub enum DebounceError {
    /// 被窗口期内更晚的调用覆盖
    #[error("调用已被更新的调用覆盖")]
    Superseded,

    /// 底层调用失败
    #[error(transparent)]
    Failed(#[from] SnapError),
}

/// 单次防抖调用的结果句柄。
pub struct DebounceHandle<T> {
    rx: oneshot::Receiver<Result<T, SnapError>>,
}

impl<T> Future for DebounceHandle<T> {
    type Output = Result<T, DebounceError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(DebounceError::Failed(error)),
            Err(_) => Err(DebounceError::Superseded),
        })
    }
}

/// 合并突发调用的防抖器。
pub struct Debouncer<F> {
    func: Arc<F>,
    generation: Arc<AtomicU64>,
    window: Duration,
}

impl<F> Debouncer<F> {
    pub fn new(func: F, window: Duration) -> Self {
        Self {
            func: Arc::new(func),
            generation: Arc::new(AtomicU64::new(0)),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 发起一次调用。需要在 tokio 运行时内调用。
    pub fn call<A, T, Fut>(&self, args: A) -> DebounceHandle<T>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SnapError>> + Send + 'static,
        A: Send + 'static,
        T: Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let func = Arc::clone(&self.func);
        let window = self.window;
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if latest.load(Ordering::SeqCst) != generation {
                log::debug!("⏭️ 防抖：第 {} 次调用被覆盖", generation);
                return;
            }

            let result = func(args).await;
            if latest.load(Ordering::SeqCst) == generation {
                let _ = tx.send(result);
            } else {
                log::debug!("⏭️ 防抖：第 {} 次调用结果已过期", generation);
            }
        });

        DebounceHandle { rx }
    }
}
