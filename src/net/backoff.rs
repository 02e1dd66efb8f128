//! 退避计时原语
//!
//! 请求层的线性退避与通用的指数退避共用这里的 `RetryState`，
//! 但仍以两个具名策略（`BackoffPolicy::Linear` / `BackoffPolicy::Exponential`）区分。

use std::time::Duration;

/// 退避策略。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffPolicy {
    /// 第 k 次重试等待 `step_ms * k`。
    Linear { step_ms: u64 },
    /// 第 k 次重试等待 `initial_ms * factor^(k-1)`。
    Exponential { initial_ms: u64, factor: f64 },
}

impl BackoffPolicy {
    /// 第 `retry_index` 次重试（从 0 开始）之前的等待时长。
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        match *self {
            Self::Linear { step_ms } => {
                Duration::from_millis(step_ms.saturating_mul(u64::from(retry_index) + 1))
            }
            Self::Exponential { initial_ms, factor } => {
                let factor = if factor.is_finite() && factor > 0.0 { factor } else { 1.0 };
                let ms = initial_ms as f64 * factor.powi(retry_index as i32);
                Duration::from_micros((ms.max(0.0) * 1000.0).round() as u64)
            }
        }
    }
}

/// 单次逻辑请求的重试进度，操作结束即丢弃。
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    policy: BackoffPolicy,
}

impl RetryState {
    pub fn new(max_retries: u32, policy: BackoffPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_retries,
            policy,
        }
    }

    /// 请求层使用的线性退避。
    pub fn linear(max_retries: u32, step_ms: u64) -> Self {
        Self::new(max_retries, BackoffPolicy::Linear { step_ms })
    }

    /// 通用操作使用的指数退避。
    pub fn exponential(max_retries: u32, initial_ms: u64, factor: f64) -> Self {
        Self::new(max_retries, BackoffPolicy::Exponential { initial_ms, factor })
    }

    /// 已执行的重试次数。
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// 下一次重试前的等待时长（不推进状态）。
    pub fn next_delay(&self) -> Duration {
        self.policy.delay_for(self.attempt)
    }

    /// 消耗一次重试机会并返回需要等待的时长；机会用尽时返回 `None`。
    pub fn advance(&mut self) -> Option<Duration> {
        if !self.can_retry() {
            return None;
        }
        let delay = self.next_delay();
        self.attempt += 1;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_delays_grow_by_step() {
        let mut state = RetryState::linear(2, 1000);
        assert_eq!(state.advance(), Some(Duration::from_millis(1000)));
        assert_eq!(state.advance(), Some(Duration::from_millis(2000)));
        assert_eq!(state.advance(), None);
        assert_eq!(state.attempt(), 2);
    }

    #[test]
    fn exponential_delays_multiply_by_factor() {
        let mut state = RetryState::exponential(3, 1000, 1.5);
        let delays: Vec<u128> = std::iter::from_fn(|| state.advance())
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 1500, 2250]);
    }

    #[test]
    fn zero_retries_never_waits() {
        let mut state = RetryState::linear(0, 1000);
        assert!(!state.can_retry());
        assert_eq!(state.advance(), None);
    }

    #[test]
    fn invalid_factor_degrades_to_constant_delay() {
        let policy = BackoffPolicy::Exponential {
            initial_ms: 200,
            factor: f64::NAN,
        };
        assert_eq!(policy.delay_for(4), Duration::from_millis(200));
    }
}
