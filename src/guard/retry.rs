use std::fmt::Display;
use std::future::Future;

use crate::net::backoff::RetryState;

/// 指数退避重试：等待 `initial, initial*factor, ...`，`retries` 次重试后仍失败则返回最后一次错误。
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut op: F,
    retries: u32,
    initial_delay_ms: u64,
    backoff_factor: f64,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retry = RetryState::exponential(retries, initial_delay_ms, backoff_factor);

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => match retry.advance() {
                Some(delay) => {
                    log::warn!(
                        "🔄 操作失败，{}ms 后重试（{}/{}）：{}",
                        delay.as_millis(),
                        retry.attempt(),
                        retry.max_attempts(),
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_exponential_delays() {
        let start = Instant::now();
        let mut stamps = Vec::new();
        let mut calls = 0;

        let result = retry_with_backoff(
            || {
                calls += 1;
                stamps.push(start.elapsed());
                let attempt = calls;
                async move {
                    if attempt <= 3 {
                        Err(format!("fail #{}", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            3,
            1000,
            1.5,
        )
        .await;

        assert_eq!(result, Ok(4));
        let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(2250),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_after_exhaustion() {
        let mut calls = 0;
        let result: Result<(), String> = retry_with_backoff(
            || {
                calls += 1;
                let attempt = calls;
                async move { Err(format!("fail #{}", attempt)) }
            },
            2,
            10,
            2.0,
        )
        .await;

        assert_eq!(result, Err("fail #3".to_string()));
        assert_eq!(calls, 3);
    }
}
