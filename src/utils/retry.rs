use std::future::Future;

use anyhow::Result;
use tokio::time::{Duration, sleep};

/// Runs `op` up to `attempts` times with a fixed `delay` between failures.
/// Returns the last error once every attempt has failed.
pub async fn retry_with_delay<T, F, Fut>(
    label: &str,
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                log::warn!(
                    "{} failed (attempt {}/{}): {:#}. Retrying in {:?}",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay
                );
                attempt += 1;
                sleep(delay).await;
            }
            Err(e) => return Err(e.context(format!("{} failed after {} attempts", label, attempts))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = retry_with_delay("flaky", 3, Duration::from_millis(1), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("not yet"))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_with_delay("down", 2, Duration::from_millis(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("still down"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
