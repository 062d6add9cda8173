//! Retry loop applied around collaborator calls.
//!
//! Backoff follows [`RetryPolicy::delay_for`]: with a 500 ms base the waits
//! are 500 ms → 1 s → 2 s. The default policy has `max_retries = 0`, so the
//! closure runs exactly once.

use crate::config::RetryPolicy;
use std::fmt::Display;
use std::future::Future;
use tokio::time::sleep;
use tracing::warn;

/// Run `call` until it succeeds or the policy's retries are exhausted.
///
/// Returns the last error when every attempt fails.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut call: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                warn!(
                    "{}: attempt {} failed — {}; retry {}/{} in {:?}",
                    label, attempt, e, attempt, policy.max_retries, delay
                );
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
