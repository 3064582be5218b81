use std::future::Future;

use tracing::warn;

/// run an operation up to `attempts` times, retrying on any error. Used
/// around the handshake requests where the upstream drops connections often
/// enough that one transient failure shouldn't kill the whole resolution
pub async fn with_retries<T, E, F, Fut>(attempts: usize, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    debug_assert!(attempts > 0);

    let mut last_err = None;
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < attempts {
                    warn!("retrying {} due to {} (attempt {}/{})", what, e, attempt, attempts);
                }
                last_err = Some(e);
            }
        }
    }

    // attempts is always >= 1 so last_err is set by the time we get here
    Err(last_err.expect("notrace - retry loop ran zero attempts"))
}
