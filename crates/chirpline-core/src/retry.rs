//! Fixed-delay retry for idempotent operations

use std::time::Duration;

use crate::shutdown::sleep_interruptible;

/// Retry `op` with a fixed delay until it succeeds.
///
/// Failures are logged and retried without cap: the operations fed through
/// here (rate-limit status queries) are idempotent and side-effect free, and
/// every failure is treated as transient. A shutdown request ends the loop
/// with the last error instead.
pub fn retry_indefinitely<T, E: std::fmt::Display>(
    label: &str,
    delay: Duration,
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                log::warn!("{label}: {e}, retrying in {}s", delay.as_secs());
                if !sleep_interruptible(delay) {
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_first_success() {
        let result: Result<i32, String> =
            retry_indefinitely("test", Duration::ZERO, || Ok::<_, String>(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn retries_until_success() {
        let mut attempts = 0;
        let result = retry_indefinitely("test", Duration::ZERO, || {
            attempts += 1;
            if attempts < 3 {
                Err("not yet".to_string())
            } else {
                Ok(attempts)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }
}
