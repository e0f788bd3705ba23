/**
 * Retrying operations that talk to the outside world, such as persisting results.
 */
use std::fmt;
use std::thread;
use std::time::Duration;


/// How long to wait after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// Wait `step` after the first failure, `2 * step` after the second, and so on.
    Linear(Duration),
}


impl Backoff {
    /// The delay after the `failures`-th failed attempt (counting from 1).
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            Backoff::None => Duration::from_millis(0),
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step * failures,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}


impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::Linear(Duration::from_millis(200)),
        }
    }
}


impl RetryPolicy {
    /// Run `op` until it succeeds or the attempts run out, returning the last error in
    /// the latter case. `what` names the operation in log messages.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut failures = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    failures += 1;
                    if failures >= attempts {
                        tracing::warn!(operation = what, attempts, error = %e, "giving up");
                        return Err(e);
                    }
                    let delay = self.backoff.delay(failures);
                    tracing::debug!(operation = what, failures, error = %e, ?delay, "retrying");
                    thread::sleep(delay);
                }
            }
        }
    }
}
