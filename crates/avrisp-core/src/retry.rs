//! Bounded retry with a fixed pause between attempts
//!
//! Both the sysfs GPIO open loop and the program-enable handshake are
//! "try N times, wait a bit in between" loops. [`Retry`] expresses that
//! once so the budget is a value that can be passed around and tested.

use std::thread;
use std::time::Duration;

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The attempt succeeded, stop retrying
    Done(T),
    /// The attempt failed but may succeed later
    Retry(E),
    /// The attempt failed in a way that retrying cannot fix
    Abort(E),
}

/// Why a retried operation gave up
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt asked for a retry; carries the last error
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error of the final attempt
        last: E,
    },
    /// An attempt aborted the loop
    Aborted(E),
}

impl<E> RetryError<E> {
    /// Unwrap the underlying error, whichever way the loop ended
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Aborted(e) => e,
        }
    }
}

/// Attempt budget and backoff interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    attempts: u32,
    interval: Duration,
}

impl Retry {
    /// Create a policy making at most `attempts` attempts, sleeping
    /// `interval` between consecutive attempts
    ///
    /// A zero budget is treated as one attempt.
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            interval,
        }
    }

    /// Maximum number of attempts
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `op` until it is done, aborts, or the budget runs out
    ///
    /// `op` receives the zero-based attempt number. No pause is taken after
    /// the final attempt.
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Attempt<T, E>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Attempt::Done(value) => return Ok(value),
                Attempt::Abort(e) => return Err(RetryError::Aborted(e)),
                Attempt::Retry(e) => {
                    attempt += 1;
                    if attempt >= self.attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                    if !self.interval.is_zero() {
                        thread::sleep(self.interval);
                    }
                }
            }
        }
    }
}
