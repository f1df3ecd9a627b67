use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Leading edge rate limiter. The first call in a window runs the action
/// right away, every other call until the window closes is dropped.
#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    /// End of the current cooldown window, if one is active.
    cooldown_until: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            cooldown_until: Mutex::new(None),
        }
    }

    /// Claims the current window. Returns false while a previous call's
    /// cooldown is still running.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut cooldown = self
            .cooldown_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *cooldown {
            Some(until) if now < until => false,
            _ => {
                *cooldown = Some(now + self.window);
                true
            }
        }
    }
}

/// An action wrapped by a [`Throttle`].
pub struct Throttled<F> {
    action: F,
    throttle: Throttle,
}

impl<F: Fn()> Throttled<F> {
    /// Runs the action unless the window is still cooling down. The call is
    /// dropped, never queued.
    pub fn call(&self) {
        if self.throttle.try_acquire() {
            (self.action)();
        }
    }
}

/// Wraps `action` so that bursts of calls run it at most once per `window`.
pub fn throttle<F: Fn()>(action: F, window: Duration) -> Throttled<F> {
    Throttled {
        action,
        throttle: Throttle::new(window),
    }
}
