//! One-shot slide timer.
//!
//! Each arming carries a [`TimerToken`]. The firing hands that token back to
//! the target, which compares it against the token it last armed with and
//! ignores anything stale, so a late firing from a cancelled or re-armed
//! timer can never advance the wrong slide.

use crate::logging::{log, LogCategory, LogLevel};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Identifies one arming of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(self) -> u64 {
        self.0
    }

    /// The token for the next arming.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Receives timer firings.
pub trait TimerTarget: Send + Sync {
    fn on_timer(&self, token: TimerToken);
}

/// A restartable one-shot timer.
pub trait SlideTimer: Send + Sync {
    /// Fire once after `after`, replacing any pending arming.
    fn arm(&self, after: Duration, token: TimerToken);

    fn cancel(&self);
}

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<(Instant, TimerToken)>,
    quit: bool,
}

#[derive(Debug, Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    changed: Condvar,
}

impl TimerShared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Timer serviced by its own thread.
///
/// The thread holds only a weak reference to its target and exits once
/// the target is gone or the timer is dropped.
pub struct ThreadTimer {
    shared: Arc<TimerShared>,
}

impl ThreadTimer {
    pub fn spawn(target: Weak<dyn TimerTarget>) -> std::io::Result<Self> {
        let shared = Arc::new(TimerShared::default());
        let thread_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("dmd-slide-timer".to_string())
            .spawn(move || service(&thread_shared, target))?;
        Ok(Self { shared })
    }
}

impl SlideTimer for ThreadTimer {
    fn arm(&self, after: Duration, token: TimerToken) {
        let mut state = self.shared.lock();
        state.deadline = Some((Instant::now() + after, token));
        self.shared.changed.notify_one();
    }

    fn cancel(&self) {
        let mut state = self.shared.lock();
        state.deadline = None;
        self.shared.changed.notify_one();
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        // Not joined: the last owner may be dropped on the timer thread
        let mut state = self.shared.lock();
        state.quit = true;
        self.shared.changed.notify_one();
    }
}

fn service(shared: &TimerShared, target: Weak<dyn TimerTarget>) {
    let mut state = shared.lock();
    loop {
        if state.quit {
            break;
        }
        let Some((deadline, token)) = state.deadline else {
            state = shared
                .changed
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            continue;
        };

        let now = Instant::now();
        if now < deadline {
            state = shared
                .changed
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            continue;
        }

        state.deadline = None;
        drop(state);
        match target.upgrade() {
            Some(target) => target.on_timer(token),
            None => break,
        }
        state = shared.lock();
    }
    log(LogCategory::SlideShow, LogLevel::Debug, || {
        "slide timer thread exiting".to_string()
    });
}

/// Timer that only records its arming; the owner fires it by hand.
/// Used by hosts that run their own event loop, and by tests.
#[derive(Debug, Default)]
pub struct ManualTimer {
    armed: Mutex<Option<(Duration, TimerToken)>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending arming, if any.
    pub fn armed(&self) -> Option<(Duration, TimerToken)> {
        *self.armed.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Disarm and return the token to deliver.
    pub fn take(&self) -> Option<TimerToken> {
        self.armed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .map(|(_, token)| token)
    }
}

impl SlideTimer for ManualTimer {
    fn arm(&self, after: Duration, token: TimerToken) {
        *self.armed.lock().unwrap_or_else(|p| p.into_inner()) = Some((after, token));
    }

    fn cancel(&self) {
        *self.armed.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}
