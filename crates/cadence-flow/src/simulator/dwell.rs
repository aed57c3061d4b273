use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// How a dwell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellOutcome {
    /// The full duration elapsed.
    Elapsed,
    /// A skip request cut the dwell short.
    Skipped,
    /// The run was cancelled.
    Cancelled,
}

/// One-shot "skip the current step" signal.
///
/// A trigger only lands while a dwell is armed and wakes exactly that
/// dwell; triggers outside a dwell are dropped, never carried over.
#[derive(Debug, Default)]
pub struct SkipSignal {
    notify: Notify,
    armed: AtomicBool,
}

impl SkipSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest before the step becomes observable, so a skip
    /// sent right after the status change is not lost.
    pub fn arm(&self) -> ArmedSkip<'_> {
        let mut notified = Box::pin(self.notify.notified());
        notified.as_mut().enable();
        self.armed.store(true, Ordering::SeqCst);
        ArmedSkip {
            signal: self,
            notified,
        }
    }

    /// Wake the armed dwell, if any. Returns whether one was armed.
    pub fn trigger(&self) -> bool {
        if self.armed.load(Ordering::SeqCst) {
            self.notify.notify_waiters();
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// A registered skip listener. Disarms the signal when dropped.
pub struct ArmedSkip<'a> {
    signal: &'a SkipSignal,
    notified: Pin<Box<Notified<'a>>>,
}

impl Drop for ArmedSkip<'_> {
    fn drop(&mut self) {
        self.signal.armed.store(false, Ordering::SeqCst);
    }
}

/// Wait for `duration`, ending early on cancellation or skip.
///
/// Cancellation wins over a simultaneous skip.
pub async fn dwell(
    duration: Duration,
    cancel: &CancellationToken,
    mut skip: ArmedSkip<'_>,
) -> DwellOutcome {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => DwellOutcome::Cancelled,
        _ = skip.notified.as_mut() => DwellOutcome::Skipped,
        _ = tokio::time::sleep(duration) => DwellOutcome::Elapsed,
    }
}

/// Sleep for `duration` unless cancelled first. Returns `false` if cancelled.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
