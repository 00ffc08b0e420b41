//! Debounced view over a `watch` channel.

use std::time::Duration;

use tokio::sync::watch;

/// Emits a watched value only after it has stopped changing for `interval`
///
/// The first call to [`Debounced::next`] yields the current value at once so
/// a consumer can act on its initial state. Each later change restarts the
/// timer; nothing is queued.
pub struct Debounced<T> {
    rx: watch::Receiver<T>,
    interval: Duration,
    primed: bool,
}

impl<T: Clone> Debounced<T> {
    pub fn new(rx: watch::Receiver<T>, interval: Duration) -> Self {
        Self {
            rx,
            interval,
            primed: false,
        }
    }

    /// Waits for the next stabilized value
    ///
    /// Returns `None` once the sender is gone and no change is pending.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }

        self.rx.changed().await.ok()?;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    return Some(self.rx.borrow_and_update().clone());
                }
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        // Sender dropped mid-wait; the last value is still stable
                        return Some(self.rx.borrow_and_update().clone());
                    }
                }
            }
        }
    }
}
