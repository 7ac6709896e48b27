/// Cancellable quiet-period timer for text input.
///
/// Each `schedule` call aborts the pending timer, so at most one is live.
/// When a timer survives its full delay the value is sent on the channel
/// supplied by the caller, tagged with the generation it was scheduled in.
/// A timer can fire before the receiver gets to its value; `accept` drops
/// any value whose generation was superseded by a later `schedule` or
/// `cancel`.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Quiet period before an edited address is geocoded.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// A value whose quiet period ran out.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled<T> {
    generation: u64,
    value: T,
}

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Restarts the quiet period with a new value.
    pub fn schedule<T: Send + 'static>(&mut self, value: T, settled: UnboundedSender<Settled<T>>) {
        self.cancel();
        let delay = self.delay;
        let generation = self.generation;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = settled.send(Settled { generation, value });
        }));
    }

    /// Drops the pending value, if any, including one already sent but not
    /// yet accepted.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Unwraps a settled value if it belongs to the latest `schedule`.
    pub fn accept<T>(&self, settled: Settled<T>) -> Option<T> {
        (settled.generation == self.generation).then_some(settled.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_value_is_sent_after_quiet_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);
        debouncer.schedule("Paris".to_string(), tx);

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(rx.try_recv().is_err(), "nothing before the quiet period ends");

        tokio::time::sleep(Duration::from_millis(2)).await;
        let settled = rx.recv().await.expect("timer fired");
        assert_eq!(debouncer.accept(settled).as_deref(), Some("Paris"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_keystroke_cancels_pending_value() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);

        debouncer.schedule("Par".to_string(), tx.clone());
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.schedule("Paris".to_string(), tx.clone());
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let settled = rx.try_recv().expect("second timer fired");
        assert_eq!(debouncer.accept(settled).as_deref(), Some("Paris"));
        assert!(rx.try_recv().is_err(), "the cancelled value must never arrive");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_clears_pending() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Settled<String>>();
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);
        debouncer.schedule("Oslo".to_string(), tx);
        assert!(debouncer.is_pending());

        debouncer.cancel();
        assert!(!debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_sent_before_next_keystroke_is_rejected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);

        debouncer.schedule("Mumbai".to_string(), tx.clone());
        tokio::time::sleep(Duration::from_millis(1001)).await;
        debouncer.schedule("Bengaluru".to_string(), tx.clone());
        tokio::time::sleep(Duration::from_millis(1001)).await;

        let stale = rx.try_recv().expect("first timer already fired");
        let fresh = rx.try_recv().expect("second timer fired");
        assert_eq!(debouncer.accept(stale), None, "superseded edit must be dropped");
        assert_eq!(debouncer.accept(fresh).as_deref(), Some("Bengaluru"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_rejects_already_sent_value() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);

        debouncer.schedule("Oslo".to_string(), tx);
        tokio::time::sleep(Duration::from_millis(1001)).await;
        debouncer.cancel();

        let settled = rx.try_recv().expect("timer fired before cancel");
        assert_eq!(debouncer.accept(settled), None);
    }
}
