//! Trailing-edge debouncing of refresh triggers.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Collapses bursts of values from a channel into one.
///
/// A value is released once no newer value has arrived for the quiet period;
/// the latest value of the burst wins.
///
/// The pending value and its deadline live in the debouncer, so a
/// [`Debouncer::next`] future dropped mid-wait (a lost `select!` race) loses
/// nothing; the next call picks up where it left off.
#[derive(Debug)]
pub struct Debouncer<T> {
    rx: mpsc::Receiver<T>,
    quiet: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
    collapsed: usize,
    closed: bool,
}

impl<T> Debouncer<T> {
    /// Debounce everything received on `rx`.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<T>, quiet: Duration) -> Self {
        Self {
            rx,
            quiet,
            pending: None,
            deadline: None,
            collapsed: 0,
            closed: false,
        }
    }

    /// Wait for the next settled value.
    ///
    /// Returns `None` once the channel is closed and drained. A burst cut
    /// short by the channel closing is still released. Cancel safe.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let Some(deadline) = self.deadline else {
                if self.closed {
                    return None;
                }
                match self.rx.recv().await {
                    Some(value) => self.hold(value),
                    None => {
                        self.closed = true;
                        return None;
                    }
                }
                continue;
            };

            if self.closed {
                return self.release();
            }

            tokio::select! {
                () = sleep_until(deadline) => return self.release(),
                next = self.rx.recv() => match next {
                    Some(value) => {
                        self.collapsed += 1;
                        self.hold(value);
                    }
                    None => {
                        self.closed = true;
                        return self.release();
                    }
                },
            }
        }
    }

    fn hold(&mut self, value: T) {
        self.pending = Some(value);
        self.deadline = Some(Instant::now() + self.quiet);
    }

    fn release(&mut self) -> Option<T> {
        if self.collapsed > 0 {
            trace!(collapsed = self.collapsed, "Collapsed triggers");
            self.collapsed = 0;
        }
        self.deadline = None;
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last() {
        let (tx, rx) = mpsc::channel(8);
        let mut debouncer = Debouncer::new(rx, Duration::from_millis(300));

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        tx.send(3).await.unwrap();

        assert_eq!(debouncer.next().await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_triggers_each_fire() {
        let (tx, rx) = mpsc::channel(8);
        let mut debouncer = Debouncer::new(rx, Duration::from_millis(300));

        let sender = tokio::spawn(async move {
            tx.send("a").await.unwrap();
            sleep(Duration::from_millis(500)).await;
            tx.send("b").await.unwrap();
        });

        assert_eq!(debouncer.next().await, Some("a"));
        assert_eq!(debouncer.next().await, Some("b"));
        sender.await.unwrap();
        assert_eq!(debouncer.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_inside_quiet_period_resets_timer() {
        let (tx, rx) = mpsc::channel(8);
        let mut debouncer = Debouncer::new(rx, Duration::from_millis(300));

        let sender = tokio::spawn(async move {
            tx.send(1).await.unwrap();
            sleep(Duration::from_millis(200)).await;
            tx.send(2).await.unwrap();
            sleep(Duration::from_millis(200)).await;
            tx.send(3).await.unwrap();
            // Keep the channel open past the quiet period.
            sleep(Duration::from_secs(5)).await;
        });

        let start = tokio::time::Instant::now();
        assert_eq!(debouncer.next().await, Some(3));
        assert!(start.elapsed() >= Duration::from_millis(700));
        sender.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_keeps_pending_value() {
        let (tx, rx) = mpsc::channel(8);
        let mut debouncer = Debouncer::new(rx, Duration::from_millis(300));

        tx.send(1).await.unwrap();
        let cut_short =
            tokio::time::timeout(Duration::from_millis(100), debouncer.next()).await;
        assert!(cut_short.is_err());

        let start = tokio::time::Instant::now();
        assert_eq!(debouncer.next().await, Some(1));
        // Only the rest of the original quiet period is waited out.
        assert!(start.elapsed() <= Duration::from_millis(200));
        drop(tx);
    }

    #[tokio::test]
    async fn test_closed_channel_flushes_pending() {
        let (tx, rx) = mpsc::channel(8);
        let mut debouncer = Debouncer::new(rx, Duration::from_secs(60));

        tx.send(9).await.unwrap();
        drop(tx);

        assert_eq!(debouncer.next().await, Some(9));
        assert_eq!(debouncer.next().await, None);
    }
}
