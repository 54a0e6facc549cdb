//! Timer-driven refresh loops and stale-response protection.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Owner of one running poll loop. Dropping it stops the loop.
pub struct PollHandle {
    name: &'static str,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct Poller;

impl Poller {
    /// Run `tick` every `every`, first run one period from now.
    pub fn spawn<F, Fut>(name: &'static str, every: Duration, tick: F) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_while(name, every, || true, tick)
    }

    /// Like `spawn`, but ticks are skipped while `active()` is false.
    pub fn spawn_while<C, F, Fut>(name: &'static str, every: Duration, active: C, mut tick: F) -> PollHandle
    where
        C: Fn() -> bool + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!("⏱️ poller '{}' started ({:?})", name, every);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if !active() {
                    continue;
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick() => {}
                }
            }
            tracing::debug!("⏱️ poller '{}' stopped", name);
        });
        PollHandle {
            name,
            cancel,
            task: Some(task),
        }
    }
}

/// Proof that a fetch was started at a given point in sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// Orders overlapping fetches of the same resource.
///
/// Take a ticket before the request; after it returns, apply the response
/// only if `try_apply` accepts the ticket. Call `try_apply` while holding
/// the lock that guards the data being replaced.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> FetchTicket {
        FetchTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// False when a newer response has already been applied.
    pub fn try_apply(&self, ticket: FetchTicket) -> bool {
        let previous = self.applied.fetch_max(ticket.0, Ordering::SeqCst);
        if previous >= ticket.0 {
            tracing::debug!(
                "discarding stale response #{} (already applied #{})",
                ticket.0,
                previous
            );
            return false;
        }
        true
    }

    pub fn last_applied(&self) -> u64 {
        self.applied.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn older_ticket_loses_to_newer_one() {
        let seq = FetchSequencer::new();
        let slow = seq.ticket();
        let fast = seq.ticket();
        assert!(seq.try_apply(fast));
        assert!(!seq.try_apply(slow));
        assert_eq!(seq.last_applied(), fast.seq());
    }

    #[test]
    fn in_order_responses_all_apply() {
        let seq = FetchSequencer::new();
        let a = seq.ticket();
        assert!(seq.try_apply(a));
        let b = seq.ticket();
        assert!(seq.try_apply(b));
        assert!(!seq.try_apply(b));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_period_until_stopped() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let handle = Poller::spawn("test", Duration::from_secs(5), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_loop() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let handle = Poller::spawn("drop", Duration::from_secs(1), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_condition_skips_ticks() {
        let count = Arc::new(AtomicU64::new(0));
        let active = Arc::new(AtomicBool::new(false));
        let (c, a) = (count.clone(), active.clone());
        let handle = Poller::spawn_while(
            "jobs",
            Duration::from_secs(10),
            move || a.load(Ordering::SeqCst),
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        active.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_tick_is_abandoned_on_stop() {
        let finished = Arc::new(AtomicBool::new(false));
        let f = finished.clone();
        let handle = Poller::spawn("slow", Duration::from_secs(1), move || {
            let f = f.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                f.store(true, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
