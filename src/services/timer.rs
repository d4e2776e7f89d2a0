use std::future::Future;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

/// Owned handle to a spawned task. Cancelling (or dropping) aborts the task,
/// so a replaced handle can never fire late.
#[derive(Debug, Default)]
pub struct TaskHandle {
    handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Sends `make()` every `period`, first one full period from now.
pub fn spawn_every<E, F>(period: Duration, tx: UnboundedSender<E>, make: F) -> TaskHandle
where
    E: Send + 'static,
    F: Fn() -> E + Send + 'static,
{
    TaskHandle::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.send(make()).is_err() {
                break;
            }
        }
    })
}

/// Sends `event` once after `delay`.
pub fn spawn_after<E>(delay: Duration, tx: UnboundedSender<E>, event: E) -> TaskHandle
where
    E: Send + 'static,
{
    TaskHandle::spawn(async move {
        time::sleep(delay).await;
        let _ = tx.send(event);
    })
}

/// Trailing-edge debounce with a sequence token. Each `trigger` restarts the
/// quiet period and issues a new token; work tagged with an older token is stale.
#[derive(Debug)]
pub struct Debouncer {
    quiet_period: Duration,
    pending: TaskHandle,
    token: u64,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: TaskHandle::default(),
            token: 0,
        }
    }

    pub fn trigger<E, F>(&mut self, tx: &UnboundedSender<E>, make: F) -> u64
    where
        E: Send + 'static,
        F: FnOnce(u64) -> E,
    {
        self.pending.cancel();
        self.token += 1;
        let token = self.token;
        self.pending = spawn_after(self.quiet_period, tx.clone(), make(token));
        token
    }

    /// Drops the pending window and invalidates every outstanding token.
    pub fn cancel(&mut self) {
        self.pending.cancel();
        self.token += 1;
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.token
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.is_active()
    }
}
