use std::time::Duration;

use tokio::sync::watch;

/// Creates a linked cancel handle and signal
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

/// Sending side of a [`Cancellation`]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Cancels once `deadline` has elapsed
    ///
    /// The timer task exits early when every [`Cancellation`] has been dropped.
    pub fn cancel_after(self, deadline: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    tracing::warn!(
                        deadline_ms = deadline.as_millis() as u64,
                        "Catalog deadline reached, cancelling"
                    );
                    self.cancel();
                }
                _ = self.tx.closed() => {}
            }
        })
    }
}

/// Cooperative cancellation signal shared by pipeline workers
///
/// Dropping the [`CancelHandle`] without cancelling never triggers it.
#[derive(Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // handle gone without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}
