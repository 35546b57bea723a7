use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// How long typing has to pause before a search goes out.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runs only the last of a burst of calls, once the burst has been quiet for the delay.
///
/// A new call cancels work that's still waiting out its delay. Work that already started is left
/// alone; callers tell stale results apart with a [`crate::Ticket`].
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Must be called from inside a tokio runtime.
    pub fn schedule<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detach, so the next cancel can't abort a request in flight
            tokio::spawn(work);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn only_the_last_keystroke_searches() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE);
        for text in ["l", "la", "lak"] {
            let tx = tx.clone();
            let text = text.to_string();
            debouncer.schedule(async move {
                let _ = tx.send(text);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        assert_eq!(rx.recv().await.as_deref(), Some("lak"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn started_work_isnt_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(SEARCH_DEBOUNCE);

        let slow = tx.clone();
        debouncer.schedule(async move {
            // A request that takes a while to answer
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = slow.send("slow");
        });
        tokio::time::sleep(Duration::from_millis(400)).await;

        let fast = tx.clone();
        debouncer.schedule(async move {
            let _ = fast.send("fast");
        });

        assert_eq!(rx.recv().await, Some("fast"));
        assert_eq!(rx.recv().await, Some("slow"));
    }
}
