//! Response slots: in-process handoff points between the frame reader task
//! and the command loop.
//!
//! All slots are single-producer (the reader) and single-consumer (the
//! command loop). The stop and result slots are capacity-1 blocking channels;
//! the completion slot is a latest-wins cell that the reader never blocks on.

use std::sync::Mutex;

use tokio::sync::Notify;

/// Latest-wins handoff cell for completion results.
///
/// Completion requests are speculative and racy against user typing; only
/// the most recent result matters. Storing over an unconsumed value replaces
/// it, so after two arrivals the next receive observes the second.
#[derive(Debug, Default)]
pub struct CompletionSlot {
    value: Mutex<Option<String>>,
    notify: Notify,
}

impl CompletionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any unconsumed one. Never blocks.
    pub fn store(&self, value: String) {
        let mut slot = self.value.lock().expect("completion slot poisoned");
        if slot.is_some() {
            tracing::debug!("replacing unconsumed completion result");
        }
        *slot = Some(value);
        drop(slot);
        self.notify.notify_one();
    }

    /// Take the stored value without waiting.
    pub fn try_take(&self) -> Option<String> {
        self.value.lock().expect("completion slot poisoned").take()
    }

    /// Wait until a value is available and take it.
    ///
    /// Callers bound this with a timeout; the slot itself never times out.
    pub async fn recv(&self) -> String {
        loop {
            let notified = self.notify.notified();
            if let Some(value) = self.try_take() {
                return value;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn store_then_recv() {
        let slot = CompletionSlot::new();
        slot.store("[]".to_string());
        assert_eq!(slot.recv().await, "[]");
    }

    #[tokio::test]
    async fn second_store_replaces_unconsumed_first() {
        let slot = CompletionSlot::new();
        slot.store("stale".to_string());
        slot.store("fresh".to_string());
        assert_eq!(slot.recv().await, "fresh");
        assert!(slot.try_take().is_none());
    }

    #[tokio::test]
    async fn recv_wakes_on_store() {
        let slot = std::sync::Arc::new(CompletionSlot::new());
        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        slot.store("late".to_string());
        assert_eq!(waiter.await.unwrap(), "late");
    }

    #[tokio::test]
    async fn bounded_wait_times_out_when_empty() {
        let slot = CompletionSlot::new();
        let result = tokio::time::timeout(Duration::from_millis(20), slot.recv()).await;
        assert!(result.is_err());
    }
}
