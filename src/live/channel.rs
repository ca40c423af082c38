//! Per-registration result channel.
//!
//! Holds the latest snapshot of a live query and broadcasts transitions to
//! subscribers. Built on `tokio::sync::watch`: new subscribers observe the
//! current state immediately, then every later transition in commit order.
//! Overlapping refreshes race freely; whichever publishes last wins.

use crate::core::{Row, StoreError};
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot state of one live query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    /// No refresh has completed yet.
    Pending,
    /// The last successful execution's rows.
    Ready(Arc<Vec<Row>>),
    /// Terminal: a refresh failed. Later refresh results are discarded;
    /// reopening the query is the way to retry.
    Failed(StoreError),
}

impl QueryState {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::Ready(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Publishing side, owned by the registration.
pub struct ResultChannel {
    tx: watch::Sender<QueryState>,
}

impl ResultChannel {
    pub(crate) fn new() -> (Self, QuerySubscription) {
        let (tx, rx) = watch::channel(QueryState::Pending);
        (Self { tx }, QuerySubscription { rx })
    }

    /// Publish a successful snapshot. Ignored once the channel has failed.
    pub fn publish(&self, rows: Vec<Row>) {
        self.tx.send_if_modified(|state| {
            if matches!(state, QueryState::Failed(_)) {
                return false;
            }
            *state = QueryState::Ready(Arc::new(rows));
            true
        });
    }

    /// Transition to the terminal failed state. The first error sticks.
    pub fn publish_error(&self, error: StoreError) {
        self.tx.send_if_modified(|state| {
            if matches!(state, QueryState::Failed(_)) {
                return false;
            }
            *state = QueryState::Failed(error);
            true
        });
    }

    pub fn subscribe(&self) -> QuerySubscription {
        QuerySubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn current(&self) -> QueryState {
        self.tx.borrow().clone()
    }
}

/// Subscribing side. Cheap to clone via `ResultChannel::subscribe`.
pub struct QuerySubscription {
    rx: watch::Receiver<QueryState>,
}

impl QuerySubscription {
    /// The state as of now, without waiting.
    pub fn current(&self) -> QueryState {
        self.rx.borrow().clone()
    }

    /// Wait for the next transition. Returns `None` once the registration is
    /// gone and no further deliveries can happen.
    pub async fn changed(&mut self) -> Option<QueryState> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Wait until the first refresh lands (any non-pending state).
    pub async fn wait_ready(&mut self) -> Option<QueryState> {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if !state.is_pending() {
                return Some(state);
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[tokio::test]
    async fn test_new_channel_starts_pending() {
        let (channel, sub) = ResultChannel::new();
        assert!(sub.current().is_pending());
        assert!(channel.current().is_pending());
    }

    #[tokio::test]
    async fn test_subscribers_see_current_value_immediately() {
        let (channel, _first) = ResultChannel::new();
        channel.publish(vec![vec![Value::from("Groceries")]]);

        let late = channel.subscribe();
        assert_eq!(late.current().rows().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_last_publish_wins() {
        let (channel, sub) = ResultChannel::new();
        channel.publish(vec![vec![Value::from("a")]]);
        channel.publish(vec![vec![Value::from("a")], vec![Value::from("b")]]);
        assert_eq!(sub.current().rows().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_state_is_terminal() {
        let (channel, sub) = ResultChannel::new();
        channel.publish(vec![]);
        channel.publish_error(StoreError::TableNotFound("projects".into()));

        // Neither a later snapshot nor a later error replaces the first error.
        channel.publish(vec![vec![Value::from("late")]]);
        channel.publish_error(StoreError::ReadOnly);

        assert_eq!(
            sub.current().error(),
            Some(&StoreError::TableNotFound("projects".into()))
        );
    }

    #[tokio::test]
    async fn test_changed_returns_none_after_teardown() {
        let (channel, mut sub) = ResultChannel::new();
        drop(channel);
        assert!(sub.changed().await.is_none());
    }

    #[tokio::test]
    async fn test_wait_ready_skips_pending() {
        let (channel, mut sub) = ResultChannel::new();
        let waiter = tokio::spawn(async move { sub.wait_ready().await });
        channel.publish(vec![vec![Value::from("Groceries")]]);
        let state = waiter.await.unwrap().unwrap();
        assert_eq!(state.rows().unwrap().len(), 1);
    }
}
