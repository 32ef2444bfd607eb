use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use {
    tokio::sync::oneshot::{self, error::TryRecvError},
    tokio_util::sync::CancellationToken,
};

use crate::dispatch::Dispatcher;

/// Shared runtime state for one bot.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub bot_username: Option<String>,
    pub dispatcher: Dispatcher,
    pub queue: UserQueue,
    pub cancel: CancellationToken,
}

/// Per-user arrival order. A user's messages run one at a time in the order
/// their turns were taken, while different users proceed in parallel.
///
/// Each map entry is the completion signal of the user's latest turn; the
/// next turn waits on it.
#[derive(Default)]
pub struct UserQueue {
    inner: Mutex<HashMap<u64, oneshot::Receiver<()>>>,
}

/// A reserved place in one user's queue. Dropping it lets the next turn run.
pub struct Turn {
    previous: Option<oneshot::Receiver<()>>,
    _done: oneshot::Sender<()>,
}

impl UserQueue {
    /// Take the next turn for `user`.
    ///
    /// Synchronous, so calling it while reading updates in order fixes the
    /// order in which they are handled.
    pub fn enter(&self, user: u64) -> Turn {
        let (done, next) = oneshot::channel();
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Forget users whose latest turn has finished.
        map.retain(|_, rx| matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        let previous = map.insert(user, next);
        Turn {
            previous,
            _done: done,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Turn {
    /// Wait until every earlier turn of the same user has finished.
    pub async fn ready(&mut self) {
        if let Some(previous) = self.previous.take() {
            // The sender is only ever dropped, never used.
            let _ = previous.await;
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[tokio::test]
    async fn same_user_is_serialized() {
        let queue = UserQueue::default();
        let mut first = queue.enter(1);
        first.ready().await;

        let mut second = queue.enter(1);
        let waiter = tokio::spawn(async move { second.ready().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn turns_run_in_entry_order_regardless_of_spawn_order() {
        let queue = UserQueue::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        let turns: Vec<Turn> = (0..5).map(|_| queue.enter(1)).collect();
        let mut handles = Vec::new();
        // Spawn the latest turn first.
        for (i, mut turn) in turns.into_iter().enumerate().rev() {
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                turn.ready().await;
                order.lock().unwrap().push(i);
                tokio::task::yield_now().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let queue = UserQueue::default();
        let mut a = queue.enter(1);
        a.ready().await;
        let mut b = queue.enter(2);
        tokio::time::timeout(Duration::from_secs(1), b.ready())
            .await
            .expect("user 2 must not wait on user 1");
    }

    #[test]
    fn finished_users_are_pruned() {
        let queue = UserQueue::default();
        drop(queue.enter(1));
        drop(queue.enter(2));
        let _held = queue.enter(3);
        assert_eq!(queue.len(), 1);
    }
}
