use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per problem. Every load, transition and save for a
/// problem's record and reviews runs while holding its guard.
#[derive(Debug, Clone, Default)]
pub struct RecordLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, problem_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock();
            Arc::clone(map.entry(problem_id).or_default())
        };
        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_problem_is_serialized() {
        let locks = RecordLocks::new();
        let guard = locks.acquire(7).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire(7).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn different_problems_do_not_block() {
        let locks = RecordLocks::new();
        let _first = locks.acquire(1).await;
        let _second = locks.acquire(2).await;
        assert_eq!(locks.tracked(), 2);
    }
}
