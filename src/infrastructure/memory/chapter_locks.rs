//! Chapter Locks - 章节级咨询锁
//!
//! 同一章节的生成任务串行执行，不同章节互不影响

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct ChapterLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ChapterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取章节锁，持有期间同章节的其他任务等待
    pub async fn acquire(&self, chapter_id: Uuid) -> OwnedMutexGuard<()> {
        // 克隆出 Arc 后再 await，避免跨 await 持有 DashMap 分片锁
        let lock = self
            .locks
            .entry(chapter_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// 清理无人持有的锁
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_chapter_is_serialized() {
        let locks = Arc::new(ChapterLocks::new());
        let chapter = Uuid::new_v4();

        let guard = locks.acquire(chapter).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(chapter).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_chapters_do_not_block() {
        let locks = ChapterLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(Uuid::new_v4()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_prune_drops_idle_locks() {
        let locks = ChapterLocks::new();
        let held = locks.acquire(Uuid::new_v4()).await;
        drop(locks.acquire(Uuid::new_v4()).await);
        assert_eq!(locks.len(), 2);

        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
    }
}
