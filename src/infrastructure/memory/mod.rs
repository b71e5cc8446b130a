//! Memory Layer - In-Memory State Management
//!
//! 实现 JobQueue 和章节锁，管理生成任务的进程内状态

mod chapter_locks;
mod job_queue;

pub use chapter_locks::ChapterLocks;
pub use job_queue::InMemoryJobQueue;
