//! Daer - AI 辅助连载小说创作后端
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Novel Context: 小说状态、大纲模式、章节编排校验
//! - Task Context: 生成任务状态机
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Repositories, TaskStore, JobQueue, LlmProvider）
//! - Agents: 各生成阶段的提示词与调用
//! - Commands / Queries: CQRS 处理器
//! - Services: 上下文加载、Provider 解析、流式请求
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + SSE + WebSocket
//! - Memory: JobQueue、章节锁
//! - Worker: GenerationWorker 后台任务处理
//! - Persistence: SQLite 存储
//! - Adapters: LLM 后端适配器
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
