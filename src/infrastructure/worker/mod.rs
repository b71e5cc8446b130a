//! Worker Layer - Background Task Processing
//!
//! GenerationWorker 消费生成任务，GenerationPipeline 执行单个任务

mod generation_worker;
mod pipeline;

pub use generation_worker::{
    recover_tasks, GenerationWorker, GenerationWorkerConfig, RecoveryReport,
    INTERRUPTED_BY_RESTART,
};
pub use pipeline::{GenerationPipeline, PipelineError};
