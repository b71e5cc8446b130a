//! Novel Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NovelError {
    #[error("无效的章节编排: {0}")]
    InvalidPlan(String),

    #[error("无效的标题: {0}")]
    InvalidTitle(String),
}
