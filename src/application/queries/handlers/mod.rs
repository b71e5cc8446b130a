//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod novel_handlers;
mod task_handlers;

pub use novel_handlers::*;
pub use task_handlers::*;
