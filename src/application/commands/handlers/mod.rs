//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod ai_config_handlers;
mod chapter_handlers;
mod generation_handlers;
mod novel_handlers;
mod outline_handlers;

pub use ai_config_handlers::*;
pub use chapter_handlers::*;
pub use generation_handlers::*;
pub use novel_handlers::*;
pub use outline_handlers::*;
