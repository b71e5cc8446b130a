//! HTTP Handlers
//!
//! 每个资源一个模块；Handler 只做参数提取与 DTO 转换，业务逻辑在 application 层

mod ai_config;
mod assistant;
mod chapter;
mod generation;
mod novel;
mod ping;
mod websocket;

pub use ai_config::*;
pub use assistant::*;
pub use chapter::*;
pub use generation::*;
pub use novel::*;
pub use ping::*;
pub use websocket::*;
