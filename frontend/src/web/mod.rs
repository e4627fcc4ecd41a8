//! 浏览器 API 封装模块
//!
//! 基于 web_sys 的轻量实现：fetch 传输、LocalStorage 会话持久化、
//! setTimeout 延时以及 History 路由。

mod http;
pub mod router;
mod storage;
mod timer;

pub use http::FetchHttpClient;
pub use storage::WebStorage;
pub use timer::TimeoutSleep;
