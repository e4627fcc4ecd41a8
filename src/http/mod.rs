//! HTTP 模块
//!
//! - `request`: 传输层抽象（`HttpClient` trait 及其实现）
//! - `retry`: 401 处理策略（纯函数，可独立测试）
//! - `session_client`: 附加认证头、在 401 时刷新并重试一次的会话客户端

mod request;
mod retry;
mod session_client;

#[cfg(test)]
pub(crate) use request::mock;

#[cfg(not(target_arch = "wasm32"))]
pub use request::ReqwestHttpClient;
pub use request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use retry::{RefreshOutcome, RetryDecision, classify_refresh, decide_on_unauthorized};
pub use session_client::{
    HEADER_SERVICE_KEY, RequestOptions, SessionClient, TokenResponse,
};
