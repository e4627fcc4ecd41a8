//! 401 处理策略
//!
//! 与展示层副作用（toast / 跳转）分离：这里只回答"要不要刷新、刷新结果意味着什么"。
//! 一次逻辑调用最多刷新一次、重试一次。

use crate::error::HttpError;

/// 收到 401 后的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// 没有刷新令牌，会话无法恢复
    Fail,
    /// 用刷新令牌换取新的访问令牌，然后重试原请求一次
    RefreshAndRetry,
}

/// 刷新令牌交换的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// 拿到了新的访问令牌
    Refreshed(String),
    /// 刷新令牌无效，会话结束
    SessionExpired,
    /// 其他失败，按原样向上传递
    Failed(HttpError),
}

/// 原请求返回 401 时的决定
///
/// `already_retried` 为 true 表示这是重试后的响应：不再刷新，避免循环。
pub fn decide_on_unauthorized(has_refresh_token: bool, already_retried: bool) -> RetryDecision {
    if has_refresh_token && !already_retried {
        RetryDecision::RefreshAndRetry
    } else {
        RetryDecision::Fail
    }
}

/// 解释刷新接口的结果
pub fn classify_refresh(result: Result<Option<String>, HttpError>) -> RefreshOutcome {
    match result {
        Ok(Some(token)) if !token.is_empty() => RefreshOutcome::Refreshed(token),
        Ok(_) => RefreshOutcome::Failed(HttpError::new(
            500,
            serde_json::json!({ "error": "invalid_response", "message": "token response without access_token" }),
        )),
        Err(e) if e.is_invalid_refresh_token() => RefreshOutcome::SessionExpired,
        Err(e) => RefreshOutcome::Failed(e),
    }
}
