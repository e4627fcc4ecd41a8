//! 全局查询/变更错误拦截
//!
//! 所有读取（query）和写入（mutation）调用都经过 [`ErrorInterceptor`]：
//! 失败先归一化为 [`ErrorResponse`]，再归入四种结果之一，每次失败只产生
//! 一条提示，或者一次"跳转登录 + 提示"。
//!
//! 展示副作用（遮罩、跳转、提示）通过 [`Presenter`] 注入，延时通过 [`Sleep`]
//! 注入，因此这里不依赖任何渲染环境。

use std::cell::Cell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{CODE_INVALID_REFRESH_TOKEN, CODE_VALIDATION_FAILED, ErrorResponse, RawError};
use crate::session::SessionStore;

// =========================================================
// 展示层抽象
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Error,
    Warning,
    Info,
}

/// 用户可见的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn new(kind: ToastKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// 展示副作用
pub trait Presenter {
    /// 显示全屏阻塞遮罩
    fn show_overlay(&self);
    fn hide_overlay(&self);
    fn navigate(&self, path: &str);
    fn toast(&self, toast: Toast);
}

/// 固定延时（浏览器中基于 `setTimeout`）
#[async_trait::async_trait(?Send)]
pub trait Sleep {
    async fn sleep(&self, duration: Duration);
}

// =========================================================
// 文案
// =========================================================

pub const MSG_ERROR_TITLE: &str = "ERROR_TITLE";
pub const MSG_UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
pub const MSG_FORBIDDEN_TITLE: &str = "FORBIDDEN_TITLE";
pub const MSG_FORBIDDEN_DESCRIPTION: &str = "FORBIDDEN_DESCRIPTION";
pub const MSG_VALIDATION_TITLE: &str = "VALIDATION_TITLE";
pub const MSG_SESSION_EXPIRING: &str = "SESSION_EXPIRING";
pub const MSG_SESSION_EXPIRED_TITLE: &str = "SESSION_EXPIRED_TITLE";
pub const MSG_SESSION_EXPIRED_DESCRIPTION: &str = "SESSION_EXPIRED_DESCRIPTION";

pub trait Translator {
    fn translate(&self, key: &str) -> Option<String>;

    /// 翻译，缺失时原样返回键
    fn text(&self, key: &str) -> String {
        self.translate(key).unwrap_or_else(|| key.to_string())
    }
}

/// 键 → 文案 的静态映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCatalog {
    entries: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 内置英文文案
    pub fn english() -> Self {
        Self::empty()
            .with_message(MSG_ERROR_TITLE, "Something went wrong")
            .with_message(MSG_UNKNOWN_ERROR, "An unexpected error occurred. Please try again.")
            .with_message(MSG_FORBIDDEN_TITLE, "Access denied")
            .with_message(
                MSG_FORBIDDEN_DESCRIPTION,
                "You are not allowed to perform this action.",
            )
            .with_message(MSG_VALIDATION_TITLE, "Please check your input")
            .with_message(MSG_SESSION_EXPIRING, "Your session has expired. Signing out...")
            .with_message(MSG_SESSION_EXPIRED_TITLE, "Session expired")
            .with_message(
                MSG_SESSION_EXPIRED_DESCRIPTION,
                "Please sign in again to continue.",
            )
            .with_message("INVALID_CREDENTIALS", "The username or password is incorrect.")
            .with_message("RESOURCE_NOT_FOUND", "The requested record does not exist.")
            .with_message("RATE_LIMITED", "Too many requests. Please slow down.")
    }

    pub fn with_message(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.insert(key.into(), text.into());
        self
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::english()
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// 形如 `INVALID_CREDENTIALS` 的文本视为翻译键
pub fn looks_like_key(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

// =========================================================
// 错误分类
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorOutcome {
    Forbidden,
    SessionExpired,
    Validation { description: String },
    Generic { description: String },
}

/// 错误分类
///
/// 优先级：403 → 会话过期 → 带字段详情的校验失败 → 通用错误。
pub fn classify(error: &ErrorResponse, translator: &dyn Translator) -> ErrorOutcome {
    if error.status == Some(403) {
        return ErrorOutcome::Forbidden;
    }

    match error.code() {
        Some(CODE_INVALID_REFRESH_TOKEN) => return ErrorOutcome::SessionExpired,
        Some(CODE_VALIDATION_FAILED) => {
            if let Some(description) = error.details().and_then(|d| describe_fields(d, translator)) {
                return ErrorOutcome::Validation { description };
            }
        }
        _ => {}
    }

    ErrorOutcome::Generic {
        description: describe(error, translator),
    }
}

/// 通用错误文案
///
/// `error_description` 原样使用；其余消息只有形如翻译键时才查表。
fn describe(error: &ErrorResponse, translator: &dyn Translator) -> String {
    if let Some(description) = error
        .error_description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        return description.to_string();
    }

    match error.best_message().or(error.code()) {
        Some(message) if looks_like_key(message) => translator
            .translate(message)
            .unwrap_or_else(|| message.to_string()),
        Some(message) => message.to_string(),
        None => translator.text(MSG_UNKNOWN_ERROR),
    }
}

/// 字段级校验消息：每个字段一行 `field: msg1, msg2`
fn describe_fields(details: &Value, translator: &dyn Translator) -> Option<String> {
    let fields = details.as_object()?;
    let lines: Vec<String> = fields
        .iter()
        .filter_map(|(field, value)| {
            let messages: Vec<String> = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            if messages.is_empty() {
                return None;
            }
            let joined = messages
                .iter()
                .map(|m| {
                    if looks_like_key(m) {
                        translator.text(m)
                    } else {
                        m.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("{}: {}", field, joined))
        })
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}

// =========================================================
// 拦截器
// =========================================================

/// 一次失败的查询或变更
///
/// `id` 标识该失败实例（日志用）。克隆共享同一个处理标记，
/// 查询错误处理据此只执行一次。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct QueryFailure {
    pub id: Uuid,
    pub error: ErrorResponse,
    handled: Rc<Cell<bool>>,
}

impl QueryFailure {
    pub fn new(raw: impl Into<RawError>) -> Self {
        Self {
            id: Uuid::new_v4(),
            error: ErrorResponse::normalize(raw.into()),
            handled: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_handled(&self) -> bool {
        self.handled.get()
    }

    /// 置位处理标记，返回之前是否未处理
    fn mark_handled(&self) -> bool {
        !self.handled.replace(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Query,
    Mutation,
}

pub struct ErrorInterceptor {
    session: SessionStore,
    presenter: Rc<dyn Presenter>,
    sleeper: Rc<dyn Sleep>,
    translator: Rc<dyn Translator>,
    overlay_delay: Duration,
    login_path: String,
}

impl ErrorInterceptor {
    pub fn new(
        session: SessionStore,
        config: &ClientConfig,
        presenter: Rc<dyn Presenter>,
        sleeper: Rc<dyn Sleep>,
    ) -> Self {
        Self {
            session,
            presenter,
            sleeper,
            translator: Rc::new(MessageCatalog::default()),
            overlay_delay: config.overlay_delay(),
            login_path: config.login_path.clone(),
        }
    }

    pub fn with_translator(mut self, translator: Rc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// 包装读取调用
    pub async fn run_query<T, E, F>(&self, fut: F) -> Result<T, QueryFailure>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RawError>,
    {
        match fut.await {
            Ok(value) => Ok(value),
            Err(e) => {
                let failure = QueryFailure::new(e);
                self.handle_query_error(&failure).await;
                Err(failure)
            }
        }
    }

    /// 包装写入调用
    pub async fn run_mutation<T, E, F>(&self, fut: F) -> Result<T, QueryFailure>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RawError>,
    {
        match fut.await {
            Ok(value) => Ok(value),
            Err(e) => {
                let failure = QueryFailure::new(e);
                self.handle_mutation_error(&failure).await;
                Err(failure)
            }
        }
    }

    /// 查询错误处理，同一失败实例只处理一次
    pub async fn handle_query_error(&self, failure: &QueryFailure) {
        if !failure.mark_handled() {
            tracing::debug!(failure_id = %failure.id, "query failure already handled");
            return;
        }
        self.handle(&failure.error, CallKind::Query).await;
    }

    pub async fn handle_mutation_error(&self, failure: &QueryFailure) {
        self.handle(&failure.error, CallKind::Mutation).await;
    }

    async fn handle(&self, error: &ErrorResponse, kind: CallKind) {
        let outcome = classify(error, self.translator());
        tracing::debug!(?kind, %error, ?outcome, "handling request failure");

        match outcome {
            ErrorOutcome::Forbidden => self.toast(
                ToastKind::Error,
                self.translator.text(MSG_FORBIDDEN_TITLE),
                self.translator.text(MSG_FORBIDDEN_DESCRIPTION),
            ),
            ErrorOutcome::SessionExpired => self.expire_session(kind).await,
            ErrorOutcome::Validation { description } => self.toast(
                ToastKind::Error,
                self.translator.text(MSG_VALIDATION_TITLE),
                description,
            ),
            ErrorOutcome::Generic { description } => self.toast(
                ToastKind::Error,
                self.translator.text(MSG_ERROR_TITLE),
                description,
            ),
        }
    }

    /// 会话过期：遮罩（仅查询）→ 延时 → 清空会话 → 跳转登录 → 移除遮罩 → 提示
    async fn expire_session(&self, kind: CallKind) {
        tracing::info!(?kind, "session expired, signing out");
        let with_overlay = kind == CallKind::Query;

        if with_overlay {
            self.presenter.show_overlay();
        }
        self.sleeper.sleep(self.overlay_delay).await;

        self.session.reset();
        self.presenter.navigate(&self.login_path);
        if with_overlay {
            self.presenter.hide_overlay();
        }

        self.toast(
            ToastKind::Warning,
            self.translator.text(MSG_SESSION_EXPIRED_TITLE),
            self.translator.text(MSG_SESSION_EXPIRED_DESCRIPTION),
        );
    }

    fn toast(&self, kind: ToastKind, title: String, description: String) {
        self.presenter.toast(Toast::new(kind, title, description));
    }
}
