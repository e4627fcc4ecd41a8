use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// =========================================================
// 常量定义
// =========================================================

pub const CODE_INVALID_REFRESH_TOKEN: &str = "invalid_refresh_token";
pub const CODE_VALIDATION_FAILED: &str = "validation_failed";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

// =========================================================
// HTTP 错误
// =========================================================

/// HTTP 客户端对外暴露的唯一错误类型
///
/// `body` 保留后端返回的原始错误体（JSON 或文本），
/// 由拦截器统一归一化为 [`ErrorResponse`]。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("HTTP {status}: {body}")]
pub struct HttpError {
    pub status: u16,
    pub body: Value,
}

impl HttpError {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 网络层失败（请求根本没有得到响应）
    pub fn network() -> Self {
        Self::new(500, json!({ "error": NETWORK_ERROR_MESSAGE }))
    }

    /// 刷新令牌无效或缺失，会话不可恢复
    pub fn invalid_refresh_token() -> Self {
        Self::new(401, json!({ "error": CODE_INVALID_REFRESH_TOKEN }))
    }

    /// 由非 2xx 响应构建，响应体不是 JSON 时按文本保留
    pub fn from_response(status: u16, body: &str) -> Self {
        let body = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
        };
        Self::new(status, body)
    }

    /// 错误体中的机器可读错误码
    pub fn error_code(&self) -> Option<String> {
        ErrorResponse::from_value(&self.body).code().map(str::to_string)
    }

    pub fn is_invalid_refresh_token(&self) -> bool {
        self.error_code().as_deref() == Some(CODE_INVALID_REFRESH_TOKEN)
    }
}

/// 底层传输失败（DNS、连接中断、请求构建失败等）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl From<TransportError> for HttpError {
    fn from(e: TransportError) -> Self {
        tracing::warn!(error = %e, "request failed before a response was received");
        HttpError::network()
    }
}

// =========================================================
// 归一化错误结构
// =========================================================

/// 后端错误信封中的 `error` 对象
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// 归一化后的错误结构
///
/// 任意原始错误（错误消息、JSON 字符串、HTTP 响应体）都先归一化到这里，
/// 再由拦截器决定如何展示。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// 归一化的输入
#[derive(Debug, Clone)]
pub enum RawError {
    /// 普通错误对象的消息文本
    Message(String),
    /// JSON 文本（可能是对象，也可能是裸字符串）
    Json(String),
    /// HTTP 客户端返回的错误
    Http(HttpError),
}

impl From<HttpError> for RawError {
    fn from(e: HttpError) -> Self {
        RawError::Http(e)
    }
}

impl ErrorResponse {
    /// 唯一的归一化入口
    pub fn normalize(raw: RawError) -> Self {
        match raw {
            RawError::Message(msg) => Self::from_text(&msg),
            RawError::Json(text) => Self::from_text(&text),
            RawError::Http(e) => {
                let mut normalized = Self::from_value(&e.body);
                normalized.status = Some(e.status);
                normalized
            }
        }
    }

    fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value @ (Value::Object(_) | Value::String(_))) => Self::from_value(&value),
            _ => Self::with_message(text),
        }
    }

    fn with_message(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// 从任意 JSON 值宽松地提取字段
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(s) => {
                // 裸 JSON 字符串里可能还包着一层 JSON
                match serde_json::from_str::<Value>(s) {
                    Ok(inner @ Value::Object(_)) => Self::from_value(&inner),
                    _ => Self::with_message(s),
                }
            }
            Value::Object(map) => Self::from_map(map),
            other => Self::with_message(&other.to_string()),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let error = match map.get("error") {
            Some(Value::String(code)) => Some(ErrorDetail {
                error: Some(code.clone()),
                ..Default::default()
            }),
            Some(Value::Object(inner)) => Some(ErrorDetail {
                error: string_field(inner, "error"),
                message: string_field(inner, "message"),
                code: string_field(inner, "code"),
                details: inner.get("details").filter(|v| !v.is_null()).cloned(),
            }),
            _ => None,
        };

        Self {
            error,
            error_description: string_field(map, "error_description"),
            message: string_field(map, "message"),
            status: map
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok()),
        }
    }

    /// 机器可读的错误码：优先 `error.error`，其次 `error.code`
    pub fn code(&self) -> Option<&str> {
        let detail = self.error.as_ref()?;
        detail.error.as_deref().or(detail.code.as_deref())
    }

    pub fn details(&self) -> Option<&Value> {
        self.error.as_ref()?.details.as_ref()
    }

    /// 可读消息，按 `error_description` → `error.message` → `message` 的顺序
    pub fn best_message(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or_else(|| self.error.as_ref().and_then(|e| e.message.as_deref()))
            .or(self.message.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "[{}] ", status)?;
        }
        match (self.code(), self.best_message()) {
            (Some(code), Some(msg)) => write!(f, "{}: {}", code, msg),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(msg)) => write!(f, "{}", msg),
            (None, None) => write!(f, "unknown error"),
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_nested_envelope() {
        let e = HttpError::from_response(
            422,
            r#"{"error":{"error":"validation_failed","details":{"email":["required"]}}}"#,
        );
        let normalized = ErrorResponse::normalize(e.into());
        assert_eq!(normalized.status, Some(422));
        assert_eq!(normalized.code(), Some(CODE_VALIDATION_FAILED));
        assert_eq!(
            normalized.details(),
            Some(&json!({ "email": ["required"] }))
        );
    }

    #[test]
    fn test_token_endpoint_flat_error() {
        let e = HttpError::from_response(
            400,
            r#"{"error":"invalid_refresh_token","error_description":"Token expired"}"#,
        );
        assert!(e.is_invalid_refresh_token());
        let normalized = ErrorResponse::normalize(RawError::Http(e));
        assert_eq!(normalized.best_message(), Some("Token expired"));
    }

    #[test]
    fn test_bare_json_string_and_plain_message() {
        let wrapped = ErrorResponse::normalize(RawError::Json(
            r#""{\"message\":\"Quota exceeded\",\"status\":429}""#.to_string(),
        ));
        assert_eq!(wrapped.message.as_deref(), Some("Quota exceeded"));
        assert_eq!(wrapped.status, Some(429));

        let bare = ErrorResponse::normalize(RawError::Json(r#""ITEM_LOCKED""#.to_string()));
        assert_eq!(bare.message.as_deref(), Some("ITEM_LOCKED"));

        let plain = ErrorResponse::normalize(RawError::Message("boom".to_string()));
        assert_eq!(plain.message.as_deref(), Some("boom"));
        assert_eq!(plain.code(), None);
    }

    #[test]
    fn test_non_json_body_and_network_error() {
        let e = HttpError::from_response(502, "Bad Gateway");
        assert_eq!(e.body, Value::String("Bad Gateway".to_string()));
        assert_eq!(
            ErrorResponse::normalize(e.into()).best_message(),
            Some("Bad Gateway")
        );

        let net: HttpError = TransportError("connection reset".to_string()).into();
        assert_eq!(net, HttpError::network());
        assert_eq!(net.error_code().as_deref(), Some(NETWORK_ERROR_MESSAGE));
    }

    #[test]
    fn test_numeric_code_is_stringified() {
        let normalized = ErrorResponse::from_value(&json!({ "error": { "code": 4031 } }));
        assert_eq!(normalized.code(), Some("4031"));
        assert_eq!(normalized.to_string(), "4031");
    }
}
