use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{AuthMode, ClientConfig};
use crate::error::HttpError;
use crate::protocol::ApiRequest;
use crate::session::SessionStore;

use super::request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use super::retry::{RefreshOutcome, RetryDecision, classify_refresh, decide_on_unauthorized};

// =========================================================
// 常量定义
// =========================================================

pub const HEADER_SERVICE_KEY: &str = "X-Service-Key";
const BASE_CONTENT_TYPE: &str = "application/json";

// =========================================================
// 请求选项
// =========================================================

/// 单次请求的选项
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self::with_method(HttpMethod::Post, Some(body))
    }

    pub fn put(body: Value) -> Self {
        Self::with_method(HttpMethod::Put, Some(body))
    }

    pub fn patch(body: Value) -> Self {
        Self::with_method(HttpMethod::Patch, Some(body))
    }

    pub fn delete() -> Self {
        Self::with_method(HttpMethod::Delete, None)
    }

    fn with_method(method: HttpMethod, body: Option<Value>) -> Self {
        Self {
            method,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }
}

/// OAuth 令牌接口的成功响应
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

// =========================================================
// 会话客户端
// =========================================================

/// 带会话生命周期的 HTTP 客户端
///
/// 收到 401 时最多刷新一次访问令牌并重试一次原请求；
/// 刷新令牌缺失或无效时以 `invalid_refresh_token` 失败。
pub struct SessionClient<C> {
    client: C,
    config: ClientConfig,
    session: SessionStore,
}

impl<C: HttpClient> SessionClient<C> {
    pub fn new(client: C, config: ClientConfig, session: SessionStore) -> Self {
        Self {
            client,
            config,
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 发送请求并解析 JSON 响应
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let url = self.config.url(path);
        let mut access_token = self.session.access_token();
        let mut retried = false;

        loop {
            let req = self.build(&url, &options, access_token.as_deref());
            let resp = self.send_once(req).await?;

            if resp.status != 401 {
                return finish(resp);
            }

            match decide_on_unauthorized(self.session.refresh_token().is_some(), retried) {
                RetryDecision::Fail if retried => {
                    tracing::warn!(url = %url, "request still unauthorized after token refresh");
                    return Err(HttpError::from_response(resp.status, &resp.body));
                }
                RetryDecision::Fail => {
                    tracing::debug!(url = %url, "unauthorized without refresh token");
                    return Err(HttpError::invalid_refresh_token());
                }
                RetryDecision::RefreshAndRetry => {
                    access_token = Some(self.refresh_access_token().await?);
                    retried = true;
                }
            }
        }
    }

    /// 调用类型化的接口
    pub async fn call<R: ApiRequest>(&self, request: &R) -> Result<R::Response, HttpError> {
        let body = match R::METHOD {
            HttpMethod::Get => None,
            _ => Some(serde_json::to_value(request).map_err(|e| {
                HttpError::new(
                    400,
                    serde_json::json!({ "error": "invalid_request", "message": e.to_string() }),
                )
            })?),
        };
        let options = RequestOptions {
            method: R::METHOD,
            headers: Vec::new(),
            body: body.filter(|b| !b.is_null()),
        };
        self.request(R::PATH, options).await
    }

    /// 用刷新令牌换取新的访问令牌，并写回会话
    pub async fn refresh_access_token(&self) -> Result<String, HttpError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(HttpError::invalid_refresh_token)?;

        tracing::debug!("exchanging refresh token");
        let mut fields = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        if let Some(client_id) = &self.config.client_id {
            fields.push(("client_id", client_id.as_str()));
        }

        let result = self
            .token_grant(&fields)
            .await
            .map(|token| Some(token.access_token));

        match classify_refresh(result) {
            RefreshOutcome::Refreshed(token) => {
                self.session.set_access_token(token.clone());
                Ok(token)
            }
            RefreshOutcome::SessionExpired => {
                tracing::warn!("refresh token rejected, session expired");
                Err(HttpError::invalid_refresh_token())
            }
            RefreshOutcome::Failed(e) => {
                tracing::warn!(status = e.status, "token refresh failed");
                Err(e)
            }
        }
    }

    /// 密码模式登录，成功后写入会话
    pub async fn login_with_password(&self, username: &str, password: &str) -> Result<(), HttpError> {
        let mut fields = vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        if let Some(client_id) = &self.config.client_id {
            fields.push(("client_id", client_id.as_str()));
        }

        let token = self.token_grant(&fields).await?;
        let refresh_token = token.refresh_token.ok_or_else(|| {
            HttpError::new(
                500,
                serde_json::json!({ "error": "invalid_response", "message": "token response without refresh_token" }),
            )
        })?;
        self.session.login(token.access_token, refresh_token);
        Ok(())
    }

    async fn token_grant(&self, fields: &[(&str, &str)]) -> Result<TokenResponse, HttpError> {
        let req = HttpRequest::new(&self.config.url(&self.config.token_path), HttpMethod::Post)
            .with_header(HEADER_SERVICE_KEY, &self.config.service_key)
            .with_form(fields);
        let resp = self.send_once(req).await?;
        if !resp.ok() {
            return Err(HttpError::from_response(resp.status, &resp.body));
        }
        resp.json()
    }

    fn build(&self, url: &str, options: &RequestOptions, access_token: Option<&str>) -> HttpRequest {
        let mut req = HttpRequest::new(url, options.method)
            .with_header("Content-Type", BASE_CONTENT_TYPE)
            .with_header(HEADER_SERVICE_KEY, &self.config.service_key);

        if self.config.auth_mode == AuthMode::Bearer {
            if let Some(token) = access_token {
                req = req.with_header("Authorization", &format!("Bearer {}", token));
            }
        }

        for (key, value) in &options.headers {
            req = req.with_header(key, value);
        }

        if let Some(body) = &options.body {
            req = req.with_body(body.clone());
        }
        req
    }

    /// 单次发送，传输层失败统一包装为网络错误
    async fn send_once(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        Ok(self.client.send(req).await?)
    }
}

fn finish<T: DeserializeOwned>(resp: HttpResponse) -> Result<T, HttpError> {
    if !resp.ok() {
        return Err(HttpError::from_response(resp.status, &resp.body));
    }
    resp.json()
}

#[cfg(test)]
mod tests;
