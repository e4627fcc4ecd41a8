//! HTTP 传输层
//!
//! 使用 `web_sys::fetch` 实现核心库的 [`HttpClient`] 特性。

use backoffice::error::TransportError;
use backoffice::http::{HttpClient, HttpRequest, HttpResponse};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestCredentials, RequestInit, Response};

fn js_error(context: &str, e: JsValue) -> TransportError {
    TransportError(format!("{}: {:?}", context, e))
}

/// 基于 fetch 的 HTTP 客户端
///
/// Cookie 认证模式下需要 `credentials: include`，让浏览器携带会话 Cookie。
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchHttpClient {
    include_credentials: bool,
}

impl FetchHttpClient {
    pub fn new(include_credentials: bool) -> Self {
        Self {
            include_credentials,
        }
    }

    fn build(&self, req: &HttpRequest) -> Result<Request, TransportError> {
        let headers = Headers::new().map_err(|e| js_error("创建 Headers 失败", e))?;
        for (key, value) in &req.headers {
            headers
                .set(key, value)
                .map_err(|e| js_error("设置 Header 失败", e))?;
        }

        let opts = RequestInit::new();
        opts.set_method(req.method.as_str());
        opts.set_headers(&headers.into());
        if self.include_credentials {
            opts.set_credentials(RequestCredentials::Include);
        }
        if let Some(body) = &req.body {
            opts.set_body(&JsValue::from_str(body));
        }

        Request::new_with_str_and_init(&req.url, &opts).map_err(|e| js_error("请求构建失败", e))
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for FetchHttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let request = self.build(&req)?;

        let window =
            web_sys::window().ok_or_else(|| TransportError("无法获取 window 对象".to_string()))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| js_error("网络错误", e))?;

        let response: Response = resp_value
            .dyn_into()
            .map_err(|e| js_error("Response 类型转换失败", e))?;

        let promise = response
            .text()
            .map_err(|e| js_error("读取响应体失败", e))?;
        let body = JsFuture::from(promise)
            .await
            .map_err(|e| js_error("读取响应体失败", e))?
            .as_string()
            .unwrap_or_default();

        tracing::debug!(method = req.method.as_str(), url = %req.url, status = response.status(), "fetch completed");

        Ok(HttpResponse {
            status: response.status(),
            body,
        })
    }
}
