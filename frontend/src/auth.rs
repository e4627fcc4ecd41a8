//! 认证模块
//!
//! 会话状态只由核心库的 `SessionStore` 修改；这里把它镜像到 Leptos 信号，
//! 并通过 Context 向组件提供 API 客户端与错误拦截器。

use std::rc::Rc;

use backoffice::http::SessionClient;
use backoffice::{ClientConfig, ErrorInterceptor, Session, SessionStore};
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;

use crate::web::{FetchHttpClient, WebStorage};

pub type ApiClient = SessionClient<FetchHttpClient>;

/// 认证上下文
///
/// 核心对象是单线程的（`Rc`），因此用本地存储的 `StoredValue` 保存。
#[derive(Clone, Copy)]
pub struct AuthContext {
    /// 会话快照（只读镜像）
    pub state: ReadSignal<Session>,
    client: StoredValue<Rc<ApiClient>, LocalStorage>,
    interceptor: StoredValue<Option<Rc<ErrorInterceptor>>, LocalStorage>,
}

impl AuthContext {
    /// 打开持久化会话并建立信号镜像
    pub fn new(config: &ClientConfig) -> Self {
        let store = SessionStore::open(WebStorage, &config.storage_key);
        let (state, set_state) = signal(store.snapshot());
        store.subscribe(move |session| set_state.set(session.clone()));

        let transport = FetchHttpClient::new(config.auth_mode == backoffice::AuthMode::Cookie);
        let client = SessionClient::new(transport, config.clone(), store);

        Self {
            state,
            client: StoredValue::new_local(Rc::new(client)),
            interceptor: StoredValue::new_local(None),
        }
    }

    /// 获取认证状态信号（用于路由服务注入）
    pub fn is_authenticated_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.with(|s| s.is_authenticated))
    }

    pub fn client(&self) -> Rc<ApiClient> {
        self.client.get_value()
    }

    pub fn session(&self) -> SessionStore {
        self.client.with_value(|c| c.session().clone())
    }

    pub fn set_interceptor(&self, interceptor: ErrorInterceptor) {
        self.interceptor.set_value(Some(Rc::new(interceptor)));
    }

    /// 错误拦截器，挂载 UI 之后才可用
    pub fn interceptor(&self) -> Option<Rc<ErrorInterceptor>> {
        self.interceptor.get_value()
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

/// 用户名密码登录
///
/// 失败由拦截器统一提示，这里只返回是否成功。
pub async fn login(ctx: AuthContext, username: String, password: String) -> bool {
    let client = ctx.client();
    let request = async move { client.login_with_password(&username, &password).await };

    match ctx.interceptor() {
        Some(interceptor) => interceptor.run_mutation(request).await.is_ok(),
        None => request.await.is_ok(),
    }
}

/// 注销并清除状态
///
/// 导航将由路由服务的认证状态监听自动处理。
pub fn logout(ctx: AuthContext) {
    ctx.session().logout();
}
