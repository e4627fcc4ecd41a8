//! 路由服务模块 - 核心引擎
//!
//! 封装了 web_sys 的 History API，所有对 window.history 的操作都集中在此模块。
//! 路径解析交给核心库的 [`RouteTable`]，这里只负责"监听 -> 守卫 -> 加载"。

use backoffice::routes::{RouteMatch, RouteTable};
use leptos::prelude::*;
use wasm_bindgen::prelude::*;

/// 获取当前浏览器路径
fn current_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string())
}

/// 推送 History 状态
fn push_history_state(path: &str) {
    if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
        let _ = history.push_state_with_url(&JsValue::NULL, "", Some(path));
    }
}

/// 替换 History 状态（用于重定向）
fn replace_history_state(path: &str) {
    if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(path));
    }
}

/// 路由器服务
///
/// 通过注入的路由表信号和认证信号实现与菜单、认证系统的解耦。
#[derive(Clone, Copy)]
pub struct RouterService {
    current: RwSignal<RouteMatch>,
    /// 用户最近一次请求的路径，路由表或认证状态变化时据此重新解析
    requested: StoredValue<String>,
    table: Signal<RouteTable>,
    is_authenticated: Signal<bool>,
    login_path: StoredValue<String>,
}

impl RouterService {
    fn new(table: Signal<RouteTable>, is_authenticated: Signal<bool>, login_path: String) -> Self {
        let path = current_path();
        let initial = table.get_untracked().match_path(&path);
        let router = Self {
            current: RwSignal::new(initial),
            requested: StoredValue::new(path),
            table,
            is_authenticated,
            login_path: StoredValue::new(login_path),
        };
        // 初始路由也要经过守卫
        let guarded = router.resolve(&router.requested.get_value());
        router.apply(guarded, false);
        router
    }

    pub fn current(&self) -> RwSignal<RouteMatch> {
        self.current
    }

    /// **核心方法：导航与守卫**
    pub fn navigate(&self, path: &str) {
        self.requested.set_value(path.to_string());
        let target = self.resolve(path);
        self.apply(target, true);
    }

    /// 匹配路径并执行认证守卫
    fn resolve(&self, path: &str) -> RouteMatch {
        let table = self.table.get_untracked();
        let target = table.match_path(path);
        let is_auth = self.is_authenticated.get_untracked();

        if target.route.requires_auth() && !is_auth {
            tracing::info!(path, "access denied, redirecting to login");
            return table.match_path(&self.login_path.get_value());
        }
        if target.route.should_redirect_when_authenticated() && is_auth {
            tracing::debug!("already authenticated, redirecting home");
            return table.match_path("/");
        }
        target
    }

    fn apply(&self, target: RouteMatch, use_push: bool) {
        if use_push {
            push_history_state(&target.path);
        } else {
            replace_history_state(&target.path);
        }
        self.requested.set_value(target.path.clone());
        self.current.set(target);
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let router = *self;
        let closure = Closure::<dyn Fn()>::new(move || {
            let path = current_path();
            router.requested.set_value(path.clone());
            // popstate 时也执行守卫逻辑
            let target = router.resolve(&path);
            router.apply(target, false);
        });

        if let Some(window) = web_sys::window() {
            let _ =
                window.add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 路由表或认证状态变化时重新解析当前请求
    fn setup_reactive_redirect(&self) {
        let router = *self;
        Effect::new(move |_| {
            router.table.track();
            router.is_authenticated.track();

            let requested = router.requested.get_value();
            let next = router.resolve(&requested);
            if next != router.current.get_untracked() {
                tracing::debug!(from = %requested, to = %next.path, "route re-resolved");
                router.apply(next, true);
            }
        });
    }
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
#[component]
pub fn Router(
    #[prop(into)] table: Signal<RouteTable>,
    #[prop(into)] is_authenticated: Signal<bool>,
    #[prop(into)] login_path: String,
    children: Children,
) -> impl IntoView {
    let router = RouterService::new(table, is_authenticated, login_path);
    router.init_popstate_listener();
    router.setup_reactive_redirect();
    provide_context(router);

    children()
}

/// 路由出口组件
#[component]
pub fn RouterOutlet(matcher: fn(RouteMatch) -> AnyView) -> impl IntoView {
    let router = use_router();

    move || matcher(router.current().get())
}

/// 站内链接，拦截点击改为 History 导航
#[component]
pub fn Link(
    #[prop(into)] to: String,
    /// 高亮当前所在页面
    #[prop(optional)] active: Option<Signal<bool>>,
    children: Children,
) -> impl IntoView {
    let router = use_router();

    let target = to.clone();
    let on_click = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate(&target);
    };

    view! {
        <a href=to class:active=move || active.is_some_and(|a| a.get()) on:click=on_click>
            {children()}
        </a>
    }
}
