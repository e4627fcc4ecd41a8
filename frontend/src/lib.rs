//! Back-office 前端应用
//!
//! 把核心库接到浏览器上：
//! - `web`: fetch / LocalStorage / setTimeout / History 的封装
//! - `auth`: 会话镜像与 API 客户端
//! - `components`: UI 组件层

mod auth;
mod components {
    pub mod feedback;
    pub mod layout;
    pub mod login;
    pub mod pages;
}
pub(crate) mod web;

use std::rc::Rc;

use backoffice::menu::HttpMenuSelectionProvider;
use backoffice::routes::RouteMatch;
use backoffice::{
    ClientConfig, ErrorInterceptor, MenuCatalog, Principal, ResolvedMenu, RouteConfig, RouteId,
    build_routes, filter_menu, resolve_menu,
};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::auth::{AuthContext, use_auth};
use crate::components::feedback::{Feedback, SessionOverlay, ToastHost, UiPresenter, use_feedback};
use crate::components::layout::{NavigationContext, Shell};
use crate::components::login::LoginPage;
use crate::components::pages::{DashboardPage, ErrorPage, FeaturePage};
use crate::web::router::{Router, RouterOutlet, use_router};
use crate::web::{FetchHttpClient, TimeoutSleep};

/// 构建期注入的运行时配置
fn runtime_config() -> ClientConfig {
    ClientConfig::from_lookup(|name| {
        let value = match name {
            "BACKOFFICE_API_BASE_URL" => option_env!("BACKOFFICE_API_BASE_URL"),
            "BACKOFFICE_SERVICE_KEY" => option_env!("BACKOFFICE_SERVICE_KEY"),
            "BACKOFFICE_AUTH_MODE" => option_env!("BACKOFFICE_AUTH_MODE"),
            "BACKOFFICE_TOKEN_PATH" => option_env!("BACKOFFICE_TOKEN_PATH"),
            "BACKOFFICE_CLIENT_ID" => option_env!("BACKOFFICE_CLIENT_ID"),
            "BACKOFFICE_MENU_CONFIG_PATH" => option_env!("BACKOFFICE_MENU_CONFIG_PATH"),
            "BACKOFFICE_MENU_CONFIG_VERSION" => option_env!("BACKOFFICE_MENU_CONFIG_VERSION"),
            "BACKOFFICE_STORAGE_KEY" => option_env!("BACKOFFICE_STORAGE_KEY"),
            "BACKOFFICE_OVERLAY_DELAY_MS" => option_env!("BACKOFFICE_OVERLAY_DELAY_MS"),
            "BACKOFFICE_LOGIN_PATH" => option_env!("BACKOFFICE_LOGIN_PATH"),
            _ => None,
        };
        value.map(str::to_string)
    })
}

/// 路由匹配函数
///
/// 根据 RouteId 返回对应的视图组件。
fn route_matcher(current: RouteMatch) -> AnyView {
    match current.route {
        RouteId::Login => view! { <LoginPage /> }.into_any(),
        RouteId::NotFound | RouteId::ServiceUnavailable => {
            view! { <ErrorPage route=current.route /> }.into_any()
        }
        RouteId::Dashboard => view! { <Shell><DashboardPage /></Shell> }.into_any(),
        RouteId::Inventory
        | RouteId::InventoryAdd
        | RouteId::InventoryDetail
        | RouteId::InventoryEdit
        | RouteId::Invoices
        | RouteId::InvoiceAdd
        | RouteId::InvoiceDetail
        | RouteId::InvoiceEdit
        | RouteId::Mail
        | RouteId::MailCompose
        | RouteId::MailFolder
        | RouteId::MailDetail
        | RouteId::FileManager
        | RouteId::FileManagerFolder
        | RouteId::FileDetail
        | RouteId::ActivityLog
        | RouteId::Tasks
        | RouteId::Finance
        | RouteId::Users
        | RouteId::Roles
        | RouteId::Settings => view! { <Shell><FeaturePage current=current /></Shell> }.into_any(),
    }
}

/// 在路由器内部创建错误拦截器（跳转需要路由服务）
#[component]
fn InterceptorProvider(config: ClientConfig) -> impl IntoView {
    let auth = use_auth();
    let presenter = Rc::new(UiPresenter {
        feedback: use_feedback(),
        router: use_router(),
    });
    auth.set_interceptor(ErrorInterceptor::new(
        auth.session(),
        &config,
        presenter,
        Rc::new(TimeoutSleep),
    ));
}

#[component]
pub fn App() -> impl IntoView {
    let config = runtime_config();

    // 1. 会话与提示上下文
    let auth = AuthContext::new(&config);
    provide_context(auth);
    provide_context(Feedback::new());

    // 2. 加载动态菜单配置（只加载一次）
    let catalog = MenuCatalog::standard();
    let route_config = StoredValue::new(
        RouteConfig::standard(&config.login_path).validate_against(&catalog),
    );
    let resolved = RwSignal::new(ResolvedMenu::loading());
    {
        let provider = HttpMenuSelectionProvider::new(FetchHttpClient::default(), &config);
        spawn_local(async move {
            resolved.set(resolve_menu(&catalog, &provider).await);
        });
    }

    // 3. 按当前用户过滤菜单，并据此构建路由表
    let state = auth.state;
    let items = Memo::new(move |_| {
        let principal = state.with(Principal::from_session);
        resolved.with(|menu| filter_menu(&menu.items, &principal))
    });
    provide_context(NavigationContext { items });
    let table = Memo::new(move |_| route_config.with_value(|c| items.with(|i| build_routes(i, c))));

    let is_loading = move || resolved.with(|menu| menu.is_loading);
    let is_authenticated = auth.is_authenticated_signal();

    view! {
        <Show
            when=move || !is_loading()
            fallback=|| view! {
                <div class="flex items-center justify-center min-h-screen">
                    <span class="loading loading-spinner loading-lg text-primary"></span>
                </div>
            }
        >
            <Router table=table is_authenticated=is_authenticated login_path=config.login_path.clone()>
                <InterceptorProvider config=config.clone() />
                <RouterOutlet matcher=route_matcher />
            </Router>
        </Show>
        <ToastHost />
        <SessionOverlay />
    }
}
