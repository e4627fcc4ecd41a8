//! 页面
//!
//! 功能页面只展示标题与路由参数，业务内容不在本项目范围内。

use backoffice::protocol::CurrentUserRequest;
use backoffice::routes::{RouteId, RouteMatch};
use backoffice::session::UserProfile;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::auth::use_auth;
use crate::web::router::Link;

#[component]
pub fn DashboardPage() -> impl IntoView {
    let auth = use_auth();
    let (profile, set_profile) = signal(Option::<UserProfile>::None);

    if let Some(interceptor) = auth.interceptor() {
        let client = auth.client();
        spawn_local(async move {
            let query = async move { client.call(&CurrentUserRequest).await };
            if let Ok(me) = interceptor.run_query(query).await {
                set_profile.set(Some(me));
            }
        });
    }

    view! {
        <div class="card bg-base-100 shadow">
            <div class="card-body">
                <h1 class="card-title text-2xl">{RouteId::Dashboard.title()}</h1>
                {move || match profile.get() {
                    Some(me) => view! {
                        <p>"Signed in as " <strong>{me.name.unwrap_or(me.id)}</strong></p>
                        <p class="text-sm text-base-content/70">
                            "Roles: " {me.roles.join(", ")}
                        </p>
                    }
                    .into_any(),
                    None => view! { <span class="loading loading-dots"></span> }.into_any(),
                }}
            </div>
        </div>
    }
}

#[component]
pub fn FeaturePage(current: RouteMatch) -> impl IntoView {
    let params = current
        .params
        .iter()
        .map(|(name, value)| {
            view! {
                <li>
                    <span class="font-mono">{name.clone()}</span>
                    " = "
                    <span class="font-mono">{value.clone()}</span>
                </li>
            }
        })
        .collect_view();

    view! {
        <div class="card bg-base-100 shadow">
            <div class="card-body">
                <h1 class="card-title text-2xl">{current.route.title()}</h1>
                <p class="text-sm text-base-content/70 font-mono">{current.path.clone()}</p>
                <ul class="mt-4">{params}</ul>
            </div>
        </div>
    }
}

#[component]
pub fn ErrorPage(route: RouteId) -> impl IntoView {
    let code = match route {
        RouteId::ServiceUnavailable => "503",
        _ => "404",
    };

    view! {
        <div class="flex items-center justify-center min-h-screen bg-base-200">
            <div class="text-center">
                <h1 class="text-6xl font-bold text-error">{code}</h1>
                <p class="text-xl mt-4">{route.title()}</p>
                <Link to="/">"Back to start"</Link>
            </div>
        </div>
    }
}
