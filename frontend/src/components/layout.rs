//! 应用外壳：按权限过滤后的侧边栏 + 内容区

use backoffice::MenuItem;
use backoffice::menu::visible;
use leptos::prelude::*;

use crate::auth::{logout, use_auth};
use crate::web::router::{Link, use_router};

/// 当前用户可见的菜单（已按配置与权限过滤）
#[derive(Clone, Copy)]
pub struct NavigationContext {
    pub items: Memo<Vec<MenuItem>>,
}

pub fn use_navigation() -> NavigationContext {
    use_context::<NavigationContext>().expect("NavigationContext should be provided")
}

/// `current` 是否位于 `item_path` 之下（按路径段比较）
fn is_within(current: &str, item_path: &str) -> bool {
    let base = item_path.trim_end_matches('/');
    match current.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn nav_list(items: Vec<MenuItem>) -> AnyView {
    let router = use_router();
    items
        .into_iter()
        .map(|item| {
            let path = item.path.clone();
            let is_active = move || router.current().with(|m| is_within(&m.path, &path));
            if item.children.is_empty() {
                view! {
                    <li>
                        <Link to=item.path.clone() active=Signal::derive(is_active)>
                            {item.name.clone()}
                        </Link>
                    </li>
                }
                .into_any()
            } else {
                view! {
                    <li>
                        <details open>
                            <summary>{item.name.clone()}</summary>
                            <ul>{nav_list(item.children.clone())}</ul>
                        </details>
                    </li>
                }
                .into_any()
            }
        })
        .collect_view()
        .into_any()
}

#[component]
pub fn Sidebar() -> impl IntoView {
    let navigation = use_navigation();

    view! {
        <aside class="w-64 min-h-screen bg-base-100 shadow">
            <div class="p-4 text-xl font-bold">"Back Office"</div>
            <ul class="menu">
                {move || nav_list(visible(&navigation.items.get()))}
            </ul>
        </aside>
    }
}

#[component]
pub fn Shell(children: Children) -> impl IntoView {
    let auth = use_auth();
    let user_name = move || {
        auth.state.with(|s| {
            s.user
                .as_ref()
                .and_then(|u| u.name.clone().or_else(|| Some(u.id.clone())))
                .unwrap_or_default()
        })
    };

    view! {
        <div class="flex min-h-screen bg-base-200">
            <Sidebar />
            <main class="flex-1 p-4 md:p-8">
                <div class="navbar bg-base-100 rounded-box shadow mb-6">
                    <div class="flex-1 px-2">{user_name}</div>
                    <button class="btn btn-ghost btn-sm" on:click=move |_| logout(auth)>
                        "Sign out"
                    </button>
                </div>
                {children()}
            </main>
        </div>
    }
}
