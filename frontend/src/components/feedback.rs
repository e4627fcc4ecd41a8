//! 提示与遮罩
//!
//! [`UiPresenter`] 把拦截器的展示副作用落到信号上，
//! [`ToastHost`] 和 [`SessionOverlay`] 负责渲染。

use std::time::Duration;

use backoffice::interceptor::{MSG_SESSION_EXPIRING, MessageCatalog, Translator};
use backoffice::{Presenter, Toast, ToastKind};
use leptos::prelude::*;

use crate::web::router::RouterService;

const TOAST_TTL: Duration = Duration::from_secs(4);

/// 提示与遮罩的共享状态
#[derive(Clone, Copy)]
pub struct Feedback {
    toasts: RwSignal<Vec<(u64, Toast)>>,
    overlay: RwSignal<bool>,
    next_id: StoredValue<u64>,
}

impl Feedback {
    pub fn new() -> Self {
        Self {
            toasts: RwSignal::new(Vec::new()),
            overlay: RwSignal::new(false),
            next_id: StoredValue::new(0),
        }
    }

    pub fn push(&self, toast: Toast) {
        let id = self.next_id.get_value();
        self.next_id.set_value(id + 1);
        self.toasts.update(|list| list.push((id, toast)));

        let toasts = self.toasts;
        set_timeout(
            move || toasts.update(|list| list.retain(|(toast_id, _)| *toast_id != id)),
            TOAST_TTL,
        );
    }

    fn dismiss(&self, id: u64) {
        self.toasts
            .update(|list| list.retain(|(toast_id, _)| *toast_id != id));
    }
}

/// 从 Context 获取提示状态
pub fn use_feedback() -> Feedback {
    use_context::<Feedback>().expect("Feedback should be provided")
}

/// 拦截器的浏览器端展示实现
pub struct UiPresenter {
    pub feedback: Feedback,
    pub router: RouterService,
}

impl Presenter for UiPresenter {
    fn show_overlay(&self) {
        self.feedback.overlay.set(true);
    }

    fn hide_overlay(&self) {
        self.feedback.overlay.set(false);
    }

    fn navigate(&self, path: &str) {
        self.router.navigate(path);
    }

    fn toast(&self, toast: Toast) {
        self.feedback.push(toast);
    }
}

fn alert_class(kind: ToastKind) -> &'static str {
    match kind {
        ToastKind::Error => "alert alert-error shadow-lg",
        ToastKind::Warning => "alert alert-warning shadow-lg",
        ToastKind::Info => "alert alert-info shadow-lg",
    }
}

#[component]
pub fn ToastHost() -> impl IntoView {
    let feedback = use_feedback();

    view! {
        <div class="toast toast-top toast-end z-50">
            <For
                each=move || feedback.toasts.get()
                key=|(id, _)| *id
                children=move |(id, toast)| {
                    view! {
                        <div class=alert_class(toast.kind) on:click=move |_| feedback.dismiss(id)>
                            <div>
                                <h3 class="font-bold">{toast.title}</h3>
                                <div class="text-sm whitespace-pre-line">{toast.description}</div>
                            </div>
                        </div>
                    }
                }
            />
        </div>
    }
}

/// 会话过期时的全屏阻塞遮罩
#[component]
pub fn SessionOverlay() -> impl IntoView {
    let feedback = use_feedback();
    let message = MessageCatalog::english().text(MSG_SESSION_EXPIRING);

    view! {
        <Show when=move || feedback.overlay.get()>
            <div class="fixed inset-0 z-[100] flex items-center justify-center bg-base-300/80">
                <div class="flex flex-col items-center gap-4">
                    <span class="loading loading-spinner loading-lg text-primary"></span>
                    <p class="text-lg">{message.clone()}</p>
                </div>
            </div>
        </Show>
    }
}
