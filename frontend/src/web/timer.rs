//! 定时器封装模块
//!
//! 使用 `setTimeout` 实现一次性延时，供拦截器在显示遮罩后等待。

use std::time::Duration;

use backoffice::interceptor::Sleep;
use futures::channel::oneshot;
use wasm_bindgen::prelude::*;

/// 一次性定时器
///
/// 封装 `setTimeout` API。当 `Timeout` 在触发前被 drop 时，自动清除定时器。
pub struct Timeout {
    handle: Option<i32>,
    #[allow(dead_code)]
    closure: Closure<dyn FnMut()>,
}

impl Timeout {
    /// 创建定时器，窗口不可用时返回 `None`
    pub fn new<F>(millis: u32, callback: F) -> Option<Self>
    where
        F: FnOnce() + 'static,
    {
        let mut callback = Some(callback);
        let closure = Closure::<dyn FnMut()>::new(move || {
            if let Some(callback) = callback.take() {
                callback();
            }
        });

        let handle = web_sys::window()?
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                i32::try_from(millis).unwrap_or(i32::MAX),
            )
            .ok()?;

        Some(Self {
            handle: Some(handle),
            closure,
        })
    }

    pub fn cancel(&mut self) {
        if let (Some(handle), Some(window)) = (self.handle.take(), web_sys::window()) {
            window.clear_timeout_with_handle(handle);
        }
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// 基于 `setTimeout` 的延时实现
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutSleep;

#[async_trait::async_trait(?Send)]
impl Sleep for TimeoutSleep {
    async fn sleep(&self, duration: Duration) {
        let (tx, rx) = oneshot::channel::<()>();
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        let Some(_timer) = Timeout::new(millis, move || {
            let _ = tx.send(());
        }) else {
            tracing::warn!("setTimeout unavailable, skipping delay");
            return;
        };
        // 定时器在等待期间保持存活
        let _ = rx.await;
    }
}
