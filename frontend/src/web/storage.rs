//! LocalStorage 封装模块
//!
//! 使用 `web_sys::Storage` 访问浏览器本地存储，并实现核心库的
//! [`SessionStorage`] 特性，供会话持久化使用。

use backoffice::session::{SessionStorage, StorageError};

/// 浏览器 LocalStorage
#[derive(Debug, Clone, Copy, Default)]
pub struct WebStorage;

impl WebStorage {
    /// 获取 LocalStorage 实例
    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .ok_or_else(|| StorageError("无法获取 window 对象".to_string()))?
            .local_storage()
            .map_err(|e| StorageError(format!("{:?}", e)))?
            .ok_or_else(|| StorageError("LocalStorage 不可用".to_string()))
    }
}

impl SessionStorage for WebStorage {
    fn load(&self, key: &str) -> Option<String> {
        Self::storage().ok()?.get_item(key).ok()?
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError(format!("{:?}", e)))
    }
}
