use std::time::Duration;

use serde::{Deserialize, Serialize};

// =========================================================
// 默认值 (Defaults)
// =========================================================

/// 这些是默认值，如果构建环境中没有定义对应的变量，则使用这些值
const DEFAULT_API_BASE_URL: &str = "";
const DEFAULT_SERVICE_KEY: &str = "backoffice-web";
const DEFAULT_TOKEN_PATH: &str = "/oauth/token";
const DEFAULT_MENU_CONFIG_PATH: &str = "/config/menu-items.txt";
const DEFAULT_MENU_CONFIG_VERSION: &str = "1";
const DEFAULT_STORAGE_KEY: &str = "auth-storage";
const DEFAULT_OVERLAY_DELAY_MS: u64 = 1500;
const DEFAULT_LOGIN_PATH: &str = "/login";

/// 认证模式
///
/// `Cookie` 模式下凭据由浏览器 Cookie 携带；`Bearer` 模式下由客户端
/// 附加 `Authorization` 头。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Cookie,
    Bearer,
}

impl AuthMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cookie" => Some(Self::Cookie),
            "bearer" | "token" => Some(Self::Bearer),
            _ => None,
        }
    }
}

/// 客户端运行时配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// 静态服务标识，作为 `X-Service-Key` 头随每个请求发送
    pub service_key: String,
    pub auth_mode: AuthMode,
    pub token_path: String,
    pub client_id: Option<String>,
    pub menu_config_path: String,
    pub menu_config_version: String,
    /// 会话持久化使用的存储键
    pub storage_key: String,
    pub overlay_delay_ms: u64,
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            service_key: DEFAULT_SERVICE_KEY.to_string(),
            auth_mode: AuthMode::default(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            client_id: None,
            menu_config_path: DEFAULT_MENU_CONFIG_PATH.to_string(),
            menu_config_version: DEFAULT_MENU_CONFIG_VERSION.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            overlay_delay_ms: DEFAULT_OVERLAY_DELAY_MS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// 从变量查找函数构建配置
    ///
    /// 读取 `BACKOFFICE_*` 变量，读不到或无法解析时使用默认值。
    /// 前端传入基于 `option_env!` 的查找函数，测试可传入任意闭包。
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |name: &str, fallback: String| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };

        Self {
            api_base_url: read("BACKOFFICE_API_BASE_URL", defaults.api_base_url)
                .trim_end_matches('/')
                .to_string(),
            service_key: read("BACKOFFICE_SERVICE_KEY", defaults.service_key),
            auth_mode: lookup("BACKOFFICE_AUTH_MODE")
                .and_then(|v| AuthMode::parse(&v))
                .unwrap_or(defaults.auth_mode),
            token_path: read("BACKOFFICE_TOKEN_PATH", defaults.token_path),
            client_id: lookup("BACKOFFICE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            menu_config_path: read("BACKOFFICE_MENU_CONFIG_PATH", defaults.menu_config_path),
            menu_config_version: read(
                "BACKOFFICE_MENU_CONFIG_VERSION",
                defaults.menu_config_version,
            ),
            storage_key: read("BACKOFFICE_STORAGE_KEY", defaults.storage_key),
            overlay_delay_ms: lookup("BACKOFFICE_OVERLAY_DELAY_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.overlay_delay_ms),
            login_path: read("BACKOFFICE_LOGIN_PATH", defaults.login_path),
        }
    }

    pub fn overlay_delay(&self) -> Duration {
        Duration::from_millis(self.overlay_delay_ms)
    }

    /// 拼接 API 地址
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.api_base_url, path)
        } else {
            format!("{}/{}", self.api_base_url, path)
        }
    }

    /// 带版本参数的菜单配置地址
    pub fn menu_config_url(&self) -> String {
        format!(
            "{}?v={}",
            self.url(&self.menu_config_path),
            self.menu_config_version
        )
    }
}
