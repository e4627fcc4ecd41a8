//! Back-office 导航与会话核心
//!
//! 与平台无关的业务核心，前端 (`frontend/`) 只负责把它接到浏览器上：
//! - `menu`: 菜单目录与动态菜单配置解析
//! - `permission`: 基于角色/权限的菜单过滤
//! - `routes`: 路由表构建与路径匹配
//! - `session`: 持久化的认证会话状态
//! - `http`: 带会话生命周期（401 刷新重试）的 HTTP 客户端
//! - `interceptor`: 全局查询/变更错误拦截

pub mod config;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod menu;
pub mod permission;
pub mod protocol;
pub mod routes;
pub mod session;

pub use config::{AuthMode, ClientConfig};
pub use error::{ErrorResponse, HttpError, RawError};
pub use http::{HttpClient, SessionClient};
pub use interceptor::{ErrorInterceptor, MessageCatalog, Presenter, QueryFailure, Sleep, Toast, ToastKind};
pub use menu::{MenuCatalog, MenuItem, ResolvedMenu, resolve_menu};
pub use permission::{Principal, filter_menu};
pub use routes::{RouteConfig, RouteId, RouteTable, build_routes};
pub use session::{Session, SessionStore};
