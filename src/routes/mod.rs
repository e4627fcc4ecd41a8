//! 路由模块
//!
//! - `RouteId`: 应用中所有可渲染页面的封闭枚举（领域模型）
//! - `config`: 菜单 ID → 路径 + 页面 的映射
//! - `table`: 根据解析后的菜单构建路由表，并做路径匹配

mod config;
mod table;

pub use config::{DEPENDENT_ROUTES, RouteConfig, RouteTarget};
pub use table::{CATCH_ALL, RouteDescriptor, RouteMatch, RouteTable, build_routes};

use std::fmt::{self, Display};
use std::str::FromStr;

/// 应用页面枚举
///
/// 取代"组件名字符串 → 组件"的注册表：前端对该枚举做穷尽匹配，
/// 不存在引用了未知组件的路由。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    Login,
    Dashboard,
    Inventory,
    InventoryAdd,
    InventoryDetail,
    InventoryEdit,
    Invoices,
    InvoiceAdd,
    InvoiceDetail,
    InvoiceEdit,
    Mail,
    MailCompose,
    MailFolder,
    MailDetail,
    FileManager,
    FileManagerFolder,
    FileDetail,
    ActivityLog,
    Tasks,
    Finance,
    Users,
    Roles,
    Settings,
    NotFound,
    ServiceUnavailable,
}

impl RouteId {
    pub const ALL: [RouteId; 25] = [
        RouteId::Login,
        RouteId::Dashboard,
        RouteId::Inventory,
        RouteId::InventoryAdd,
        RouteId::InventoryDetail,
        RouteId::InventoryEdit,
        RouteId::Invoices,
        RouteId::InvoiceAdd,
        RouteId::InvoiceDetail,
        RouteId::InvoiceEdit,
        RouteId::Mail,
        RouteId::MailCompose,
        RouteId::MailFolder,
        RouteId::MailDetail,
        RouteId::FileManager,
        RouteId::FileManagerFolder,
        RouteId::FileDetail,
        RouteId::ActivityLog,
        RouteId::Tasks,
        RouteId::Finance,
        RouteId::Users,
        RouteId::Roles,
        RouteId::Settings,
        RouteId::NotFound,
        RouteId::ServiceUnavailable,
    ];

    /// 组件名（文本路由配置中使用）
    pub fn component_name(&self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Dashboard => "Dashboard",
            Self::Inventory => "Inventory",
            Self::InventoryAdd => "InventoryAdd",
            Self::InventoryDetail => "InventoryDetail",
            Self::InventoryEdit => "InventoryEdit",
            Self::Invoices => "Invoices",
            Self::InvoiceAdd => "InvoiceAdd",
            Self::InvoiceDetail => "InvoiceDetail",
            Self::InvoiceEdit => "InvoiceEdit",
            Self::Mail => "Mail",
            Self::MailCompose => "MailCompose",
            Self::MailFolder => "MailFolder",
            Self::MailDetail => "MailDetail",
            Self::FileManager => "FileManager",
            Self::FileManagerFolder => "FileManagerFolder",
            Self::FileDetail => "FileDetail",
            Self::ActivityLog => "ActivityLog",
            Self::Tasks => "Tasks",
            Self::Finance => "Finance",
            Self::Users => "Users",
            Self::Roles => "Roles",
            Self::Settings => "Settings",
            Self::NotFound => "NotFound",
            Self::ServiceUnavailable => "ServiceUnavailable",
        }
    }

    /// 页面标题
    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Sign in",
            Self::Dashboard => "Dashboard",
            Self::Inventory => "Inventory",
            Self::InventoryAdd => "Add inventory item",
            Self::InventoryDetail => "Inventory item",
            Self::InventoryEdit => "Edit inventory item",
            Self::Invoices => "Invoices",
            Self::InvoiceAdd => "New invoice",
            Self::InvoiceDetail => "Invoice",
            Self::InvoiceEdit => "Edit invoice",
            Self::Mail => "Mail",
            Self::MailCompose => "Compose",
            Self::MailFolder => "Mail folder",
            Self::MailDetail => "Message",
            Self::FileManager => "File manager",
            Self::FileManagerFolder => "Folder",
            Self::FileDetail => "File",
            Self::ActivityLog => "Activity log",
            Self::Tasks => "Tasks",
            Self::Finance => "Finance",
            Self::Users => "Users",
            Self::Roles => "Roles",
            Self::Settings => "Settings",
            Self::NotFound => "Page not found",
            Self::ServiceUnavailable => "Service unavailable",
        }
    }

    /// **守卫逻辑：该页面是否需要认证**
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Self::Login | Self::NotFound | Self::ServiceUnavailable
        )
    }

    /// 已认证用户是否应该离开此页面（如登录页）
    pub fn should_redirect_when_authenticated(&self) -> bool {
        matches!(self, Self::Login)
    }
}

impl Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.component_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown route component `{0}`")]
pub struct UnknownComponent(pub String);

impl FromStr for RouteId {
    type Err = UnknownComponent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        RouteId::ALL
            .into_iter()
            .find(|route| route.component_name() == name)
            .ok_or_else(|| UnknownComponent(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_names_round_trip() {
        for route in RouteId::ALL {
            assert_eq!(route.component_name().parse::<RouteId>(), Ok(route));
        }
        assert_eq!(
            "Reports".parse::<RouteId>(),
            Err(UnknownComponent("Reports".to_string()))
        );
    }

    #[test]
    fn test_guards() {
        assert!(!RouteId::Login.requires_auth());
        assert!(!RouteId::NotFound.requires_auth());
        assert!(RouteId::Dashboard.requires_auth());
        assert!(RouteId::Login.should_redirect_when_authenticated());
        assert!(!RouteId::Mail.should_redirect_when_authenticated());
    }
}
