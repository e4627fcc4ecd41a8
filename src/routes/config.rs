use std::collections::HashMap;

use crate::menu::MenuCatalog;

use super::RouteId;

/// 路由目标：路径 + 页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub path: String,
    pub route: RouteId,
}

impl RouteTarget {
    pub fn new(path: impl Into<String>, route: RouteId) -> Self {
        Self {
            path: path.into(),
            route,
        }
    }
}

/// 依赖父功能的子路由
///
/// 只有父菜单 ID 出现在解析结果中时才注册。同一父项下静态路径排在参数路径之前。
pub const DEPENDENT_ROUTES: &[(&str, &[(&str, RouteId)])] = &[
    (
        "inventory",
        &[
            ("/inventory/add", RouteId::InventoryAdd),
            ("/inventory/:id", RouteId::InventoryDetail),
            ("/inventory/:id/edit", RouteId::InventoryEdit),
        ],
    ),
    (
        "mail",
        &[
            ("/mail/compose", RouteId::MailCompose),
            ("/mail/:folder", RouteId::MailFolder),
            ("/mail/:folder/:id", RouteId::MailDetail),
        ],
    ),
    (
        "invoices",
        &[
            ("/invoices/add", RouteId::InvoiceAdd),
            ("/invoices/:id", RouteId::InvoiceDetail),
            ("/invoices/:id/edit", RouteId::InvoiceEdit),
        ],
    ),
    (
        "file-manager",
        &[
            ("/file-manager/folder/:id", RouteId::FileManagerFolder),
            ("/file-manager/file/:id", RouteId::FileDetail),
        ],
    ),
];

/// 菜单 ID → 路由目标
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteConfig {
    entries: HashMap<String, RouteTarget>,
    /// 不依赖菜单的公开路由（如登录页）
    public: Vec<RouteTarget>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标准路由配置，与 [`MenuCatalog::standard`] 对应
    pub fn standard(login_path: &str) -> Self {
        let mut config = Self::new()
            .with_public(login_path, RouteId::Login)
            .with_entry("dashboard", "/dashboard", RouteId::Dashboard)
            .with_entry("inventory", "/inventory", RouteId::Inventory)
            .with_entry("invoices", "/invoices", RouteId::Invoices)
            .with_entry("mail", "/mail", RouteId::Mail)
            .with_entry("file-manager", "/file-manager", RouteId::FileManager)
            .with_entry("activity-log", "/activity-log", RouteId::ActivityLog)
            .with_entry("tasks", "/tasks", RouteId::Tasks)
            .with_entry("finance", "/finance", RouteId::Finance)
            .with_entry("users", "/iam/users", RouteId::Users)
            .with_entry("roles", "/iam/roles", RouteId::Roles)
            .with_entry("settings", "/settings", RouteId::Settings);
        config.insert("404", RouteTarget::new("/404", RouteId::NotFound));
        config.insert("503", RouteTarget::new("/503", RouteId::ServiceUnavailable));
        config
    }

    /// 从文本配置构建：未知组件名会被跳过并记录日志，不会让构建失败
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut config = Self::new();
        for (menu_id, path, component) in entries {
            match component.parse::<RouteId>() {
                Ok(route) => config.insert(menu_id, RouteTarget::new(path, route)),
                Err(e) => {
                    tracing::warn!(menu_id = %menu_id, error = %e, "skipping route with unknown component");
                }
            }
        }
        config
    }

    pub fn with_entry(mut self, menu_id: &str, path: &str, route: RouteId) -> Self {
        self.insert(menu_id, RouteTarget::new(path, route));
        self
    }

    pub fn with_public(mut self, path: &str, route: RouteId) -> Self {
        self.public.push(RouteTarget::new(path, route));
        self
    }

    pub fn insert(&mut self, menu_id: &str, target: RouteTarget) {
        self.entries.insert(menu_id.to_string(), target);
    }

    pub fn get(&self, menu_id: &str) -> Option<&RouteTarget> {
        self.entries.get(menu_id)
    }

    pub fn public_routes(&self) -> &[RouteTarget] {
        &self.public
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 去掉目录中不存在的菜单 ID（记录日志，不报错）
    pub fn validate_against(mut self, catalog: &MenuCatalog) -> Self {
        self.entries.retain(|menu_id, _| {
            let known = catalog.contains(menu_id);
            if !known {
                tracing::warn!(menu_id = %menu_id, "route config references unknown menu id");
            }
            known
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config_matches_catalog() {
        let catalog = MenuCatalog::standard();
        let config = RouteConfig::standard("/login");
        let validated = config.clone().validate_against(&catalog);
        assert_eq!(validated, config);
        assert_eq!(config.public_routes()[0].route, RouteId::Login);
        // 分组节点本身不可路由
        assert!(config.get("iam").is_none());
    }

    #[test]
    fn test_from_entries_skips_unknown_components() {
        let config = RouteConfig::from_entries([
            ("dashboard", "/dashboard", "Dashboard"),
            ("reports", "/reports", "ReportsPage"),
            ("mail", "/mail", " Mail "),
        ]);
        assert_eq!(config.len(), 2);
        assert!(config.get("reports").is_none());
        assert_eq!(config.get("mail").map(|t| t.route), Some(RouteId::Mail));
    }

    #[test]
    fn test_validate_against_drops_unknown_menu_ids() {
        let config = RouteConfig::new()
            .with_entry("dashboard", "/dashboard", RouteId::Dashboard)
            .with_entry("ghost", "/ghost", RouteId::Settings)
            .validate_against(&MenuCatalog::standard());
        assert_eq!(config.len(), 1);
        assert!(!config.is_empty());
        assert!(config.get("ghost").is_none());
    }
}
