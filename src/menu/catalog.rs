use std::collections::HashSet;

use super::{MenuItem, flatten};

/// 错误页菜单 ID，始终包含在解析结果中
pub const ERROR_PAGE_IDS: [&str; 2] = ["404", "503"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate menu id `{0}` in catalog")]
    DuplicateId(String),
}

/// 全量菜单目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCatalog {
    items: Vec<MenuItem>,
}

impl MenuCatalog {
    /// 校验 ID 在整棵树内唯一
    pub fn new(items: Vec<MenuItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for item in flatten(&items) {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// 后台管理系统的标准目录
    pub fn standard() -> Self {
        Self {
            items: vec![
                MenuItem::new("dashboard", "Dashboard", "/dashboard").with_icon("layout-dashboard"),
                MenuItem::new("inventory", "Inventory", "/inventory")
                    .with_icon("package")
                    .with_permissions("inventory_read"),
                MenuItem::new("invoices", "Invoices", "/invoices")
                    .with_icon("receipt")
                    .with_roles(["admin", "accountant"])
                    .with_permissions("invoice_read"),
                MenuItem::new("mail", "Mail", "/mail").with_icon("mail"),
                MenuItem::new("file-manager", "File Manager", "/file-manager")
                    .with_icon("folder")
                    .with_permissions(["file_read"]),
                MenuItem::new("activity-log", "Activity Log", "/activity-log")
                    .with_icon("activity")
                    .with_roles("admin"),
                MenuItem::new("tasks", "Tasks", "/tasks").with_icon("check-square"),
                MenuItem::new("finance", "Finance", "/finance")
                    .with_icon("wallet")
                    .with_roles(["admin", "accountant"])
                    .with_permissions("finance_read")
                    .requiring_both(),
                MenuItem::new("iam", "IAM", "/iam")
                    .with_icon("shield")
                    .with_roles("admin")
                    .with_children(vec![
                        MenuItem::new("users", "Users", "/iam/users")
                            .with_icon("users")
                            .with_permissions("user_read"),
                        MenuItem::new("roles", "Roles", "/iam/roles")
                            .with_icon("key")
                            .with_permissions("role_read"),
                    ]),
                MenuItem::new("settings", "Settings", "/settings").with_icon("settings"),
                MenuItem::new("404", "Not Found", "/404").hidden(),
                MenuItem::new("503", "Service Unavailable", "/503").hidden(),
            ],
        }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn contains(&self, id: &str) -> bool {
        flatten(&self.items).iter().any(|item| item.id == id)
    }

    /// 所有 ID，深度优先顺序
    pub fn ids(&self) -> Vec<&str> {
        flatten(&self.items)
            .into_iter()
            .map(|item| item.id.as_str())
            .collect()
    }

    /// 按选中的 ID 集合裁剪目录
    ///
    /// 选中的节点保留整棵子树；未选中的父节点只在有选中的后代时保留，
    /// 且只保留通向选中后代的分支。
    pub fn select(&self, selected: &HashSet<&str>) -> Vec<MenuItem> {
        select_items(&self.items, selected)
    }
}

fn select_items(items: &[MenuItem], selected: &HashSet<&str>) -> Vec<MenuItem> {
    items
        .iter()
        .filter_map(|item| {
            if selected.contains(item.id.as_str()) {
                return Some(item.clone());
            }
            let children = select_items(&item.children, selected);
            (!children.is_empty()).then(|| item.clone_with_children(children))
        })
        .collect()
}
