//! 菜单模块
//!
//! - `catalog`: 全量菜单目录（所有可能的导航项）
//! - `resolver`: 加载动态菜单配置并解析出生效的菜单集合

mod catalog;
mod resolver;

pub use catalog::{CatalogError, ERROR_PAGE_IDS, MenuCatalog};
pub use resolver::{
    HttpMenuSelectionProvider, MenuConfigError, MenuSelectionProvider, ResolvedMenu,
    StaticMenuSelection, parse_menu_selection, resolve_menu,
};

use serde::{Deserialize, Serialize};

use crate::permission::Requirement;

/// 导航菜单项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// 稳定的唯一键（在整个目录内唯一，包括嵌套子项）
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Requirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Requirement>,
    #[serde(default)]
    pub require_all_roles: bool,
    #[serde(default)]
    pub require_all_permissions: bool,
    /// true: 角色与权限都要满足；false: 满足已声明的任一类即可
    #[serde(default)]
    pub require_both: bool,
    /// 可路由但不在导航中显示（如错误页）
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            icon: None,
            roles: None,
            permissions: None,
            require_all_roles: false,
            require_all_permissions: false,
            require_both: false,
            hidden: false,
            children: Vec::new(),
        }
    }

    // --- Builders ---

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_roles(mut self, roles: impl Into<Requirement>) -> Self {
        self.roles = Some(roles.into());
        self
    }

    pub fn with_permissions(mut self, permissions: impl Into<Requirement>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    pub fn requiring_all_roles(mut self) -> Self {
        self.require_all_roles = true;
        self
    }

    pub fn requiring_all_permissions(mut self) -> Self {
        self.require_all_permissions = true;
        self
    }

    pub fn requiring_both(mut self) -> Self {
        self.require_both = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_children(mut self, children: Vec<MenuItem>) -> Self {
        self.children = children;
        self
    }

    /// 复制自身的字段，但替换子项（不复制原有子树）
    pub fn clone_with_children(&self, children: Vec<MenuItem>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
            icon: self.icon.clone(),
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
            require_all_roles: self.require_all_roles,
            require_all_permissions: self.require_all_permissions,
            require_both: self.require_both,
            hidden: self.hidden,
            children,
        }
    }
}

/// 深度优先遍历菜单树
pub fn flatten(items: &[MenuItem]) -> Vec<&MenuItem> {
    let mut out = Vec::new();
    fn walk<'a>(items: &'a [MenuItem], out: &mut Vec<&'a MenuItem>) {
        for item in items {
            out.push(item);
            walk(&item.children, out);
        }
    }
    walk(items, &mut out);
    out
}

/// 导航中可见的菜单项（去掉隐藏项）
pub fn visible(items: &[MenuItem]) -> Vec<MenuItem> {
    items
        .iter()
        .filter(|item| !item.hidden)
        .map(|item| item.clone_with_children(visible(&item.children)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_string_or_list_requirements() {
        let json = r#"[
            {"id":"invoices","name":"Invoices","path":"/invoices","roles":"admin",
             "permissions":["invoice_read","invoice_write"],"requireAllPermissions":true},
            {"id":"iam","name":"IAM","path":"/iam","children":[
                {"id":"users","name":"Users","path":"/iam/users"}
            ]}
        ]"#;
        let items: Vec<MenuItem> = serde_json::from_str(json).unwrap();

        assert_eq!(items[0].roles, Some(Requirement::One("admin".to_string())));
        assert_eq!(
            items[0].permissions.as_ref().map(Requirement::to_vec),
            Some(vec!["invoice_read".to_string(), "invoice_write".to_string()])
        );
        assert!(items[0].require_all_permissions);
        assert!(!items[0].require_both);
        assert_eq!(items[1].children[0].id, "users");
    }

    #[test]
    fn test_flatten_and_visible() {
        let items = vec![
            MenuItem::new("iam", "IAM", "/iam").with_children(vec![
                MenuItem::new("users", "Users", "/iam/users"),
                MenuItem::new("audit", "Audit", "/iam/audit").hidden(),
            ]),
            MenuItem::new("404", "Not Found", "/404").hidden(),
        ];

        let ids: Vec<&str> = flatten(&items).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["iam", "users", "audit", "404"]);

        let shown = visible(&items);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].children.len(), 1);
    }
}
