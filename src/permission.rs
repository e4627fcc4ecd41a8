//! 权限过滤模块
//!
//! 纯函数：根据当前主体的角色集合与权限集合裁剪菜单树，返回新树，不修改输入。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::menu::MenuItem;
use crate::session::{Session, UserProfile};

/// 角色或权限要求，可以是单个字符串，也可以是列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    One(String),
    Many(Vec<String>),
}

impl Requirement {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Requirement::One(value) => std::slice::from_ref(value),
            Requirement::Many(values) => values,
        };
        slice.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// 全部满足 (AND) 或任一满足 (OR)
    fn satisfied_by(&self, granted: &BTreeSet<String>, require_all: bool) -> bool {
        if require_all {
            self.iter().all(|r| granted.contains(r))
        } else {
            self.iter().any(|r| granted.contains(r))
        }
    }
}

impl From<&str> for Requirement {
    fn from(value: &str) -> Self {
        Requirement::One(value.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for Requirement {
    fn from(values: [&str; N]) -> Self {
        Requirement::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

/// 当前主体：角色集合与权限集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl Principal {
    pub fn new<R, P>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_user(user: &UserProfile) -> Self {
        Self::new(user.roles.iter().cloned(), user.permissions.iter().cloned())
    }

    pub fn from_session(session: &Session) -> Self {
        match (&session.user, session.is_authenticated) {
            (Some(user), true) => Self::from_user(user),
            _ => Self::anonymous(),
        }
    }
}

/// 单个菜单项的访问判定（不考虑子项）
pub fn has_access(item: &MenuItem, principal: &Principal) -> bool {
    let roles = item.roles.as_ref().filter(|r| !r.is_empty());
    let permissions = item.permissions.as_ref().filter(|p| !p.is_empty());

    let has_roles = roles.map(|r| r.satisfied_by(&principal.roles, item.require_all_roles));
    let has_perms = permissions.map(|p| {
        p.satisfied_by(&principal.permissions, item.require_all_permissions)
    });

    match (has_roles, has_perms) {
        (None, None) => true,
        (Some(r), Some(p)) if item.require_both => r && p,
        (Some(r), Some(p)) => r || p,
        // 只声明了一类要求时，OR / AND 都只看这一类
        (Some(only), None) | (None, Some(only)) => only,
    }
}

/// 递归过滤菜单树（后序）
///
/// 节点保留的条件：自身有访问权限，且没有声明子项或至少一个子项保留下来。
/// 输出保持输入顺序。
pub fn filter_menu(items: &[MenuItem], principal: &Principal) -> Vec<MenuItem> {
    items
        .iter()
        .filter_map(|item| filter_item(item, principal))
        .collect()
}

fn filter_item(item: &MenuItem, principal: &Principal) -> Option<MenuItem> {
    let children = filter_menu(&item.children, principal);

    if !has_access(item, principal) {
        return None;
    }
    if !item.children.is_empty() && children.is_empty() {
        tracing::debug!(menu_id = %item.id, "dropping menu group with no accessible children");
        return None;
    }
    Some(item.clone_with_children(children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_no_requirements_grants_access() {
        let item = MenuItem::new("dashboard", "Dashboard", "/dashboard");
        assert!(has_access(&item, &Principal::anonymous()));
    }

    #[test]
    fn test_require_both() {
        let item = MenuItem::new("finance", "Finance", "/finance")
            .with_roles(["admin"])
            .with_permissions(["finance_read"])
            .requiring_both();

        let role_only = Principal::new(["admin"], Vec::<String>::new());
        assert!(!has_access(&item, &role_only));

        let both = Principal::new(["admin"], ["finance_read"]);
        assert!(has_access(&item, &both));
    }

    #[test]
    fn test_either_roles_or_permissions() {
        let item = MenuItem::new("invoices", "Invoices", "/invoices")
            .with_roles(["admin"])
            .with_permissions(["invoice_read"]);

        assert!(has_access(&item, &Principal::new(["admin"], Vec::<String>::new())));
        assert!(has_access(&item, &Principal::new(["user"], ["invoice_read"])));
        assert!(!has_access(
            &item,
            &Principal::new(["user"], Vec::<String>::new())
        ));
    }

    #[test]
    fn test_single_declared_requirement_is_not_bypassed() {
        let item = MenuItem::new("activity-log", "Activity", "/activity-log").with_roles("admin");
        assert!(!has_access(&item, &Principal::new(["user"], ["anything"])));
        assert!(has_access(&item, &Principal::new(["admin"], Vec::<String>::new())));
    }

    #[test]
    fn test_require_all_roles_and_permissions() {
        let item = MenuItem::new("iam", "IAM", "/iam")
            .with_roles(["admin", "security"])
            .requiring_all_roles();
        assert!(!has_access(&item, &Principal::new(["admin"], Vec::<String>::new())));
        assert!(has_access(
            &item,
            &Principal::new(["admin", "security"], Vec::<String>::new())
        ));

        let item = MenuItem::new("users", "Users", "/iam/users")
            .with_permissions(["user_read", "user_write"])
            .requiring_all_permissions();
        assert!(!has_access(&item, &Principal::new(Vec::<String>::new(), ["user_read"])));
    }

    #[test]
    fn test_parent_dropped_when_all_children_filtered() {
        let menu = vec![
            MenuItem::new("dashboard", "Dashboard", "/dashboard"),
            MenuItem::new("iam", "IAM", "/iam").with_children(vec![
                MenuItem::new("users", "Users", "/iam/users").with_permissions("user_read"),
                MenuItem::new("roles", "Roles", "/iam/roles").with_permissions("role_read"),
            ]),
        ];

        let filtered = filter_menu(&menu, &Principal::anonymous());
        assert_eq!(ids(&filtered), vec!["dashboard"]);

        let filtered = filter_menu(&menu, &Principal::new(Vec::<String>::new(), ["role_read"]));
        assert_eq!(ids(&filtered), vec!["dashboard", "iam"]);
        assert_eq!(ids(&filtered[1].children), vec!["roles"]);
        // 输入不被修改
        assert_eq!(menu[1].children.len(), 2);
    }

    #[test]
    fn test_principal_from_session() {
        let session = Session {
            is_authenticated: true,
            user: Some(UserProfile {
                id: "u1".to_string(),
                roles: vec!["admin".to_string()],
                permissions: vec!["invoice_read".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let principal = Principal::from_session(&session);
        assert!(principal.roles.contains("admin"));
        assert!(principal.permissions.contains("invoice_read"));

        assert_eq!(
            Principal::from_session(&Session::default()),
            Principal::anonymous()
        );
    }

    // =========================================================
    // 属性测试
    // =========================================================

    static ROLES: [&str; 3] = ["admin", "user", "auditor"];
    static PERMISSIONS: [&str; 2] = ["read", "write"];

    fn arb_requirement(pool: &'static [&'static str]) -> impl Strategy<Value = Option<Requirement>> + Clone {
        prop_oneof![
            Just(None),
            prop::sample::select(pool).prop_map(|r| Some(Requirement::from(r))),
            prop::sample::subsequence(pool, 0..=pool.len())
                .prop_map(|rs| Some(Requirement::Many(rs.iter().map(|r| r.to_string()).collect()))),
        ]
    }

    fn arb_menu() -> impl Strategy<Value = Vec<MenuItem>> {
        let node = (
            "[a-z]{1,6}",
            arb_requirement(&ROLES),
            arb_requirement(&PERMISSIONS),
            any::<(bool, bool, bool)>(),
        )
            .prop_map(|(id, roles, permissions, (all_roles, all_perms, both))| {
                let mut item = MenuItem::new(&id, &id, &format!("/{}", id));
                item.roles = roles;
                item.permissions = permissions;
                item.require_all_roles = all_roles;
                item.require_all_permissions = all_perms;
                item.require_both = both;
                item
            });

        let tree = node.clone().prop_recursive(3, 32, 4, move |inner| {
            (node.clone(), prop::collection::vec(inner, 0..4))
                .prop_map(|(item, children)| item.with_children(children))
        });
        prop::collection::vec(tree, 0..5)
    }

    fn assert_all_accessible(items: &[MenuItem], principal: &Principal) {
        for item in items {
            assert!(has_access(item, principal));
            assert_all_accessible(&item.children, principal);
        }
    }

    proptest! {
        #[test]
        fn prop_superuser_sees_everything(menu in arb_menu()) {
            let superuser = Principal::new(ROLES, PERMISSIONS);
            prop_assert_eq!(filter_menu(&menu, &superuser), menu);
        }

        #[test]
        fn prop_filter_is_idempotent_and_sound(
            menu in arb_menu(),
            roles in prop::sample::subsequence(ROLES.to_vec(), 0..=3),
            perms in prop::sample::subsequence(PERMISSIONS.to_vec(), 0..=2),
        ) {
            let principal = Principal::new(roles, perms);
            let once = filter_menu(&menu, &principal);
            assert_all_accessible(&once, &principal);
            prop_assert_eq!(filter_menu(&once, &principal), once);
        }
    }
}
