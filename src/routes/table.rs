use std::collections::{BTreeMap, HashSet};

use crate::menu::{ERROR_PAGE_IDS, MenuItem, flatten};

use super::{DEPENDENT_ROUTES, RouteConfig, RouteId};

/// 兜底路由的路径模式
pub const CATCH_ALL: &str = "*";

const NOT_FOUND_PATH: &str = "/404";
const SERVICE_UNAVAILABLE_PATH: &str = "/503";
const MAX_REDIRECTS: usize = 8;

/// 路由描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDescriptor {
    Page { path: String, route: RouteId },
    Redirect { path: String, to: String },
}

impl RouteDescriptor {
    fn page(path: impl Into<String>, route: RouteId) -> Self {
        Self::Page {
            path: path.into(),
            route,
        }
    }

    fn redirect(path: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Redirect {
            path: path.into(),
            to: to.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Page { path, .. } | Self::Redirect { path, .. } => path,
        }
    }

    /// 路径与重定向目标统一成 `match_path` 使用的形式
    fn normalized(self) -> Self {
        match self {
            Self::Page { path, route } => Self::Page {
                path: normalize_pattern(&path),
                route,
            },
            Self::Redirect { path, to } => Self::Redirect {
                path: normalize_pattern(&path),
                to: normalize(&to),
            },
        }
    }
}

/// 路径匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: RouteId,
    /// 跟随重定向之后的最终路径
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    fn not_found() -> Self {
        Self {
            route: RouteId::NotFound,
            path: NOT_FOUND_PATH.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// 有序路由表
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

/// 根据解析（及权限过滤）后的菜单构建路由表
///
/// 顺序：公开路由 → 主路由（深度优先）→ 依赖子路由 → 错误页 → `/` 重定向 → 兜底。
/// 没有路由配置的菜单项（如分组节点）直接跳过。
pub fn build_routes(items: &[MenuItem], config: &RouteConfig) -> RouteTable {
    let mut table = RouteTable::default();

    for target in config.public_routes() {
        table.push(RouteDescriptor::page(&target.path, target.route));
    }

    let flat = flatten(items);
    let present: HashSet<&str> = flat.iter().map(|item| item.id.as_str()).collect();

    let mut home = None;
    for item in &flat {
        if ERROR_PAGE_IDS.contains(&item.id.as_str()) {
            continue;
        }
        let Some(target) = config.get(&item.id) else {
            tracing::debug!(menu_id = %item.id, "menu item has no route");
            continue;
        };
        home.get_or_insert_with(|| target.path.clone());
        table.push(RouteDescriptor::page(&target.path, target.route));
    }

    for (parent, sub_routes) in DEPENDENT_ROUTES {
        if !present.contains(parent) {
            continue;
        }
        for (path, route) in *sub_routes {
            table.push(RouteDescriptor::page(*path, *route));
        }
    }

    table.push(RouteDescriptor::page(NOT_FOUND_PATH, RouteId::NotFound));
    table.push(RouteDescriptor::page(
        SERVICE_UNAVAILABLE_PATH,
        RouteId::ServiceUnavailable,
    ));
    table.push(RouteDescriptor::redirect(
        "/",
        home.unwrap_or_else(|| NOT_FOUND_PATH.to_string()),
    ));
    table.push(RouteDescriptor::redirect(CATCH_ALL, NOT_FOUND_PATH));

    tracing::debug!(routes = table.routes.len(), "route table built");
    table
}

impl RouteTable {
    fn push(&mut self, descriptor: RouteDescriptor) {
        let descriptor = descriptor.normalized();
        if self.routes.iter().any(|r| r.path() == descriptor.path()) {
            tracing::warn!(path = %descriptor.path(), "duplicate route path ignored");
            return;
        }
        self.routes.push(descriptor);
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn contains_path(&self, pattern: &str) -> bool {
        self.routes.iter().any(|r| r.path() == pattern)
    }

    /// 目标路由的注册路径（导航用）
    pub fn path_of(&self, route: RouteId) -> Option<&str> {
        self.routes.iter().find_map(|r| match r {
            RouteDescriptor::Page { path, route: page } if *page == route => Some(path.as_str()),
            _ => None,
        })
    }

    /// 把具体路径解析为页面
    ///
    /// 静态路径优先于带 `:param` 的路径；会跟随重定向，未匹配时落到 `/404`。
    pub fn match_path(&self, path: &str) -> RouteMatch {
        let mut current = normalize(path);

        for _ in 0..MAX_REDIRECTS {
            let Some((descriptor, params)) = self.find(&current) else {
                return RouteMatch::not_found();
            };
            match descriptor {
                RouteDescriptor::Page { route, .. } => {
                    return RouteMatch {
                        route: *route,
                        path: current,
                        params,
                    };
                }
                RouteDescriptor::Redirect { to, .. } => current = normalize(to),
            }
        }

        tracing::warn!(path = %path, "redirect limit reached");
        RouteMatch::not_found()
    }

    fn find(&self, path: &str) -> Option<(&RouteDescriptor, BTreeMap<String, String>)> {
        let segments = split(path);

        let exact = self
            .routes
            .iter()
            .find(|r| r.path() != CATCH_ALL && !r.path().contains(':') && r.path() == path);
        if let Some(descriptor) = exact {
            return Some((descriptor, BTreeMap::new()));
        }

        self.routes
            .iter()
            .filter(|r| r.path().contains(':'))
            .find_map(|r| capture(r.path(), &segments).map(|params| (r, params)))
            .or_else(|| {
                self.routes
                    .iter()
                    .find(|r| r.path() == CATCH_ALL)
                    .map(|r| (r, BTreeMap::new()))
            })
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn normalize_pattern(pattern: &str) -> String {
    if pattern == CATCH_ALL {
        pattern.to_string()
    } else {
        normalize(pattern)
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn capture(pattern: &str, segments: &[&str]) -> Option<BTreeMap<String, String>> {
    let parts = split(pattern);
    if parts.len() != segments.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    for (part, segment) in parts.iter().zip(segments) {
        match part.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), segment.to_string());
            }
            None if part == segment => {}
            None => return None,
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{MenuCatalog, StaticMenuSelection, parse_menu_selection, resolve_menu};
    use crate::permission::{Principal, filter_menu};

    fn small_catalog() -> MenuCatalog {
        MenuCatalog::new(vec![
            MenuItem::new("dashboard", "Dashboard", "/dashboard"),
            MenuItem::new("finance", "Finance", "/finance"),
            MenuItem::new("mail", "Mail", "/mail"),
            MenuItem::new("404", "Not Found", "/404").hidden(),
            MenuItem::new("503", "Service Unavailable", "/503").hidden(),
        ])
        .unwrap()
    }

    fn config() -> RouteConfig {
        RouteConfig::standard("/login")
    }

    #[tokio::test]
    async fn test_unselected_parent_has_no_sub_routes() {
        let catalog = small_catalog();
        let provider = StaticMenuSelection::ids(parse_menu_selection("dashboard\ninvalid-id\nfinance"));
        let resolved = resolve_menu(&catalog, &provider).await;
        let table = build_routes(&resolved.items, &config());

        assert!(table.contains_path("/dashboard"));
        assert!(table.contains_path("/finance"));
        assert!(!table.contains_path("/mail"));
        assert!(!table.contains_path("/mail/:folder"));
        assert!(!table.contains_path("/mail/compose"));

        let m = table.match_path("/mail/inbox/42");
        assert_eq!(m.route, RouteId::NotFound);
        assert_eq!(m.path, "/404");
    }

    #[test]
    fn test_table_order() {
        let items = MenuCatalog::standard().select(&HashSet::from(["mail", "tasks", "404", "503"]));
        let table = build_routes(&items, &config());
        let paths: Vec<&str> = table.routes().iter().map(RouteDescriptor::path).collect();
        assert_eq!(
            paths,
            vec![
                "/login",
                "/mail",
                "/tasks",
                "/mail/compose",
                "/mail/:folder",
                "/mail/:folder/:id",
                "/404",
                "/503",
                "/",
                "*",
            ]
        );
        assert_eq!(
            table.routes()[8],
            RouteDescriptor::redirect("/", "/mail")
        );
    }

    #[test]
    fn test_root_redirects_to_first_routable_item() {
        let table = build_routes(MenuCatalog::standard().items(), &config());
        let m = table.match_path("/");
        assert_eq!(m.route, RouteId::Dashboard);
        assert_eq!(m.path, "/dashboard");
    }

    #[test]
    fn test_root_redirects_to_not_found_when_nothing_routable() {
        let principal = Principal::new(["guest"], Vec::<String>::new());
        let items = filter_menu(
            &MenuCatalog::standard().select(&HashSet::from(["finance", "404", "503"])),
            &principal,
        );
        let table = build_routes(&items, &config());

        assert!(!table.contains_path("/finance"));
        assert!(table.contains_path("/404"));
        assert!(table.contains_path("/503"));
        assert_eq!(table.match_path("/").route, RouteId::NotFound);
        assert_eq!(table.match_path("/503").route, RouteId::ServiceUnavailable);
    }

    #[test]
    fn test_match_params_and_static_priority() {
        let table = build_routes(MenuCatalog::standard().items(), &config());

        assert_eq!(table.match_path("/inventory/add").route, RouteId::InventoryAdd);

        let m = table.match_path("/inventory/42/edit?tab=stock");
        assert_eq!(m.route, RouteId::InventoryEdit);
        assert_eq!(m.param("id"), Some("42"));

        let m = table.match_path("/mail/inbox/7/");
        assert_eq!(m.route, RouteId::MailDetail);
        assert_eq!(m.param("folder"), Some("inbox"));
        assert_eq!(m.param("id"), Some("7"));

        assert_eq!(
            table.match_path("/file-manager/file/abc").route,
            RouteId::FileDetail
        );
        assert_eq!(table.match_path("/iam/users").route, RouteId::Users);
        assert_eq!(table.match_path("/login").route, RouteId::Login);
        assert_eq!(table.match_path("/nope/at/all").route, RouteId::NotFound);
        assert_eq!(table.path_of(RouteId::Settings), Some("/settings"));
    }

    #[test]
    fn test_configured_paths_are_normalized() {
        let config = RouteConfig::from_entries([
            ("dashboard", "/dashboard/", "Dashboard"),
            ("tasks", "tasks", "Tasks"),
        ]);
        let table = build_routes(MenuCatalog::standard().items(), &config);

        assert!(table.contains_path("/dashboard"));
        assert!(!table.contains_path("/dashboard/"));
        assert!(table.contains_path("/tasks"));
        assert!(table.contains_path(CATCH_ALL));

        let m = table.match_path("/");
        assert_eq!(m.route, RouteId::Dashboard);
        assert_eq!(m.path, "/dashboard");
        assert_eq!(table.match_path("/dashboard/").route, RouteId::Dashboard);
        assert_eq!(table.match_path("/tasks").route, RouteId::Tasks);
    }

    #[test]
    fn test_unknown_component_never_breaks_build() {
        let config = RouteConfig::from_entries([
            ("dashboard", "/dashboard", "Dashboard"),
            ("tasks", "/tasks", "TaskBoardV2"),
        ]);
        let table = build_routes(MenuCatalog::standard().items(), &config);

        assert!(table.contains_path("/dashboard"));
        assert!(!table.contains_path("/tasks"));
        assert_eq!(table.match_path("/tasks").route, RouteId::NotFound);
    }
}
