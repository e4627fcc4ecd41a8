use std::collections::HashSet;

use crate::config::ClientConfig;
use crate::http::{HttpClient, HttpMethod, HttpRequest};

use super::catalog::{ERROR_PAGE_IDS, MenuCatalog};
use super::{MenuItem, flatten};

// =========================================================
// 配置提供者抽象
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MenuConfigError {
    #[error("menu configuration not found")]
    NotFound,
    #[error("menu configuration unavailable (HTTP {0})")]
    Unavailable(u16),
    #[error("menu configuration fetch failed: {0}")]
    Transport(String),
}

/// 动态菜单配置的提供者
///
/// 返回选中的菜单 ID 列表（未经目录校验）。
#[async_trait::async_trait(?Send)]
pub trait MenuSelectionProvider {
    async fn load_menu_selection(&self) -> Result<Vec<String>, MenuConfigError>;
}

/// 解析换行分隔的菜单 ID 列表：去空白、去空行
pub fn parse_menu_selection(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 通过 HTTP GET 获取带版本参数的纯文本配置文件
pub struct HttpMenuSelectionProvider<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpMenuSelectionProvider<C> {
    pub fn new(client: C, config: &ClientConfig) -> Self {
        Self {
            client,
            url: config.menu_config_url(),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl<C: HttpClient> MenuSelectionProvider for HttpMenuSelectionProvider<C> {
    async fn load_menu_selection(&self) -> Result<Vec<String>, MenuConfigError> {
        let req = HttpRequest::new(&self.url, HttpMethod::Get).with_header("Accept", "text/plain");
        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| MenuConfigError::Transport(e.to_string()))?;

        match resp.status {
            404 => Err(MenuConfigError::NotFound),
            s if (200..300).contains(&s) => Ok(parse_menu_selection(&resp.body)),
            s => Err(MenuConfigError::Unavailable(s)),
        }
    }
}

/// 固定的菜单选择（测试与嵌入场景）
#[derive(Debug, Clone)]
pub struct StaticMenuSelection(pub Result<Vec<String>, MenuConfigError>);

impl StaticMenuSelection {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Ok(ids.into_iter().map(Into::into).collect()))
    }

    pub fn failing(error: MenuConfigError) -> Self {
        Self(Err(error))
    }
}

#[async_trait::async_trait(?Send)]
impl MenuSelectionProvider for StaticMenuSelection {
    async fn load_menu_selection(&self) -> Result<Vec<String>, MenuConfigError> {
        self.0.clone()
    }
}

// =========================================================
// 解析结果
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMenu {
    pub items: Vec<MenuItem>,
    pub is_loading: bool,
    /// 非 404 的加载失败会记录在这里，但菜单仍回退到全量目录
    pub error: Option<MenuConfigError>,
}

impl ResolvedMenu {
    /// 配置加载完成之前的初始状态
    pub fn loading() -> Self {
        Self {
            items: Vec::new(),
            is_loading: true,
            error: None,
        }
    }

    fn ready(items: Vec<MenuItem>, error: Option<MenuConfigError>) -> Self {
        Self {
            items,
            is_loading: false,
            error,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        flatten(&self.items).iter().any(|item| item.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        flatten(&self.items)
            .into_iter()
            .map(|item| item.id.as_str())
            .collect()
    }
}

/// 解析生效的菜单集合
///
/// 只加载一次，不重试。任何失败都回退到全量目录（fail-open），
/// 错误页 ID 始终包含在结果中。
pub async fn resolve_menu<P>(catalog: &MenuCatalog, provider: &P) -> ResolvedMenu
where
    P: MenuSelectionProvider + ?Sized,
{
    let full_catalog = || catalog.items().to_vec();

    let selection = match provider.load_menu_selection().await {
        Ok(selection) => selection,
        Err(MenuConfigError::NotFound) => {
            tracing::info!("no menu configuration published, using full catalog");
            return ResolvedMenu::ready(with_error_pages(full_catalog()), None);
        }
        Err(e) => {
            tracing::warn!(error = %e, "menu configuration unavailable, using full catalog");
            return ResolvedMenu::ready(with_error_pages(full_catalog()), Some(e));
        }
    };

    let mut selected: HashSet<&str> = HashSet::new();
    for id in &selection {
        if catalog.contains(id) {
            selected.insert(id.as_str());
        } else {
            tracing::warn!(menu_id = %id, "ignoring unknown menu id in configuration");
        }
    }

    if selected.is_empty() {
        tracing::info!("menu configuration selects nothing valid, using full catalog");
        return ResolvedMenu::ready(with_error_pages(full_catalog()), None);
    }

    selected.extend(ERROR_PAGE_IDS);
    ResolvedMenu::ready(with_error_pages(catalog.select(&selected)), None)
}

/// 目录里缺少的错误页以隐藏菜单项补齐
fn with_error_pages(mut items: Vec<MenuItem>) -> Vec<MenuItem> {
    for id in ERROR_PAGE_IDS {
        if flatten(&items).iter().any(|item| item.id == id) {
            continue;
        }
        let name = match id {
            "503" => "Service Unavailable",
            _ => "Not Found",
        };
        tracing::debug!(menu_id = %id, "catalog has no error page entry, adding it");
        items.push(MenuItem::new(id, name, format!("/{id}")).hidden());
    }
    items
}
