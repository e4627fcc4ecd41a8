//! 认证会话模块
//!
//! 会话状态只由 [`SessionStore`] 的动作方法修改（login / set_access_token /
//! logout / reset），其余组件只读取快照。每次状态变化都会写入持久化存储。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::permission::Requirement;

/// 持久化格式版本
const PERSIST_VERSION: u32 = 0;

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 当前用户资料（由访问令牌的声明导出）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// 令牌对（供非 Cookie 认证模式使用的备用存储）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// 会话状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// 设置访问令牌时从其声明中解析出的组织 ID
    pub selected_org_id: Option<String>,
    pub tokens: Option<TokenBundle>,
}

impl Session {
    fn authenticated(access_token: String, refresh_token: String) -> Self {
        let claims = decode_claims(&access_token);
        Self {
            is_authenticated: true,
            user: claims.as_ref().and_then(AccessTokenClaims::profile),
            selected_org_id: claims.and_then(|c| c.org_id),
            tokens: Some(TokenBundle {
                access_token: access_token.clone(),
                refresh_token: Some(refresh_token.clone()),
            }),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
        }
    }
}

// =========================================================
// 访问令牌声明
// =========================================================

/// 访问令牌（JWT）中本模块关心的声明
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default, alias = "orgId", alias = "organization_id")]
    pub org_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Option<Requirement>,
    #[serde(default)]
    pub permissions: Option<Requirement>,
}

impl AccessTokenClaims {
    fn profile(&self) -> Option<UserProfile> {
        let id = self.sub.clone()?;
        Some(UserProfile {
            id,
            name: self.name.clone(),
            email: self.email.clone(),
            roles: self.roles.as_ref().map(Requirement::to_vec).unwrap_or_default(),
            permissions: self
                .permissions
                .as_ref()
                .map(Requirement::to_vec)
                .unwrap_or_default(),
        })
    }
}

/// 解码 JWT 载荷（不校验签名）
///
/// 令牌格式错误时返回 `None`，不会让调用方失败。
pub fn decode_claims(token: &str) -> Option<AccessTokenClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| tracing::debug!(error = %e, "access token payload is not base64url"))
        .ok()?;
    serde_json::from_slice(&bytes)
        .map_err(|e| tracing::debug!(error = %e, "access token payload is not a claims object"))
        .ok()
}

// =========================================================
// 持久化存储抽象
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("session storage error: {0}")]
pub struct StorageError(pub String);

/// 持久化存储特性
///
/// 以固定的键保存整个会话的序列化结果。
pub trait SessionStorage {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// 内存存储，克隆后共享同一份数据
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    state: Session,
    version: u32,
}

// =========================================================
// 会话存储
// =========================================================

type Listener = Rc<dyn Fn(&Session)>;

struct StoreInner {
    key: String,
    state: RefCell<Session>,
    storage: Box<dyn SessionStorage>,
    listeners: RefCell<Vec<(usize, Listener)>>,
    next_listener_id: RefCell<usize>,
}

/// 会话存储句柄
///
/// 单线程共享（`Rc`），克隆开销很小。所有修改同步完成。
#[derive(Clone)]
pub struct SessionStore {
    inner: Rc<StoreInner>,
}

impl SessionStore {
    /// 打开会话存储，并从持久化存储中恢复状态
    ///
    /// 持久化数据损坏或版本不匹配时从空会话开始。
    pub fn open(storage: impl SessionStorage + 'static, key: &str) -> Self {
        let restored = storage
            .load(key)
            .map(|raw| match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(persisted) if persisted.version == PERSIST_VERSION => Some(persisted.state),
                Ok(persisted) => {
                    tracing::warn!(version = persisted.version, "discarding persisted session");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "persisted session is corrupt, starting anonymous");
                    None
                }
            });

        let state = match restored {
            Some(Some(state)) => state,
            Some(None) => {
                if let Err(e) = storage.remove(key) {
                    tracing::error!(error = %e, "failed to drop unusable session blob");
                }
                Session::default()
            }
            None => Session::default(),
        };

        Self {
            inner: Rc::new(StoreInner {
                key: key.to_string(),
                state: RefCell::new(state),
                storage: Box::new(storage),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: RefCell::new(0),
            }),
        }
    }

    /// 只读快照
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().refresh_token.clone()
    }

    /// Anonymous → Authenticated
    pub fn login(&self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        let next = Session::authenticated(access_token.into(), refresh_token.into());
        tracing::info!(org_id = ?next.selected_org_id, "session authenticated");
        self.mutate(|state| *state = next);
    }

    /// 令牌轮换：重新解析声明，不改变刷新令牌和认证标志
    pub fn set_access_token(&self, access_token: impl Into<String>) {
        let access_token = access_token.into();
        let claims = decode_claims(&access_token);
        self.mutate(|state| {
            state.selected_org_id = claims.as_ref().and_then(|c| c.org_id.clone());
            if let Some(profile) = claims.as_ref().and_then(AccessTokenClaims::profile) {
                state.user = Some(profile);
            }
            state.tokens = Some(TokenBundle {
                access_token: access_token.clone(),
                refresh_token: state.refresh_token.clone(),
            });
            state.access_token = Some(access_token);
        });
    }

    /// Authenticated → Anonymous
    pub fn logout(&self) {
        tracing::info!("session cleared");
        self.reset();
    }

    /// 恢复到初始空状态，重复调用无副作用
    pub fn reset(&self) {
        self.mutate(|state| *state = Session::default());
    }

    /// 订阅会话变化，返回用于取消订阅的 ID
    pub fn subscribe(&self, listener: impl Fn(&Session) + 'static) -> usize {
        let mut next = self.inner.next_listener_id.borrow_mut();
        let id = *next;
        *next += 1;
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: usize) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn mutate(&self, apply: impl FnOnce(&mut Session)) {
        let snapshot = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.clone();
            apply(&mut state);
            if *state == before {
                return;
            }
            state.clone()
        };

        self.persist(&snapshot);

        // 先释放借用再通知，监听器可以安全地读取快照
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn persist(&self, state: &Session) {
        let persisted = PersistedSession {
            state: state.clone(),
            version: PERSIST_VERSION,
        };
        let result = serde_json::to_string(&persisted)
            .map_err(|e| StorageError(e.to_string()))
            .and_then(|raw| self.inner.storage.save(&self.inner.key, &raw));
        if let Err(e) = result {
            tracing::error!(error = %e, key = %self.inner.key, "failed to persist session");
        }
    }
}

/// 构造未签名的测试令牌
#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}
