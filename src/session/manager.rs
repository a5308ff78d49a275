use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::clock::Clock;
use crate::policy::LockoutPolicy;
use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError, LOCKOUT_END_KEY};
use crate::view::{
    CountdownTimer, DashboardView, LoginView, Route, SharedLoginView, SubmitOutcome, TICK_PERIOD,
};

/// 每个客户端的键值存储放在哪里
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory,
    /// 每个客户端一个 JSON 文件：<dir>/<client_id>.json
    JsonFiles(PathBuf),
}

impl StoreBackend {
    fn open(&self, client_id: &str) -> Arc<dyn KeyValueStore> {
        match self {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::JsonFiles(dir) => {
                Arc::new(JsonFileStore::new(dir.join(format!("{}.json", client_id))))
            }
        }
    }
}

struct ActiveLogin {
    view: SharedLoginView,
    timer: CountdownTimer,
}

struct Session {
    store: Arc<dyn KeyValueStore>,
    login: Option<ActiveLogin>,
    last_seen: DateTime<Utc>,
}

/// 客户端会话管理器：client id 对应该客户端的存储以及当前挂载的登录视图
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    backend: StoreBackend,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
    idle_ttl: Duration,
    tick_period: Duration,
}

impl SessionManager {
    pub fn new(backend: StoreBackend, clock: Arc<dyn Clock>, policy: LockoutPolicy) -> Self {
        info!("初始化会话管理器，存储后端: {:?}", backend);
        Self {
            sessions: Mutex::new(HashMap::new()),
            backend,
            clock,
            policy,
            idle_ttl: Duration::from_secs(24 * 60 * 60),
            tick_period: TICK_PERIOD,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 确认会话存在，返回 (client id, 是否新建)。
    ///
    /// 未知但格式合法的 id 会按原 id 重建，文件存储因此可以接回原来的数据。
    pub fn ensure(&self, client_id: Option<&str>) -> (String, bool) {
        let mut sessions = self.sessions();
        let now = Utc::now();

        if let Some(id) = client_id {
            if let Some(session) = sessions.get_mut(id) {
                session.last_seen = now;
                return (id.to_string(), false);
            }
            if Uuid::parse_str(id).is_ok() {
                debug!("重建会话: {}", id);
                sessions.insert(id.to_string(), self.new_session(id, now));
                return (id.to_string(), false);
            }
            warn!("无效的 client id: {}", id);
        }

        let id = Uuid::new_v4().to_string();
        sessions.insert(id.clone(), self.new_session(&id, now));
        info!("创建新会话: {}", id);
        (id, true)
    }

    fn new_session(&self, client_id: &str, now: DateTime<Utc>) -> Session {
        Session {
            store: self.backend.open(client_id),
            login: None,
            last_seen: now,
        }
    }

    /// 取得客户端的存储，会话不存在时按需创建
    pub fn store(&self, client_id: &str) -> Arc<dyn KeyValueStore> {
        let mut sessions = self.sessions();
        sessions
            .entry(client_id.to_string())
            .or_insert_with(|| self.new_session(client_id, Utc::now()))
            .store
            .clone()
    }

    /// 挂载一个新的登录视图，替换旧视图并停止其倒计时
    pub fn mount_login(&self, client_id: &str) -> Result<SharedLoginView, StorageError> {
        let mut sessions = self.sessions();
        let session = sessions
            .entry(client_id.to_string())
            .or_insert_with(|| self.new_session(client_id, Utc::now()));

        let view = LoginView::mount(session.store.clone(), self.clock.clone(), self.policy.clone())?;
        let locked = view.is_locked();
        let view = Arc::new(Mutex::new(view));

        let mut timer = CountdownTimer::new(self.tick_period);
        if locked {
            timer.start(view.clone());
        }
        // 旧的 ActiveLogin 在这里被 drop，其倒计时随之停止
        session.login = Some(ActiveLogin {
            view: view.clone(),
            timer,
        });
        debug!("会话 {} 挂载了新的登录视图", client_id);
        Ok(view)
    }

    /// 当前挂载的登录视图，没有时挂载一个
    pub fn login_view(&self, client_id: &str) -> Result<SharedLoginView, StorageError> {
        if let Some(view) = self.active_login(client_id) {
            return Ok(view);
        }
        self.mount_login(client_id)
    }

    pub fn active_login(&self, client_id: &str) -> Option<SharedLoginView> {
        self.sessions()
            .get(client_id)
            .and_then(|session| session.login.as_ref())
            .map(|login| login.view.clone())
    }

    /// 根据提交结果启动倒计时或卸载视图，返回下一步的路由
    pub fn after_submit(
        &self,
        client_id: &str,
        view: &SharedLoginView,
        outcome: SubmitOutcome,
    ) -> Route {
        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(client_id) else {
            return Route::Login;
        };
        let is_current = session
            .login
            .as_ref()
            .is_some_and(|login| Arc::ptr_eq(&login.view, view));
        if !is_current {
            debug!("会话 {} 的登录视图已被替换，忽略提交结果", client_id);
        }

        match outcome {
            SubmitOutcome::Authenticated => {
                if is_current {
                    session.login = None;
                }
                Route::Dashboard
            }
            SubmitOutcome::LockedOut => {
                if let Some(login) = session.login.as_mut().filter(|_| is_current) {
                    login.timer.start(view.clone());
                }
                Route::Login
            }
            SubmitOutcome::Failed | SubmitOutcome::Ignored(_) => Route::Login,
        }
    }

    /// 登出：清除锁定状态并卸载登录视图
    pub fn logout(&self, client_id: &str) -> Result<Route, StorageError> {
        let store = self.store(client_id);
        let route = DashboardView::new(store).logout()?;
        if let Some(session) = self.sessions().get_mut(client_id) {
            session.login = None;
        }
        Ok(route)
    }

    pub fn is_countdown_running(&self, client_id: &str) -> bool {
        self.sessions()
            .get(client_id)
            .and_then(|session| session.login.as_ref())
            .is_some_and(|login| login.timer.is_running())
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// 清理长时间未访问的会话。
    ///
    /// 锁定尚未结束的会话即使已空闲也保留，否则内存存储中的锁定会随会话一起丢失。
    pub fn cleanup_expired_sessions(&self) -> usize {
        debug!("清理过期的会话");
        let ttl = ChronoDuration::from_std(self.idle_ttl)
            .unwrap_or_else(|_| ChronoDuration::days(365 * 100));
        let now = Utc::now();
        let now_millis = self.clock.now_millis();
        let mut sessions = self.sessions();
        let before_count = sessions.len();
        sessions.retain(|id, session| {
            if now - session.last_seen <= ttl {
                return true;
            }
            let locked = lockout_pending(session.store.as_ref(), now_millis);
            if locked {
                debug!("会话 {} 仍处于锁定期，暂不清理", id);
            }
            locked
        });
        let removed = before_count - sessions.len();
        info!("清理了 {} 个过期的会话", removed);
        removed
    }
}

/// 存储中是否有尚未到期的锁定截止时间；读取或解析失败时按未锁定处理
fn lockout_pending(store: &dyn KeyValueStore, now_millis: i64) -> bool {
    match store.get(LOCKOUT_END_KEY) {
        Ok(Some(value)) => value.trim().parse::<i64>().is_ok_and(|end| end > now_millis),
        Ok(None) => false,
        Err(e) => {
            warn!("读取锁定截止时间失败: {}", e);
            false
        }
    }
}
