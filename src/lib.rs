pub mod clock;
pub mod config;
pub mod error;
pub mod logger;
pub mod pages;
pub mod policy;
pub mod routes;
pub mod session;
pub mod storage;
pub mod view;

use std::sync::Arc;

use clock::{Clock, SystemClock};
use config::AppConfig;
use session::{SessionManager, StoreBackend};
use view::{FixedDelay, Latency};

// 应用状态
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub latency: Arc<dyn Latency>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, latency: Arc<dyn Latency>) -> Self {
        Self { sessions, latency }
    }

    /// 按配置构建：系统时钟、固定延迟，STORAGE_DIR 决定存储后端
    pub fn from_config(config: &AppConfig) -> Self {
        let policy = config.policy();
        let backend = match &config.storage_dir {
            Some(dir) => StoreBackend::JsonFiles(dir.clone()),
            None => StoreBackend::Memory,
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let latency = Arc::new(FixedDelay::new(policy.submit_delay));
        let sessions = SessionManager::new(backend, clock, policy).with_idle_ttl(config.session_ttl());
        Self::new(Arc::new(sessions), latency)
    }
}
