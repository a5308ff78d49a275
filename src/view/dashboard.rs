use log::info;
use std::sync::Arc;

use super::Route;
use crate::storage::{reset_lockout, KeyValueStore, StorageError};

pub struct DashboardView {
    store: Arc<dyn KeyValueStore>,
}

impl DashboardView {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 登出：清除失败次数与锁定时间后回到登录页
    pub fn logout(&self) -> Result<Route, StorageError> {
        reset_lockout(self.store.as_ref())?;
        info!("用户登出成功");
        Ok(Route::Login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ATTEMPTS_KEY, LOCKOUT_END_KEY};

    #[test]
    fn logout_resets_and_returns_to_login() {
        let store = Arc::new(MemoryStore::new());
        store.set(ATTEMPTS_KEY, "2").unwrap();
        store.set(LOCKOUT_END_KEY, "1").unwrap();

        let route = DashboardView::new(store.clone()).logout().unwrap();

        assert_eq!(route, Route::Login);
        assert_eq!(route.path(), "/");
        assert_eq!(store.get(ATTEMPTS_KEY).unwrap(), None);
        assert_eq!(store.get(LOCKOUT_END_KEY).unwrap(), None);
    }
}
