use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use super::latency::Latency;
use crate::clock::Clock;
use crate::policy::{format_time, LockoutPolicy, MSG_WRONG_PASSWORD};
use crate::storage::{reset_lockout, KeyValueStore, StorageError, ATTEMPTS_KEY, LOCKOUT_END_KEY};

pub type SharedLoginView = Arc<Mutex<LoginView>>;

/// 提交被拒绝的原因，表单此时处于禁用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    Locked,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 账号密码正确，跳转到 dashboard
    Authenticated,
    /// 密码为空或错误，表单仍可用
    Failed,
    /// 本次失败触发锁定
    LockedOut,
    Ignored(SubmitRejected),
}

/// 登录页状态快照，供 /api/state 返回
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginState {
    pub username: String,
    pub is_loading: bool,
    pub error: Option<String>,
    pub attempts: u32,
    pub remaining_attempts: u32,
    pub is_locked: bool,
    pub lockout_end: Option<i64>,
    pub remaining_secs: u64,
    pub remaining_display: String,
}

/// 登录表单的状态机。
///
/// 失败次数与锁定截止时间以存储为准，内存中的字段只是本次挂载期间的副本；
/// 每次挂载都会重新从存储读取。
pub struct LoginView {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
    username: String,
    is_loading: bool,
    error: Option<String>,
    attempts: u32,
    is_locked: bool,
    lockout_end: Option<i64>,
    remaining_secs: u64,
}

impl LoginView {
    /// 挂载视图：读取存储中的失败次数和锁定截止时间
    pub fn mount(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        policy: LockoutPolicy,
    ) -> Result<Self, StorageError> {
        let stored_attempts = read_number::<u32>(store.as_ref(), ATTEMPTS_KEY)?;
        let stored_lockout_end = read_number::<i64>(store.as_ref(), LOCKOUT_END_KEY)?;

        let mut view = Self {
            store,
            clock,
            username: String::new(),
            is_loading: false,
            error: None,
            attempts: stored_attempts.unwrap_or(0).min(policy.max_attempts),
            is_locked: false,
            lockout_end: None,
            remaining_secs: 0,
            policy,
        };

        let now = view.clock.now_millis();
        match stored_lockout_end {
            Some(end) if now < end => {
                view.is_locked = true;
                view.lockout_end = Some(end);
                view.remaining_secs = ceil_secs(end - now);
                info!(
                    "账号处于锁定状态，剩余 {} 秒",
                    view.remaining_secs
                );
            }
            Some(_) => {
                info!("锁定已过期，重置失败次数");
                reset_lockout(view.store.as_ref())?;
                view.attempts = 0;
            }
            None if view.attempts >= view.policy.max_attempts => {
                // 失败次数已满却没有截止时间，视为过期的锁定
                warn!("失败次数已达上限但缺少锁定截止时间，重置失败次数");
                reset_lockout(view.store.as_ref())?;
                view.attempts = 0;
            }
            None => {}
        }

        debug!(
            "登录视图已挂载 - 失败次数: {}, 锁定: {}",
            view.attempts, view.is_locked
        );
        Ok(view)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn lockout_end(&self) -> Option<i64> {
        self.lockout_end
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn remaining_display(&self) -> String {
        format_time(self.remaining_secs)
    }

    pub fn snapshot(&self) -> LoginState {
        LoginState {
            username: self.username.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
            attempts: self.attempts,
            remaining_attempts: self.policy.remaining_attempts(self.attempts),
            is_locked: self.is_locked,
            lockout_end: self.lockout_end,
            remaining_secs: self.remaining_secs,
            remaining_display: self.remaining_display(),
        }
    }

    /// 倒计时走一步，返回视图是否仍处于锁定状态
    pub fn tick(&mut self) -> Result<bool, StorageError> {
        if !self.is_locked {
            return Ok(false);
        }
        if self.remaining_secs <= 1 {
            self.unlock()?;
            return Ok(false);
        }
        self.remaining_secs -= 1;
        Ok(true)
    }

    fn unlock(&mut self) -> Result<(), StorageError> {
        self.is_locked = false;
        self.lockout_end = None;
        self.attempts = 0;
        self.error = None;
        self.remaining_secs = 0;
        info!("锁定时间结束，表单已解锁");
        reset_lockout(self.store.as_ref())
    }

    /// 开始一次提交：锁定或已有请求在处理时直接忽略
    pub fn begin_submit(&mut self) -> Result<(), SubmitRejected> {
        if self.is_locked {
            debug!("表单已锁定，忽略提交");
            return Err(SubmitRejected::Locked);
        }
        if self.is_loading {
            debug!("已有提交正在处理，忽略提交");
            return Err(SubmitRejected::InFlight);
        }
        self.is_loading = true;
        self.error = None;
        Ok(())
    }

    /// 模拟延迟结束后校验账号密码
    pub fn complete_submit(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<SubmitOutcome, StorageError> {
        self.username = username.to_string();
        let result = self.evaluate(username, password);
        self.is_loading = false;
        result
    }

    fn evaluate(&mut self, username: &str, password: &str) -> Result<SubmitOutcome, StorageError> {
        if password.trim().is_empty() {
            warn!("用户 {} 提交了空密码", username);
            self.error = Some(MSG_WRONG_PASSWORD.to_string());
            return Ok(SubmitOutcome::Failed);
        }

        if self.policy.credentials_match(username, password) {
            info!("用户 {} 登录成功", username);
            reset_lockout(self.store.as_ref())?;
            self.attempts = 0;
            return Ok(SubmitOutcome::Authenticated);
        }

        // 先写存储，成功后再更新视图字段
        let attempts = (self.attempts + 1).min(self.policy.max_attempts);
        self.store.set(ATTEMPTS_KEY, &attempts.to_string())?;
        warn!("用户 {} 登录失败，当前失败次数: {}", username, attempts);

        if attempts >= self.policy.max_attempts {
            let lockout_end = self.clock.now_millis() + self.policy.lockout_millis();
            if let Err(e) = self.store.set(LOCKOUT_END_KEY, &lockout_end.to_string()) {
                // 回滚已写入的失败次数，避免存储中出现无截止时间的满次数
                if let Err(rollback) = self.store.set(ATTEMPTS_KEY, &self.attempts.to_string()) {
                    error!("回滚失败次数失败: {}", rollback);
                }
                return Err(e);
            }
            self.attempts = attempts;
            self.is_locked = true;
            self.lockout_end = Some(lockout_end);
            self.remaining_secs = self.policy.lockout_secs();
            self.error = Some(self.policy.lockout_message());
            warn!("登录失败次数过多，锁定至 {}", lockout_end);
            return Ok(SubmitOutcome::LockedOut);
        }

        self.attempts = attempts;
        self.error = Some(self.policy.remaining_attempts_message(self.attempts));
        Ok(SubmitOutcome::Failed)
    }
}

/// 完整的提交流程：开始、等待模拟延迟、校验。等待期间不持有锁。
pub async fn submit(
    view: &SharedLoginView,
    latency: &dyn Latency,
    username: &str,
    password: &str,
) -> Result<SubmitOutcome, StorageError> {
    {
        let mut guard = view.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(rejected) = guard.begin_submit() {
            return Ok(SubmitOutcome::Ignored(rejected));
        }
    }

    latency.wait().await;

    let mut guard = view.lock().unwrap_or_else(PoisonError::into_inner);
    guard.complete_submit(username, password).map_err(|e| {
        error!("保存登录状态失败: {}", e);
        e
    })
}

fn read_number<T: std::str::FromStr>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            warn!("存储键 {} 的值无法解析: {:?}", key, raw);
            Ok(None)
        }
    }
}

fn ceil_secs(millis: i64) -> u64 {
    (millis.max(0) as u64).div_ceil(1000)
}
