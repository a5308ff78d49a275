use std::time::Duration;

/// 内置测试账号
pub const MOCK_USERNAME: &str = "admin";
pub const MOCK_PASSWORD: &str = "123456";

pub const MAX_ATTEMPTS: u32 = 3;
pub const LOCKOUT_DURATION: Duration = Duration::from_secs(15 * 60);
pub const SUBMIT_DELAY: Duration = Duration::from_secs(1);

// 页面文案
pub const MSG_WRONG_PASSWORD: &str = "Senha incorreta";
pub const MSG_ACCOUNT_LOCKED: &str = "Conta bloqueada";
pub const MSG_LOADING: &str = "Entrando...";

/// 登录锁定策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout_duration: Duration,
    pub submit_delay: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            lockout_duration: LOCKOUT_DURATION,
            submit_delay: SUBMIT_DELAY,
        }
    }
}

impl LockoutPolicy {
    /// 用户名和密码必须与内置账号完全一致
    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        username == MOCK_USERNAME && password == MOCK_PASSWORD
    }

    pub fn lockout_millis(&self) -> i64 {
        self.lockout_duration.as_millis() as i64
    }

    pub fn lockout_secs(&self) -> u64 {
        self.lockout_duration.as_secs()
    }

    pub fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(attempts)
    }

    pub fn remaining_attempts_message(&self, attempts: u32) -> String {
        format!(
            "Senha incorreta. {} tentativa(s) restante(s).",
            self.remaining_attempts(attempts)
        )
    }

    pub fn lockout_message(&self) -> String {
        format!(
            "Muitas tentativas de login. Tente novamente em {} minutos.",
            self.lockout_duration.as_secs() / 60
        )
    }
}

/// 把剩余秒数格式化为 M:SS
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
