use log::LevelFilter;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::policy::{LockoutPolicy, LOCKOUT_DURATION, MAX_ATTEMPTS, SUBMIT_DELAY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {key} 的值无效: {value}")]
    Parse { key: &'static str, value: String },

    #[error("配置校验失败: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// 应用配置，来自环境变量（启动时先加载 .env）
#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    pub log_dir: PathBuf,
    pub log_level: LevelFilter,
    pub static_dir: PathBuf,
    /// 设置后每个客户端的存储落盘到该目录，否则只保存在内存
    pub storage_dir: Option<PathBuf>,
    #[validate(range(min = 1))]
    pub session_ttl_secs: u64,
    #[validate(range(min = 1))]
    pub cleanup_interval_secs: u64,
    #[validate(range(max = 60_000))]
    pub submit_delay_ms: u64,
    #[validate(range(min = 1, max = 1440))]
    pub lockout_minutes: u64,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_dir: PathBuf::from("logs"),
            log_level: LevelFilter::Debug,
            static_dir: PathBuf::from("static"),
            storage_dir: None,
            session_ttl_secs: 24 * 60 * 60,
            cleanup_interval_secs: 10 * 60,
            submit_delay_ms: SUBMIT_DELAY.as_millis() as u64,
            lockout_minutes: LOCKOUT_DURATION.as_secs() / 60,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置，未设置的项使用默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: lookup("APP_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "APP_PORT", defaults.port)?,
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            log_level: parse_or(&lookup, "LOG_LEVEL", defaults.log_level)?,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            storage_dir: lookup("STORAGE_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            session_ttl_secs: parse_or(&lookup, "SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            cleanup_interval_secs: parse_or(
                &lookup,
                "CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
            )?,
            submit_delay_ms: parse_or(&lookup, "SUBMIT_DELAY_MS", defaults.submit_delay_ms)?,
            lockout_minutes: parse_or(&lookup, "LOCKOUT_MINUTES", defaults.lockout_minutes)?,
            max_attempts: parse_or(&lookup, "MAX_ATTEMPTS", defaults.max_attempts)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_attempts: self.max_attempts,
            lockout_duration: Duration::from_secs(self.lockout_minutes * 60),
            submit_delay: Duration::from_millis(self.submit_delay_ms),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Parse { key, value }),
        None => Ok(default),
    }
}
