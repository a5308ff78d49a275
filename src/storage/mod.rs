use thiserror::Error;

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// 失败次数的存储键
pub const ATTEMPTS_KEY: &str = "loginAttempts";
/// 锁定截止时间（epoch 毫秒）的存储键
pub const LOCKOUT_END_KEY: &str = "lockoutEnd";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("读写存储文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储内容格式错误: {0}")]
    Format(#[from] serde_json::Error),
}

/// 客户端键值存储，语义与浏览器 localStorage 一致：值均为字符串，读写同步
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// 读取键值，不存在时返回 None
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 写入键值，覆盖旧值
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除键，键不存在时不报错
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// 同时删除失败次数与锁定截止时间
pub fn reset_lockout(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    store.remove(ATTEMPTS_KEY)?;
    store.remove(LOCKOUT_END_KEY)?;
    Ok(())
}
