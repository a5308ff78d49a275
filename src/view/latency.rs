use async_trait::async_trait;
use std::time::Duration;

/// 模拟网络延迟
#[async_trait]
pub trait Latency: Send + Sync {
    async fn wait(&self);
}

pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Latency for FixedDelay {
    async fn wait(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

pub struct NoDelay;

#[async_trait]
impl Latency for NoDelay {
    async fn wait(&self) {}
}
