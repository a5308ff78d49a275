use log::{debug, error, info};
use std::sync::PoisonError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::login::SharedLoginView;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// 锁定倒计时：按固定周期调用视图的 tick，由调用方显式启动和停止。
///
/// 视图解锁后任务自行结束；计时器被 drop 时任务也会被中止。
pub struct CountdownTimer {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    /// 启动倒计时，已有任务会先被停止。第一次 tick 在一个周期之后。
    pub fn start(&mut self, view: SharedLoginView) {
        self.stop();
        let period = self.period;
        debug!("启动锁定倒计时，周期 {:?}", period);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let still_locked = {
                    let mut view = view.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Err(e) = view.tick() {
                        error!("倒计时结束时清理存储失败: {}", e);
                    }
                    view.is_locked()
                };
                if !still_locked {
                    info!("锁定倒计时结束");
                    break;
                }
            }
        });
        self.handle = Some(handle);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!("停止锁定倒计时");
            }
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::policy::LockoutPolicy;
    use crate::storage::{KeyValueStore, MemoryStore, ATTEMPTS_KEY, LOCKOUT_END_KEY};
    use crate::view::login::LoginView;
    use std::sync::{Arc, Mutex};

    const T0: i64 = 1_700_000_000_000;

    fn locked_view(store: &Arc<MemoryStore>, remaining_millis: i64) -> SharedLoginView {
        store.set(ATTEMPTS_KEY, "3").unwrap();
        store
            .set(LOCKOUT_END_KEY, &(T0 + remaining_millis).to_string())
            .unwrap();
        let view = LoginView::mount(
            store.clone(),
            Arc::new(ManualClock::new(T0)),
            LockoutPolicy::default(),
        )
        .unwrap();
        assert!(view.is_locked());
        Arc::new(Mutex::new(view))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_unlocked_then_finishes() {
        let store = Arc::new(MemoryStore::new());
        let view = locked_view(&store, 3_000);

        let mut timer = CountdownTimer::new(TICK_PERIOD);
        timer.start(view.clone());
        assert!(timer.is_running());

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(timer.is_running());
        assert_eq!(view.lock().unwrap().remaining_secs(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!timer.is_running());
        let view = view.lock().unwrap();
        assert!(!view.is_locked());
        assert_eq!(view.attempts(), 0);
        assert_eq!(store.get(ATTEMPTS_KEY).unwrap(), None);
        assert_eq!(store.get(LOCKOUT_END_KEY).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_freezes_the_countdown() {
        let store = Arc::new(MemoryStore::new());
        let view = locked_view(&store, 10_000);

        let mut timer = CountdownTimer::new(TICK_PERIOD);
        timer.start(view.clone());
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(view.lock().unwrap().remaining_secs(), 8);

        timer.stop();
        assert!(!timer.is_running());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(view.lock().unwrap().remaining_secs(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_aborts_the_task() {
        let store = Arc::new(MemoryStore::new());
        let view = locked_view(&store, 60_000);

        {
            let mut timer = CountdownTimer::new(TICK_PERIOD);
            timer.start(view.clone());
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        let view = view.lock().unwrap();
        assert!(view.is_locked());
        assert_eq!(view.remaining_secs(), 60);
    }
}
