mod countdown;
mod dashboard;
mod latency;
mod login;

pub use countdown::{CountdownTimer, TICK_PERIOD};
pub use dashboard::DashboardView;
pub use latency::{FixedDelay, Latency, NoDelay};
pub use login::{
    submit, LoginState, LoginView, SharedLoginView, SubmitOutcome, SubmitRejected,
};

/// 页面路由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Dashboard => "/dashboard",
        }
    }
}
