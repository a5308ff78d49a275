mod manager;
mod middleware;

pub use manager::{SessionManager, StoreBackend};
pub use middleware::{ClientId, SessionMiddleware, CLIENT_COOKIE};
