use actix_files::Files;
use actix_web::{http::header, web, HttpResponse};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

mod dashboard;
mod login;

pub use dashboard::{dashboard_page, logout};
pub use login::{login_page, login_state, login_submit, LoginForm};

use crate::session::{SessionManager, SessionMiddleware};
use crate::view::Route;

/// JSON 接口的统一响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

/// 注册静态文件与页面路由。
///
/// 静态文件挂在会话中间件之外，请求 css/js 不会创建会话。
pub fn register(
    sessions: Arc<SessionManager>,
    static_dir: Option<PathBuf>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        if let Some(dir) = static_dir {
            cfg.service(Files::new("/static", dir));
        }
        cfg.service(
            web::scope("")
                .wrap(SessionMiddleware::new(sessions))
                .configure(configure),
        );
    }
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(login_page))
        .route("/", web::post().to(login_submit))
        .route("/dashboard", web::get().to(dashboard_page))
        .route("/logout", web::post().to(logout))
        .route("/api/state", web::get().to(login_state));
}

fn see_other(route: Route) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, route.path()))
        .finish()
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}
