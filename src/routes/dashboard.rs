use actix_web::{web, HttpResponse};
use chrono::Local;
use log::info;

use super::{html, see_other};
use crate::error::AppError;
use crate::pages::render_dashboard;
use crate::session::ClientId;
use crate::AppState;

pub async fn dashboard_page() -> HttpResponse {
    html(render_dashboard(Local::now()))
}

/// POST /logout
pub async fn logout(data: web::Data<AppState>, client: ClientId) -> Result<HttpResponse, AppError> {
    info!("处理登出请求 - client: {}", client.as_str());
    let route = data.sessions.logout(client.as_str())?;
    Ok(see_other(route))
}
