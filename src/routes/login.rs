use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde::Deserialize;
use std::sync::PoisonError;

use super::{html, see_other, ApiResponse};
use crate::error::AppError;
use crate::pages::render_login;
use crate::session::ClientId;
use crate::view::{submit, LoginState, Route, SubmitOutcome};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET / ：每次访问都重新挂载登录视图
pub async fn login_page(
    data: web::Data<AppState>,
    client: ClientId,
) -> Result<HttpResponse, AppError> {
    debug!("渲染登录页 - client: {}", client.as_str());
    let view = data.sessions.mount_login(client.as_str())?;
    let page = {
        let view = view.lock().unwrap_or_else(PoisonError::into_inner);
        render_login(&view)
    };
    Ok(html(page))
}

/// POST / ：提交登录表单
pub async fn login_submit(
    data: web::Data<AppState>,
    client: ClientId,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    info!("收到登录请求 - client: {}", client.as_str());
    let view = data.sessions.login_view(client.as_str())?;

    let outcome = submit(
        &view,
        data.latency.as_ref(),
        &form.username,
        &form.password,
    )
    .await?;
    if let SubmitOutcome::Ignored(reason) = outcome {
        debug!("提交被忽略: {:?}", reason);
    }

    match data.sessions.after_submit(client.as_str(), &view, outcome) {
        Route::Dashboard => Ok(see_other(Route::Dashboard)),
        Route::Login => {
            let page = {
                let view = view.lock().unwrap_or_else(PoisonError::into_inner);
                render_login(&view)
            };
            Ok(html(page))
        }
    }
}

/// GET /api/state ：当前登录视图的状态，不会重新挂载已有视图
pub async fn login_state(
    data: web::Data<AppState>,
    client: ClientId,
) -> Result<HttpResponse, AppError> {
    let view = data.sessions.login_view(client.as_str())?;
    let state = view
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .snapshot();
    Ok(HttpResponse::Ok().json(ApiResponse::<LoginState> {
        success: true,
        message: String::new(),
        data: Some(state),
    }))
}
