use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::routes::ApiResponse;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        error!("请求处理失败: {}", self);
        HttpResponse::build(self.status_code()).json(ApiResponse::<()> {
            success: false,
            message: "服务器内部错误".to_string(),
            data: None,
        })
    }
}
