use actix_web::{
    cookie::{Cookie, SameSite},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorInternalServerError,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};
use std::rc::Rc;
use std::sync::Arc;

use super::SessionManager;

pub const CLIENT_COOKIE: &str = "sid";

/// 当前请求所属客户端的 id，由 SessionMiddleware 写入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for ClientId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<ClientId>() {
            Some(client) => ready(Ok(client.clone())),
            None => {
                warn!("请求缺少 client id，SessionMiddleware 未注册？");
                ready(Err(ErrorInternalServerError("会话未初始化")))
            }
        }
    }
}

/// 为每个请求确认客户端会话，必要时下发 sid cookie
#[derive(Clone)]
pub struct SessionMiddleware {
    sessions: Arc<SessionManager>,
}

impl SessionMiddleware {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    sessions: Arc<SessionManager>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let sessions = self.sessions.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let cookie_value = req.cookie(CLIENT_COOKIE).map(|c| c.value().to_string());
            let (client_id, created) = sessions.ensure(cookie_value.as_deref());
            let needs_cookie = created || cookie_value.as_deref() != Some(client_id.as_str());

            req.extensions_mut().insert(ClientId(client_id.clone()));

            let mut res = service.call(req).await?;

            if needs_cookie {
                debug!("下发 client id cookie: {}", client_id);
                let cookie = Cookie::build(CLIENT_COOKIE, client_id)
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .finish();
                if let Err(e) = res.response_mut().add_cookie(&cookie) {
                    warn!("写入 cookie 失败: {}", e);
                }
            }
            Ok(res)
        })
    }
}
