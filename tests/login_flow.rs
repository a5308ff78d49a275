use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::ServiceResponse,
    http::{header, StatusCode},
    test, web, App,
};
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use login_lockout::clock::SystemClock;
use login_lockout::policy::LockoutPolicy;
use login_lockout::routes;
use login_lockout::session::{SessionManager, StoreBackend, CLIENT_COOKIE};
use login_lockout::view::{FixedDelay, TICK_PERIOD};
use login_lockout::AppState;

const VALID_USERNAME: &str = "admin";
const VALID_PASSWORD: &str = "123456";
const INVALID_PASSWORD: &str = "senha_errada";

fn state_with(policy: LockoutPolicy, tick_period: Duration) -> web::Data<AppState> {
    let delay = policy.submit_delay;
    let sessions = SessionManager::new(StoreBackend::Memory, Arc::new(SystemClock), policy)
        .with_tick_period(tick_period);
    web::Data::new(AppState::new(Arc::new(sessions), Arc::new(FixedDelay::new(delay))))
}

fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

fn state(delay: Duration) -> web::Data<AppState> {
    state_with(
        LockoutPolicy {
            submit_delay: delay,
            ..LockoutPolicy::default()
        },
        TICK_PERIOD,
    )
}

macro_rules! spawn_app {
    ($state:expr) => {{
        let state: web::Data<AppState> = $state;
        test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::register(state.sessions.clone(), Some(static_dir()))),
        )
        .await
    }};
}

/// 请求页面，记录 cookie 与当前地址
macro_rules! visit {
    ($app:expr, $browser:expr, $path:expr) => {{
        let path: &str = $path;
        let req = $browser.attach(test::TestRequest::get().uri(path));
        let resp = test::call_service(&$app, req.to_request()).await;
        $browser.absorb(resp, path).await
    }};
}

/// 提交登录表单，遇到重定向时跟随
macro_rules! submit {
    ($app:expr, $browser:expr, $username:expr, $password:expr) => {{
        let req = $browser.attach(
            test::TestRequest::post()
                .uri("/")
                .set_form([("username", $username), ("password", $password)]),
        );
        let resp = test::call_service(&$app, req.to_request()).await;
        let page = $browser.absorb(resp, "/").await;
        match page.location.clone() {
            Some(location) => visit!($app, $browser, &location),
            None => page,
        }
    }};
}

macro_rules! logout {
    ($app:expr, $browser:expr) => {{
        let req = $browser.attach(test::TestRequest::post().uri("/logout"));
        let resp = test::call_service(&$app, req.to_request()).await;
        let page = $browser.absorb(resp, "/logout").await;
        assert_eq!(page.status, StatusCode::SEE_OTHER);
        let location = page.location.clone().unwrap();
        visit!($app, $browser, &location)
    }};
}

struct Page {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

impl Page {
    fn contains(&self, text: &str) -> bool {
        self.body.contains(text)
    }

    /// data-cy 对应元素的开始标签
    fn control(&self, cy: &str) -> &str {
        let marker = format!(r#"data-cy="{}""#, cy);
        let at = self
            .body
            .find(&marker)
            .unwrap_or_else(|| panic!("页面中没有 {}", cy));
        let start = self.body[..at].rfind('<').unwrap();
        let end = at + self.body[at..].find('>').unwrap();
        &self.body[start..=end]
    }

    fn is_disabled(&self, cy: &str) -> bool {
        self.control(cy).contains(" disabled")
    }

    fn is_required(&self, cy: &str) -> bool {
        self.control(cy).contains(" required")
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Default)]
struct Browser {
    cookie: Option<Cookie<'static>>,
    url: String,
}

impl Browser {
    fn attach(&self, req: test::TestRequest) -> test::TestRequest {
        match &self.cookie {
            Some(cookie) => req.cookie(cookie.clone()),
            None => req,
        }
    }

    async fn absorb<B: MessageBody>(&mut self, resp: ServiceResponse<B>, path: &str) -> Page {
        if let Some(cookie) = resp
            .response()
            .cookies()
            .find(|c| c.name() == CLIENT_COOKIE)
        {
            self.cookie = Some(cookie.into_owned());
        }
        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if location.is_none() && !path.starts_with("/api") {
            self.url = path.to_string();
        }
        let body = test::read_body(resp).await;
        Page {
            status,
            location,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }
}

#[actix_web::test]
async fn shows_the_login_page() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();

    let page = visit!(app, browser, "/");

    assert_eq!(page.status, StatusCode::OK);
    assert!(browser.cookie.is_some());
    assert!(page.contains("<h1>Login</h1>"));
    assert!(!page.is_disabled("username-input"));
    assert!(!page.is_disabled("password-input"));
    assert!(!page.is_disabled("login-button"));
}

#[actix_web::test]
async fn valid_credentials_redirect_to_the_dashboard() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");

    let page = submit!(app, browser, VALID_USERNAME, VALID_PASSWORD);

    assert_eq!(browser.url, "/dashboard");
    assert!(page.contains("Dashboard"));
    assert!(page.contains(r#"data-cy="logout-button""#));
}

#[actix_web::test]
async fn missing_password_is_rejected_without_counting() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");

    let page = submit!(app, browser, VALID_USERNAME, "");

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.contains("Senha incorreta"));
    assert!(!page.contains("tentativa(s) restante(s)"));
    assert_eq!(browser.url, "/");

    let state = visit!(app, browser, "/api/state").json();
    assert_eq!(state["data"]["attempts"], 0);
}

#[actix_web::test]
async fn wrong_password_reports_remaining_attempts() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");

    let page = submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);

    assert!(page.contains("Senha incorreta"));
    assert!(page.contains("2 tentativa(s) restante(s)"));
    assert_eq!(browser.url, "/");
    // 用户名回填，密码不回填
    assert!(page.control("username-input").contains(r#"value="admin""#));
    assert!(!page.control("password-input").contains("value="));
}

#[actix_web::test]
async fn three_failures_lock_the_form() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");

    let page = submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    assert!(page.contains("2 tentativa(s) restante(s)"));

    let page = submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    assert!(page.contains("1 tentativa(s) restante(s)"));

    let page = submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    assert!(page.contains("Muitas tentativas de login. Tente novamente em 15 minutos."));
    assert!(page.contains("Conta bloqueada"));
    assert!(page.is_disabled("username-input"));
    assert!(page.is_disabled("password-input"));
    assert!(page.is_disabled("login-button"));

    // 锁定期间正确的账号也不会登录
    let page = submit!(app, browser, VALID_USERNAME, VALID_PASSWORD);
    assert_eq!(browser.url, "/");
    assert!(page.contains("Conta bloqueada"));
}

#[actix_web::test]
async fn locked_form_shows_the_countdown() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();

    let mut page = visit!(app, browser, "/");
    for _ in 0..3 {
        page = submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    }

    let countdown = Regex::new(r"Tempo restante: \d{1,2}:\d{2}").unwrap();
    assert!(countdown.is_match(&page.body));
}

#[actix_web::test]
async fn lockout_survives_a_reload() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");
    for _ in 0..3 {
        submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    }

    let page = visit!(app, browser, "/");

    assert!(page.contains("Conta bloqueada"));
    assert!(page.is_disabled("username-input"));
    assert!(page.is_disabled("password-input"));
    assert!(page.is_disabled("login-button"));
    // 重新挂载后不再显示上一次的错误信息
    assert!(!page.contains("Muitas tentativas"));
}

#[actix_web::test]
async fn clearing_the_client_cookie_clears_the_lockout() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");
    for _ in 0..3 {
        submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    }

    let mut fresh = Browser::default();
    let page = visit!(app, fresh, "/");

    assert!(!page.contains("Conta bloqueada"));
    assert!(!page.is_disabled("login-button"));
    assert_ne!(fresh.cookie, browser.cookie);
}

#[actix_web::test]
async fn logout_returns_to_the_login_page() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");

    submit!(app, browser, VALID_USERNAME, VALID_PASSWORD);
    assert_eq!(browser.url, "/dashboard");

    let page = logout!(app, browser);

    assert_eq!(browser.url, "/");
    assert!(page.contains(r#"data-cy="username-input""#));
}

#[actix_web::test]
async fn successful_login_resets_the_counter() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();
    visit!(app, browser, "/");

    for _ in 0..2 {
        submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    }
    submit!(app, browser, VALID_USERNAME, VALID_PASSWORD);
    assert_eq!(browser.url, "/dashboard");

    logout!(app, browser);
    let page = submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);

    assert!(page.contains("2 tentativa(s) restante(s)"));
}

#[actix_web::test]
async fn both_fields_are_required() {
    let app = spawn_app!(state(Duration::ZERO));
    let mut browser = Browser::default();

    let page = visit!(app, browser, "/");
    assert!(page.is_required("username-input"));
    assert!(page.is_required("password-input"));

    // 绕过浏览器校验时，空密码仍由服务端拦截
    let page = submit!(app, browser, "", "");
    assert!(page.contains("Senha incorreta"));
    assert_eq!(browser.url, "/");
}

#[actix_web::test]
async fn loading_indicator_is_shown_while_submitting() {
    let app = spawn_app!(state(Duration::from_millis(300)));
    let mut browser = Browser::default();
    visit!(app, browser, "/");

    let first = browser.attach(
        test::TestRequest::post()
            .uri("/")
            .set_form([("username", VALID_USERNAME), ("password", VALID_PASSWORD)]),
    );
    let second = browser.attach(
        test::TestRequest::post()
            .uri("/")
            .set_form([("username", VALID_USERNAME), ("password", VALID_PASSWORD)]),
    );

    let (first, second) = futures::join!(
        test::call_service(&app, first.to_request()),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            test::call_service(&app, second.to_request()).await
        }
    );

    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    let page = browser.absorb(second, "/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.contains("Entrando..."));
    assert!(page.is_disabled("login-button"));
}

#[actix_web::test]
async fn countdown_unlocks_without_a_reload() {
    let policy = LockoutPolicy {
        lockout_duration: Duration::from_secs(60),
        submit_delay: Duration::ZERO,
        ..LockoutPolicy::default()
    };
    let app = spawn_app!(state_with(policy, Duration::from_millis(5)));
    let mut browser = Browser::default();
    visit!(app, browser, "/");
    for _ in 0..3 {
        submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    }
    let state = visit!(app, browser, "/api/state").json();
    assert_eq!(state["data"]["is_locked"], true);

    // 暂停时钟，空闲时自动推进到下一个 tick
    tokio::time::pause();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let state = visit!(app, browser, "/api/state").json();
    assert_eq!(state["success"], true);
    assert_eq!(state["data"]["is_locked"], false);
    assert_eq!(state["data"]["attempts"], 0);
    assert_eq!(state["data"]["error"], Value::Null);

    let page = submit!(app, browser, VALID_USERNAME, INVALID_PASSWORD);
    assert!(page.contains("2 tentativa(s) restante(s)"));
}

#[actix_web::test]
async fn static_assets_do_not_open_a_session() {
    let app_state = state(Duration::ZERO);
    let app = spawn_app!(app_state.clone());
    let mut browser = Browser::default();

    let page = visit!(app, browser, "/static/app.css");

    assert_eq!(page.status, StatusCode::OK);
    assert!(browser.cookie.is_none());
    assert_eq!(app_state.sessions.session_count(), 0);

    visit!(app, browser, "/");
    assert!(browser.cookie.is_some());
    assert_eq!(app_state.sessions.session_count(), 1);
}
