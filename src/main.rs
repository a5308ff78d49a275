use actix_cors::Cors;
use actix_web::{middleware::Logger as AccessLog, web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};
use std::io;

use login_lockout::config::AppConfig;
use login_lockout::logger::Logger;
use login_lockout::routes;
use login_lockout::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 加载 .env
    dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("读取配置失败: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // 初始化日志系统，文件不可用时退回到标准错误输出
    let log_path = config.log_dir.join("app.log");
    if let Err(e) = Logger::init(&log_path, config.log_level) {
        eprintln!("初始化日志系统失败: {}", e);
        env_logger::Builder::new()
            .filter_level(config.log_level)
            .init();
    }

    info!("应用程序启动");
    info!("配置: {:?}", config);

    let app_state = web::Data::new(AppState::from_config(&config));

    // 定期清理过期会话
    let sessions = app_state.sessions.clone();
    let cleanup_interval = config.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            sessions.cleanup_expired_sessions();
        }
    });

    let static_dir = config.static_dir.clone();
    if !static_dir.is_dir() {
        error!("静态文件目录不存在: {}", static_dir.display());
    }

    println!("服务器启动在 http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(AccessLog::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET"])
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(routes::register(
                app_state.sessions.clone(),
                Some(static_dir.clone()),
            ))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
