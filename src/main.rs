use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use codeforge::api::handlers::WsBroker;
use codeforge::api::{AppState, configure_routes};
use codeforge::{banner, config, store};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  Warning: Could not load .env file: {}", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::other(e));
        }
    };

    let client = reqwest::Client::new();
    let backends = match store::connect(&app_config.store, client.clone()).await {
        Ok(backends) => backends,
        Err(e) => {
            log::error!("Failed to connect to the data store: {}", e);
            return Err(std::io::Error::other(e));
        }
    };

    let bind_addr = app_config.bind_addr.clone();
    let state = AppState::new(app_config, client, backends);
    let broker = WsBroker::new();

    log::info!(
        "Judge backend: {}, polling every {:?} up to {} times",
        state.judge.name(),
        state.config.poll.interval,
        state.config.poll.max_attempts
    );
    println!("🚀 Starting server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(broker.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
