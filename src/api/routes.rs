// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/languages", web::get().to(handlers::list_languages))
            .route("/ws", web::get().to(handlers::ws_handler))
            .route("/problems/{id}/cases", web::get().to(handlers::list_cases))
            .service(
                web::scope("/runs")
                    .route("", web::post().to(handlers::create_run))
                    .route("/current", web::delete().to(handlers::cancel_run))
            )
            .service(
                web::scope("/submissions")
                    .route("", web::post().to(handlers::save_submission))
                    .route("", web::get().to(handlers::list_submissions))
            )
            .service(
                web::scope("/sessions")
                    .route("", web::post().to(handlers::start_session))
                    .route("/{id}/events", web::post().to(handlers::send_event))
                    .route("/{id}", web::delete().to(handlers::end_session))
            )
    );
}
