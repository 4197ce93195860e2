pub mod control;
pub mod metrics;

pub use control::{get_config, list_processes, start_service, stop_service, update_config};
pub use metrics::get_metrics;

use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn health(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "polling": data.lifecycle.is_polling()
    }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/config", web::get().to(get_config))
        .route("/api/config", web::put().to(update_config))
        .route("/api/service/start", web::post().to(start_service))
        .route("/api/service/stop", web::post().to(stop_service))
        .route("/api/processes", web::get().to(list_processes))
        .route("/metrics", web::get().to(get_metrics))
        .route("/health", web::get().to(health));
}
