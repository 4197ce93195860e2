use actix_web::{web, HttpResponse, Responder};

use crate::state::{AppState, ConfigUpdate};

pub async fn get_config(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.config.view())
}

pub async fn update_config(
    data: web::Data<AppState>,
    req: web::Json<ConfigUpdate>,
) -> impl Responder {
    match data.config.apply(req.into_inner()) {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({
            "status": "error",
            "message": e.to_string()
        })),
    }
}

pub async fn start_service(data: web::Data<AppState>) -> impl Responder {
    match data.lifecycle.start().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "message": "Service started"
        })),
        Err(e) => {
            log::error!("Failed to start service: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "error",
                "message": e.to_string()
            }))
        }
    }
}

pub async fn stop_service(data: web::Data<AppState>) -> impl Responder {
    match data.lifecycle.stop() {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "message": "Service stopped"
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "status": "error",
            "message": e.to_string()
        })),
    }
}

/// Manual inspection: a fresh envelope built with the current filters.
pub async fn list_processes(data: web::Data<AppState>) -> impl Responder {
    match data.lifecycle.snapshot().await {
        Ok(envelope) => HttpResponse::Ok().json(envelope),
        Err(e) => {
            log::error!("Failed to take snapshot: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "error",
                "message": e.to_string()
            }))
        }
    }
}
