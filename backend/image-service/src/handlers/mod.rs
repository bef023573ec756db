/// HTTP request handlers for image-service
///
/// Handlers parse requests, delegate to [`ImageService`](crate::services::ImageService)
/// and shape JSON responses. Errors map to status codes via `AppError`.
pub mod images;

pub use images::*;

use crate::metrics::metrics_handler;
use actix_web::{web, HttpResponse};

/// Register every route served by the API process
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload", web::post().to(upload_image))
        .route("/image/{id}", web::get().to(get_image))
        .route("/image/{id}", web::delete().to(delete_image))
        .route("/image/{id}/status", web::get().to(get_image_status))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler));
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}
