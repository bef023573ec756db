/// Image upload, retrieval and deletion handlers
use crate::error::{AppError, Result};
use crate::models::{parse_action_list, ImageStatus, MessageResponse, UploadResponse};
use crate::services::processing::sniff_content_type;
use crate::services::{ImageService, NewImage};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Upload body cap
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// POST /upload
///
/// Multipart form with an `image` file part and an optional comma-separated
/// `actions` field.
pub async fn upload_image(
    service: web::Data<ImageService>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut file: Option<UploadedFile> = None;
    let mut actions_field = String::new();
    let mut total_bytes: usize = 0;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Failed to parse form: {e}")))?;

        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {e}")))?;
            total_bytes += chunk.len();
            if total_bytes > MAX_UPLOAD_BYTES {
                return Err(AppError::BadRequest(format!(
                    "upload exceeds {} byte limit",
                    MAX_UPLOAD_BYTES
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "image" => {
                file = Some(UploadedFile {
                    filename: filename.unwrap_or_default(),
                    content_type,
                    data: data.freeze(),
                })
            }
            "actions" => actions_field = String::from_utf8_lossy(&data).into_owned(),
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    let file =
        file.ok_or_else(|| AppError::BadRequest("Failed to get image file".to_string()))?;
    let actions = parse_action_list(&actions_field);
    let content_type = file
        .content_type
        .unwrap_or_else(|| sniff_content_type(&file.data).to_string());

    let upload = NewImage {
        filename: file.filename,
        file_size: file.data.len() as i64,
        actions,
    };

    let id = service.create(upload, file.data, &content_type).await?;

    Ok(HttpResponse::Created().json(UploadResponse {
        id,
        status: ImageStatus::Pending,
        message: "Image uploaded successfully".to_string(),
    }))
}

/// GET /image/{id}
pub async fn get_image(
    service: web::Data<ImageService>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let reader = service.get_by_id(&id).await?;

    Ok(HttpResponse::Ok()
        .content_type("image/jpeg")
        .streaming(ReaderStream::new(reader)))
}

/// GET /image/{id}/status
pub async fn get_image_status(
    service: web::Data<ImageService>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let image = service.get_status(&id).await?;
    Ok(HttpResponse::Ok().json(image))
}

/// DELETE /image/{id}
pub async fn delete_image(
    service: web::Data<ImageService>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    service.remove(&id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Image deleted successfully".to_string(),
    }))
}
