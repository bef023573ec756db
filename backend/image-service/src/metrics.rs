use actix_web::{HttpResponse, Responder};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Upload attempts by outcome (success, validation, storage, metadata, publish).
    pub static ref IMAGE_UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "image_uploads_total",
        "Image upload attempts segmented by outcome",
        &["result"]
    )
    .expect("failed to register image_uploads_total");

    /// Task publish attempts (success/error).
    pub static ref IMAGE_TASKS_PUBLISHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "image_tasks_published_total",
        "Task messages published to Kafka segmented by outcome",
        &["result"]
    )
    .expect("failed to register image_tasks_published_total");

    /// Compensating cleanups by step and outcome.
    pub static ref IMAGE_COMPENSATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "image_compensations_total",
        "Compensating blob removals segmented by step and outcome",
        &["step", "result"]
    )
    .expect("failed to register image_compensations_total");

    /// Worker message outcomes (success/error).
    pub static ref IMAGE_TASKS_PROCESSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "image_tasks_processed_total",
        "Task messages handled by the worker pool segmented by outcome",
        &["result"]
    )
    .expect("failed to register image_tasks_processed_total");

    /// Wall time of the transformation pipeline by outcome.
    pub static ref IMAGE_PIPELINE_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "image_pipeline_duration_seconds",
        "Transformation pipeline duration segmented by outcome",
        &["result"]
    )
    .expect("failed to register image_pipeline_duration_seconds");
}

pub fn result_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}
