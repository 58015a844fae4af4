//! `POST /convert/`: reel URL in, WAV out

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::body::JobFileStream;
use super::error::ApiError;
use super::state::AppState;
use reelwav_core::{Job, ReelWavError};

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Public reel URL, e.g. https://www.instagram.com/reel/<shortcode>/
    pub url: String,
}

/// Download the reel and return its audio as `audio.wav`.
pub async fn convert(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Response<Body>, ApiError> {
    let Json(req) = payload?;
    if req.url.trim().is_empty() {
        return Err(ApiError::bad_request("url must not be empty"));
    }

    let job = Job::create(&state.scratch_root)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create job directory: {}", e)))?
        .keep(state.keep_scratch);
    info!("Convert request {} for {}", job.id(), req.url);

    // The worker owns the job; it comes back with the result so it outlives
    // the response body on success and is dropped right away on failure.
    let pipeline = state.pipeline.clone();
    let url = req.url;
    let worker = tokio::spawn(async move {
        let result = pipeline.run(&url, &job, None).await;
        (job, result)
    });

    let (job, result) = worker
        .await
        .map_err(|e| ReelWavError::Pipeline(format!("conversion worker failed: {}", e)))?;
    let converted = result?;

    let file = tokio::fs::File::open(&converted.path)
        .await
        .map_err(ReelWavError::from)?;
    let len = file.metadata().await.map_err(ReelWavError::from)?.len();

    Response::builder()
        .header(header::CONTENT_TYPE, "audio/wav")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"audio.wav\"",
        )
        .header(header::CONTENT_LENGTH, len)
        .header(
            "X-Audio-Duration-Secs",
            format!("{:.2}", converted.wav.duration_secs()),
        )
        .header("X-Reel-Shortcode", converted.post.id.as_str())
        .body(Body::from_stream(JobFileStream::new(file, job)))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
