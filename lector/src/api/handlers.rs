use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::{LectorError, Result};
use crate::ocr;
use crate::scratch::RequestScratch;

use super::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct OcrResponse {
    pub text: String,
}

/// `GET /ping`
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "online" }))
}

/// `POST /ocr`
///
/// Accepts a multipart form with an `image` field, runs the
/// preprocessing pipeline on it and hands the cleaned image to the
/// recognition engine. Scratch files are tied to `RequestScratch` and
/// removed when it drops, whichever way this handler exits.
pub async fn recognize_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>> {
    let mut image_bytes: Option<Vec<u8>> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            let bytes = field.bytes().await.map_err(|e| {
                LectorError::Validation(format!("Failed to read image field: {e}"))
            })?;
            image_bytes = Some(bytes.to_vec());
            break;
        }
    }

    let Some(bytes) = image_bytes else {
        return Err(LectorError::Validation("No image uploaded".to_string()));
    };

    let scratch = RequestScratch::acquire()?;
    scratch.stage("upload.png", &bytes)?;

    // Decoding and the pipeline are CPU-bound; keep them off the
    // async workers.
    let cleaned_png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let img = ocr::decode_image(&bytes)?;
        let cleaned = ocr::preprocess(&img);
        ocr::encode_png(&cleaned)
    })
    .await
    .map_err(|e| LectorError::Internal(format!("Preprocessing task panicked: {e}")))??;

    let processed_path = scratch.stage("processed.png", &cleaned_png)?;

    let recognition = state.ocr.recognize(&processed_path).await?;
    tracing::debug!(
        language = %recognition.language,
        chars = recognition.text.len(),
        "recognition finished"
    );

    Ok(Json(OcrResponse {
        text: recognition.text,
    }))
}
