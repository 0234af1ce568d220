/// Audio processing API routes
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    extract::{Query, State},
    Json,
};
use lit_pipeline::{EffectKind, TransformRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessAudioRequest {
    /// URL or file name of the source
    #[serde(default)]
    pub file_path: Option<String>,

    /// Restrict the run to one effect
    #[serde(default, rename = "type")]
    pub effect_type: Option<String>,

    #[serde(flatten)]
    pub transform: TransformRequest,
}

#[derive(Debug, Serialize)]
pub struct ProcessAudioResponse {
    pub url: String,
    pub applied: Vec<EffectKind>,
    pub skipped: Vec<EffectKind>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingCopyQuery {
    pub file_path: String,
}

#[derive(Debug, Serialize)]
pub struct WorkingCopyResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// POST /api/audio/process
pub async fn process_audio(
    State(app_state): State<AppState>,
    Json(req): Json<ProcessAudioRequest>,
) -> Result<Json<ProcessAudioResponse>> {
    let file_path = req
        .file_path
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| {
            ServerError::BadRequest("File path is missing in the request.".to_string())
        })?;

    let transform = match req.effect_type.as_deref() {
        Some(name) => req.transform.only(name.parse::<EffectKind>()?),
        None => req.transform,
    };

    let cancel = app_state.shutdown.child_token();
    let outcome = app_state
        .processing
        .process(&file_path, &transform, &cancel)
        .await?;

    tracing::info!("Processed {} -> {}", file_path, outcome.url);

    Ok(Json(ProcessAudioResponse {
        url: outcome.url,
        applied: outcome.applied,
        skipped: outcome.skipped,
    }))
}

/// GET /api/audio/working?filePath=...
pub async fn working_copy(
    State(app_state): State<AppState>,
    Query(query): Query<WorkingCopyQuery>,
) -> Result<Json<WorkingCopyResponse>> {
    let status = app_state.processing.working_copy(&query.file_path)?;
    Ok(Json(WorkingCopyResponse {
        exists: status.exists,
        url: status.url,
    }))
}
