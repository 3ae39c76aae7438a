use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::merge::Transcoder;
use crate::core::rate_limit::RateLimitStatus;
use crate::core::script::{Hosts, NewscastScript};
use crate::core::tts::{ContentType, RemoteVoice, VoiceProfile};
use crate::errors::{ErrorKind, PipelineError};
use crate::state::AppState;

/// HTTP status for an error category
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Configuration => StatusCode::BAD_REQUEST,
        ErrorKind::Quota => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Service | ErrorKind::RetriesExhausted => StatusCode::BAD_GATEWAY,
        ErrorKind::Storage | ErrorKind::Transcoder => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &PipelineError) -> Response {
    let status = status_for_kind(err.kind());
    if status.is_server_error() {
        error!(code = err.code(), error = %err, "Request failed");
    } else {
        warn!(code = err.code(), error = %err, "Request rejected");
    }
    (
        status,
        Json(json!({
            "error": err.to_string(),
            "code": err.code(),
            "kind": err.kind(),
        })),
    )
        .into_response()
}

/// Health check
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub synthesis_enabled: bool,
    pub voices: usize,
    pub rate_limit: RateLimitStatus,
    pub limiters: Vec<RateLimitStatus>,
    /// First line of `ffmpeg -version`, `None` when the binary is unusable
    pub transcoder: Option<String>,
    pub transcoder_error: Option<String>,
}

/// Limiter, catalog and transcoder status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (transcoder, transcoder_error) = match state.merger.transcoder().version().await {
        Ok(version) => (Some(version), None),
        Err(e) => (None, Some(e.to_string())),
    };

    Json(StatusResponse {
        synthesis_enabled: state.synthesizer.is_some(),
        voices: state.catalog.len(),
        rate_limit: state.limiter.get_status(),
        limiters: state.limiter.statuses(),
        transcoder,
        transcoder_error,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct VoicesQuery {
    /// Also ask the provider for its voice list
    #[serde(default)]
    pub remote: bool,
    /// Lineup reported as `default_hosts`; newscast when absent
    #[serde(default)]
    pub content: ContentType,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceProfile>,
    pub default_hosts: Option<Hosts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<Vec<RemoteVoice>>,
}

/// Built-in voice catalog, optionally with the provider's list
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoicesQuery>,
) -> Response {
    let remote = if query.remote {
        let synthesizer = match state.synthesizer() {
            Ok(synthesizer) => synthesizer,
            Err(e) => return error_response(&e),
        };
        match synthesizer.list_voices().await {
            Ok(voices) => Some(voices),
            Err(e) => return error_response(&e),
        }
    } else {
        None
    };

    Json(VoicesResponse {
        voices: state.catalog.iter().cloned().collect(),
        default_hosts: state.catalog.for_content(query.content).ok(),
        remote,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub script_path: PathBuf,
    pub output_dir: PathBuf,
}

/// Synthesize a script file into `output_dir` and return the manifest
///
/// Both paths are resolved inside the configured data root.
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Response {
    let synthesizer = match state.synthesizer() {
        Ok(synthesizer) => synthesizer,
        Err(e) => return error_response(&e),
    };
    let (script_path, output_dir) = match (
        state.resolve_path(&request.script_path),
        state.resolve_path(&request.output_dir),
    ) {
        (Ok(script), Ok(output)) => (script, output),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };
    let script = match NewscastScript::from_file(&script_path) {
        Ok(script) => script,
        Err(e) => return error_response(&e),
    };

    info!(
        script = %script_path.display(),
        output = %output_dir.display(),
        "Synthesis requested"
    );
    match synthesizer.synthesize_script(&script, &output_dir).await {
        Ok(manifest) => Json(manifest).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub manifest_path: PathBuf,
    pub output_dir: PathBuf,
}

/// Merge the clips of a manifest and return the processing result
pub async fn merge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MergeRequest>,
) -> Response {
    let (manifest_path, output_dir) = match (
        state.resolve_path(&request.manifest_path),
        state.resolve_path(&request.output_dir),
    ) {
        (Ok(manifest), Ok(output)) => (manifest, output),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };

    info!(
        manifest = %manifest_path.display(),
        output = %output_dir.display(),
        "Merge requested"
    );
    match state
        .merger
        .merge_manifest_file(&manifest_path, &output_dir)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(&e),
    }
}
