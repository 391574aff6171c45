use std::collections::HashMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Ground source identifier (server-assigned, opaque).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Account profile as returned by the API.
///
/// Owned exclusively by the session: replaced wholesale on every successful
/// auth, refresh, or profile response, never partially mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Response from the sign-up, sign-in, and refresh endpoints.
///
/// Access and refresh tokens always travel together here and are applied to
/// the session together, which keeps the pair from skewing.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in_seconds: Option<u64>,
}

/// Sign-in credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Sign-up form values. Blank optional names are omitted from the wire
/// payload.
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Desired profile values for [`update_me`](crate::SessionManager::update_me).
///
/// Compared against the currently held profile: unchanged fields are omitted
/// from the patch, a field changed to blank is sent as an explicit `null`.
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub first_name: String,
    pub last_name: String,
}

/// A user-uploaded reference document held by the API.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct GroundSource {
    pub id: SourceId,
    pub name: String,
    pub original_filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Creation response: the new source plus ingestion details.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct GroundSourceCreated {
    #[serde(flatten)]
    pub source: GroundSource,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub processing_report: Option<ProcessingReport>,
}

/// A generated output document referenced by storage path or URL.
///
/// `download_path` is resolved client-side (see [`crate::download`]); it is
/// never part of the server payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub download_token: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

/// Ingestion quality report attached to uploads and source creation.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ProcessingReport {
    pub engine_name: String,
    #[serde(default)]
    pub engine_version: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub quality_flags: Vec<String>,
    #[serde(default)]
    pub engine_attempts: Vec<String>,
}

/// Response from the CV upload endpoint, with artifacts enriched by a
/// resolved `download_path`.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct CvUploadReceipt {
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub metrics: HashMap<String, i64>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub processing_report: Option<ProcessingReport>,
}

/// Parameters for the generate-from-source endpoints. `format_hint` only
/// applies to the PDF variant; blank optional fields are omitted from the
/// multipart form.
#[derive(Debug, Clone)]
pub struct GenerateCvRequest {
    pub source_id: SourceId,
    pub job_description: String,
    pub graph_id: Option<String>,
    pub format_hint: Option<String>,
}

/// Result of a JSON CV generation run.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct CvGeneration {
    pub source_id: SourceId,
    pub source_name: String,
    pub run_id: String,
    pub graph_id: String,
    pub graph_version: String,
    pub final_cv: String,
    pub orientation: OrientationDecision,
    #[serde(default)]
    pub stage_traces: Vec<StageTrace>,
}

/// How the generation graph weighted its audiences.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct OrientationDecision {
    pub ats_weight: f64,
    pub recruiter_weight: f64,
    pub technical_weight: f64,
    pub rationale: String,
}

/// Per-stage execution trace of a generation run.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct StageTrace {
    pub stage: String,
    #[serde(default)]
    pub prompt_id: String,
    #[serde(default)]
    pub prompt_hash: String,
    #[serde(default)]
    pub llm_profile: String,
    #[serde(default)]
    pub llm_provider: String,
    #[serde(default)]
    pub llm_model: String,
    pub status: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A file to send as a multipart upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A rendered PDF export, materialized from the binary response.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PdfExport {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub run_id: String,
}

/// A downloaded artifact, materialized from the binary response.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DownloadedArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
}
