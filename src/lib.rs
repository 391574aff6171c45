#![doc = include_str!("../README.md")]

pub mod config;
pub mod download;
pub mod error;
pub mod session;
pub mod token_store;
mod transport;
pub mod types;
mod workspace;

// Re-exports for convenient access
pub use config::ClientConfig;
pub use download::{
    enrich_artifacts, fallback_filename, filename_from_disposition, resolve_download_path,
};
pub use error::Error;
pub use session::SessionManager;
pub use token_store::StorageMode;
pub use types::{
    Artifact, AuthResponse, Credentials, CvGeneration, CvUploadReceipt, DownloadedArtifact,
    FileUpload, GenerateCvRequest, GroundSource, GroundSourceCreated, OrientationDecision,
    PdfExport, ProcessingReport, ProfileDraft, SignUpForm, SourceId, StageTrace, UserProfile,
};
