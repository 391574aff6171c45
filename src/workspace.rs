//! Workspace operations riding on the authenticated pipeline: ground
//! sources, CV uploads, generation runs, and artifact downloads.

use reqwest::Method;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::download::{enrich_artifacts, fallback_filename, filename_from_disposition, resolve_download_path};
use crate::error::Error;
use crate::session::SessionManager;
use crate::transport::authorize;
use crate::types::{
    Artifact, CvGeneration, CvUploadReceipt, DownloadedArtifact, FileUpload, GenerateCvRequest,
    GroundSource, GroundSourceCreated, PdfExport, SourceId,
};

const RUN_ID_HEADER: &str = "x-cv-run-id";
const DEFAULT_EXPORT_FILENAME: &str = "cv_export.pdf";

#[derive(Deserialize)]
struct SourceList {
    #[serde(default)]
    items: Vec<GroundSource>,
}

impl SessionManager {
    /// Upload a ground source document.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn create_ground_source(
        &self,
        name: &str,
        file: &FileUpload,
    ) -> Result<GroundSourceCreated, Error> {
        let payload = self
            .request_with_refresh(|token| {
                let form = file_part(file).map(|part| {
                    Form::new().text("name", name.to_string()).part("file", part)
                });
                async move {
                    let request = self
                        .transport
                        .request(Method::POST, "/v1/sources")
                        .multipart(form?);
                    self.transport.send_json(authorize(request, &token)).await
                }
            })
            .await?;
        serde_json::from_value(payload).map_err(Error::from)
    }

    /// List the account's ground sources. An absent `items` field reads as
    /// an empty list.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn list_ground_sources(&self) -> Result<Vec<GroundSource>, Error> {
        let payload = self
            .request_with_refresh(|token| {
                let request = authorize(self.transport.request(Method::GET, "/v1/sources"), &token);
                self.transport.send_json(request)
            })
            .await?;
        let list: SourceList = serde_json::from_value(payload)?;
        Ok(list.items)
    }

    /// Delete a ground source.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn delete_ground_source(&self, id: &SourceId) -> Result<(), Error> {
        self.request_with_refresh(|token| {
            let request = authorize(
                self.transport
                    .request(Method::DELETE, &format!("/v1/sources/{id}")),
                &token,
            );
            self.transport.send_json(request)
        })
        .await?;
        Ok(())
    }

    /// Upload a CV for ingestion. Response artifacts carry a resolved
    /// `download_path`.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn upload_cv(&self, file: &FileUpload) -> Result<CvUploadReceipt, Error> {
        let payload = self
            .request_with_refresh(|token| {
                let form = file_part(file).map(|part| Form::new().part("file", part));
                async move {
                    let request = self
                        .transport
                        .request(Method::POST, "/v1/cv/upload")
                        .multipart(form?);
                    self.transport.send_json(authorize(request, &token)).await
                }
            })
            .await?;
        let mut receipt: CvUploadReceipt = serde_json::from_value(payload)?;
        receipt.artifacts = enrich_artifacts(&receipt.artifacts);
        Ok(receipt)
    }

    /// Run a generation from a stored ground source, returning the run
    /// metadata and the final CV text.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn generate_cv_from_source(
        &self,
        request: &GenerateCvRequest,
    ) -> Result<CvGeneration, Error> {
        let payload = self
            .request_with_refresh(|token| {
                let builder = self
                    .transport
                    .request(Method::POST, "/v1/cv/generate-from-source")
                    .multipart(generation_form(request, false));
                self.transport.send_json(authorize(builder, &token))
            })
            .await?;
        serde_json::from_value(payload).map_err(Error::from)
    }

    /// Run a generation and download the rendered PDF in one call.
    ///
    /// The filename comes from the `content-disposition` header (default
    /// `cv_export.pdf`), the run identifier from `x-cv-run-id`.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn generate_cv_pdf_from_source(
        &self,
        request: &GenerateCvRequest,
    ) -> Result<PdfExport, Error> {
        let response = self
            .request_with_refresh(|token| {
                let builder = self
                    .transport
                    .request(Method::POST, "/v1/cv/generate-from-source/pdf")
                    .multipart(generation_form(request, true));
                self.transport.send_binary(authorize(builder, &token))
            })
            .await?;

        let mut filename = filename_from_disposition(&header_value(&response, CONTENT_DISPOSITION.as_str()));
        if filename.is_empty() {
            filename = DEFAULT_EXPORT_FILENAME.to_string();
        }
        let run_id = header_value(&response, RUN_ID_HEADER);
        let bytes = response.bytes().await.map_err(Error::from)?.to_vec();

        Ok(PdfExport {
            bytes,
            filename,
            run_id,
        })
    }

    /// Download an artifact via its resolved path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] without a network call when the artifact
    /// has no resolvable path; otherwise propagates the unresolved failure
    /// of the authenticated call.
    pub async fn download_artifact(&self, artifact: &Artifact) -> Result<DownloadedArtifact, Error> {
        let path = resolve_download_path(artifact);
        if path.is_empty() {
            return Err(Error::Download("Artifact download is unavailable".into()));
        }

        let response = self
            .request_with_refresh(|token| {
                let request = authorize(self.transport.request(Method::GET, &path), &token);
                self.transport.send_binary(request)
            })
            .await?;

        let mut filename = filename_from_disposition(&header_value(&response, CONTENT_DISPOSITION.as_str()));
        if filename.is_empty() {
            filename = fallback_filename(artifact);
        }
        let bytes = response.bytes().await.map_err(Error::from)?.to_vec();

        Ok(DownloadedArtifact { bytes, filename })
    }
}

/// Multipart part for an upload; the bytes are cloned so the form can be
/// rebuilt on a retry.
fn file_part(file: &FileUpload) -> Result<Part, Error> {
    let mut part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
    if let Some(content_type) = &file.content_type {
        part = part.mime_str(content_type)?;
    }
    Ok(part)
}

/// Generation form shared by the JSON and PDF endpoints; blank optional
/// fields are omitted.
fn generation_form(request: &GenerateCvRequest, include_format_hint: bool) -> Form {
    let mut form = Form::new()
        .text("source_id", request.source_id.to_string())
        .text("job_description", request.job_description.clone());
    if let Some(graph_id) = request.graph_id.as_deref().filter(|s| !s.is_empty()) {
        form = form.text("graph_id", graph_id.to_string());
    }
    if include_format_hint {
        if let Some(format_hint) = request.format_hint.as_deref().filter(|s| !s.is_empty()) {
            form = form.text("format_hint", format_hint.to_string());
        }
    }
    form
}

fn header_value(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
