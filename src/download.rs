//! Post-processing for artifact downloads: path resolution and
//! content-disposition filename parsing.

use url::Url;

use crate::types::Artifact;

const ARTIFACT_DOWNLOAD_PATH: &str = "/v1/documents/artifacts/download";

/// Strips the API base prefix from a server-supplied path; the transport
/// adds the base back when the request is issued.
fn normalize_path(path: &str) -> &str {
    if path.starts_with("/api/") {
        &path[4..]
    } else {
        path
    }
}

/// Download path for an artifact, or empty when it has neither a
/// `download_url` nor a `storage_path` (the caller must treat the artifact
/// as unavailable).
#[must_use]
pub fn resolve_download_path(artifact: &Artifact) -> String {
    if let Some(download_url) = artifact.download_url.as_deref().filter(|u| !u.is_empty()) {
        if let Ok(parsed) = Url::parse(download_url) {
            let mut path = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                path.push('?');
                path.push_str(query);
            }
            return normalize_path(&path).to_string();
        }
        // Not an absolute URL; treat the raw value as a path.
        return normalize_path(download_url).to_string();
    }

    if !artifact.storage_path.is_empty() {
        return format!(
            "{ARTIFACT_DOWNLOAD_PATH}?storage_path={}",
            urlencoding::encode(&artifact.storage_path)
        );
    }

    String::new()
}

/// Filename from a `content-disposition` header value.
///
/// Prefers the extended `filename*=UTF-8''...` form (percent-decoded,
/// falling back to the raw token if decoding fails), then the plain
/// `filename="..."` token. Empty when neither is present; the caller
/// supplies a default name.
#[must_use]
pub fn filename_from_disposition(disposition: &str) -> String {
    const EXTENDED: &str = "filename*=utf-8''";

    let lower = disposition.to_ascii_lowercase();
    if let Some(start) = lower.find(EXTENDED) {
        let raw = disposition[start + EXTENDED.len()..]
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        if !raw.is_empty() {
            return match urlencoding::decode(raw) {
                Ok(decoded) => decoded.trim().to_string(),
                Err(_) => raw.to_string(),
            };
        }
    }

    if let Some(start) = lower.find("filename=") {
        let raw = disposition[start + "filename=".len()..]
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"');
        return raw.trim().to_string();
    }

    String::new()
}

/// Copies of `artifacts` carrying a resolved `download_path`. Unresolvable
/// artifacts keep `download_path` absent.
#[must_use]
pub fn enrich_artifacts(artifacts: &[Artifact]) -> Vec<Artifact> {
    artifacts
        .iter()
        .map(|artifact| {
            let mut enriched = artifact.clone();
            let path = resolve_download_path(artifact);
            enriched.download_path = (!path.is_empty()).then_some(path);
            enriched
        })
        .collect()
}

/// Default download filename: the last `storage_path` segment, or
/// `artifact`.
#[must_use]
pub fn fallback_filename(artifact: &Artifact) -> String {
    artifact
        .storage_path
        .rsplit('/')
        .next()
        .filter(|chunk| !chunk.is_empty())
        .unwrap_or("artifact")
        .to_string()
}
