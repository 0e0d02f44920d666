use axum::http::{HeaderMap, StatusCode, header};
use std::path::{Path, PathBuf};

use crate::settings;

/// Base of returned image URLs: the configured public URL, or the request's
/// own host.
pub(crate) fn public_base_url(settings: &settings::Settings, headers: &HeaderMap) -> String {
    if let Some(url) = settings.server_public_url.as_deref() {
        return url.to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

/// Resolves `name` inside the output directory, refusing anything that
/// escapes it.
pub(crate) fn resolve_image_path(dir: &Path, name: &str) -> Result<PathBuf, StatusCode> {
    if name.trim().is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    let canonical_dir = std::fs::canonicalize(dir).map_err(|_| StatusCode::NOT_FOUND)?;
    let canonical_path =
        std::fs::canonicalize(dir.join(name)).map_err(|_| StatusCode::NOT_FOUND)?;
    if !canonical_path.starts_with(&canonical_dir) {
        return Err(StatusCode::FORBIDDEN);
    }
    if !canonical_path.is_file() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(canonical_path)
}
