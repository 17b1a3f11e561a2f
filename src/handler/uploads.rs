use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};

use crate::{
    dtos::uploaddtos::{FileListDto, RemoveFileDto},
    error::HttpError,
    middleware::{request_language, AuthSession},
    service::upload_service::{remove_at, PendingFile, UploadKind},
    utils::i18n::{translate, translate_with, Language},
    AppState,
};

/// Largest multipart body accepted; per-kind limits are checked afterwards.
pub const MAX_UPLOAD_BODY_BYTES: usize = 110 * 1024 * 1024;

pub fn upload_handler() -> Router {
    Router::new()
        .route("/remove", post(remove_file))
        .route(
            "/:kind",
            post(upload_files).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<PendingFile>,
    pub existing: Vec<String>,
    pub max_files: Option<usize>,
    pub max_size_mb: Option<u64>,
}

fn invalid_field(lang: Language, field: &str) -> HttpError {
    HttpError::bad_request(translate_with(
        lang,
        "upload.invalid_field",
        &[("field", field.to_string())],
    ))
}

/// `existing` may be sent once as a JSON array or repeated as plain fields.
/// A malformed array is rejected so prior URLs are never silently dropped.
pub fn parse_existing(value: &str, lang: Language) -> Result<Vec<String>, HttpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(trimmed)
            .map_err(|_| invalid_field(lang, "existing"));
    }
    Ok(vec![trimmed.to_string()])
}

/// Blank means "use the server limit"; anything else must be a number.
pub fn parse_limit<T: std::str::FromStr>(
    value: &str,
    field: &str,
    lang: Language,
) -> Result<Option<T>, HttpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| invalid_field(lang, field))
}

async fn read_form(mut multipart: Multipart, lang: Language) -> Result<UploadForm, HttpError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "files" | "file" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?
                    .to_vec();
                form.files.push(PendingFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            "existing" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                form.existing.extend(parse_existing(&text, lang)?);
            }
            "max_files" | "maxFiles" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                form.max_files = parse_limit(&text, &name, lang)?;
            }
            "max_size_mb" | "maxSizeMB" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                form.max_size_mb = parse_limit(&text, &name, lang)?;
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn upload_files(
    Path(kind): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let lang = request_language(&headers);

    let kind = UploadKind::parse(&kind)
        .ok_or_else(|| HttpError::bad_request(translate(lang, "upload.unknown_kind")))?;

    let form = read_form(multipart, lang).await?;
    let limits = kind
        .default_limits()
        .narrowed(form.max_files, form.max_size_mb);

    let urls = app_state
        .upload_service
        .upload_batch(kind, limits, form.existing, form.files)
        .await
        .map_err(|e| e.into_http_error(lang))?;

    tracing::info!(
        "User {} now holds {} file(s) in {}",
        session.user_id,
        urls.len(),
        kind.bucket()
    );

    Ok(Json(FileListDto {
        status: "success".to_string(),
        kind: Some(kind),
        urls,
    }))
}

/// Drops one entry from the caller's list. The stored object is left in place.
pub async fn remove_file(
    headers: HeaderMap,
    Json(body): Json<RemoveFileDto>,
) -> Result<impl IntoResponse, HttpError> {
    let lang = request_language(&headers);

    let urls = remove_at(&body.urls, body.index).map_err(|e| e.into_http_error(lang))?;

    Ok(Json(FileListDto {
        status: "success".to_string(),
        kind: None,
        urls,
    }))
}
