use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{uploaddtos::ClientErrorReportDto, userdtos::RequestQueryDto},
    error::HttpError,
    middleware::{auth, role_check},
    models::profilemodel::Role,
    service::error_log::{ErrorLogEntry, ErrorOrigin},
    utils::i18n::{full_table, Language},
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route(
            "/admin/error-log",
            get(get_error_log)
                .delete(clear_error_log)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![Role::SuperAdmin])
                }))
                .layer(middleware::from_fn(auth)),
        )
        .route("/client-errors", post(report_client_error))
        .route("/translations/:lang", get(get_translations))
}

pub async fn get_error_log(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let limit = query.limit.unwrap_or(50);
    let entries = app_state.error_log.recent(limit);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "entries": entries,
            "total": app_state.error_log.len()
        }
    })))
}

pub async fn clear_error_log(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let removed = app_state.error_log.clear();
    tracing::info!("Error log cleared, {} entries removed", removed);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "removed": removed
        }
    })))
}

pub fn client_entry(report: ClientErrorReportDto) -> Result<ErrorLogEntry, HttpError> {
    if report.message.trim().is_empty() {
        return Err(HttpError::bad_request("Error message is required"));
    }

    let mut entry = ErrorLogEntry::new(ErrorOrigin::Client, report.message.trim());
    entry.source = report.source;
    entry.stack = report.stack;
    entry.url = report.url;
    Ok(entry)
}

pub async fn report_client_error(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ClientErrorReportDto>,
) -> Result<impl IntoResponse, HttpError> {
    let entry = client_entry(body)?;
    let id = entry.id;
    app_state.error_log.record(entry);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "id": id
        }
    })))
}

pub async fn get_translations(Path(lang): Path<String>) -> Result<impl IntoResponse, HttpError> {
    let language = Language::from_code(&lang)
        .ok_or_else(|| HttpError::not_found(format!("Unsupported language: {}", lang)))?;

    let translations: BTreeMap<&str, &str> = full_table(language).into_iter().collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "language": language,
            "translations": translations
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_report_becomes_client_entry() {
        let entry = client_entry(ClientErrorReportDto {
            message: "  TypeError: x is undefined ".to_string(),
            source: Some("app.js".to_string()),
            stack: None,
            url: Some("/propiedades".to_string()),
        })
        .unwrap();

        assert_eq!(entry.origin, ErrorOrigin::Client);
        assert_eq!(entry.message, "TypeError: x is undefined");
        assert_eq!(entry.url.as_deref(), Some("/propiedades"));
    }

    #[test]
    fn blank_client_report_is_rejected() {
        let err = client_entry(ClientErrorReportDto {
            message: "   ".to_string(),
            source: None,
            stack: None,
            url: None,
        })
        .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
