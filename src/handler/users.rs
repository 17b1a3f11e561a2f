use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::profiledb::ProfileExt,
    dtos::userdtos::{FilterProfileDto, RequestQueryDto, UpdateProfileDto},
    error::{ErrorMessage, HttpError},
    middleware::AuthSession,
    utils::phone::normalize_phone,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/notifications", get(get_notifications))
        .route("/notifications/:notification_id/read", put(mark_notification_read))
}

pub async fn update_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(mut body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    body.full_name = body.full_name.map(|name| name.trim().to_string());
    body.phone = body.phone.as_deref().map(normalize_phone);

    let profile = app_state
        .db_client
        .update_profile(session.user_id, body)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found(ErrorMessage::ProfileNotFound.to_string()),
            e => HttpError::server_error(e.to_string()),
        })?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "profile": FilterProfileDto::filter_profile(&profile)
        }
    })))
}

pub async fn get_notifications(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let notifications = app_state
        .db_client
        .get_notifications(session.user_id, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let unread = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "notifications": notifications,
            "unread": unread
        }
    })))
}

pub async fn mark_notification_read(
    Path(notification_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, HttpError> {
    let notification = app_state
        .db_client
        .mark_notification_read(session.user_id, notification_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Notification not found"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "notification": notification
        }
    })))
}
