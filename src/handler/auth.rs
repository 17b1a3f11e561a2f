use std::sync::Arc;

use axum::{
    extract::Query,
    http::HeaderMap,
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    dtos::userdtos::{
        FilterProfileDto, GuardQueryDto, GuardResponseDto, MeResponseDto, SessionRoleDto,
    },
    error::HttpError,
    middleware::{auth, authenticate, extract_token, request_language, AuthSession},
    models::profilemodel::Role,
    service::roles::{authorize, AccessDecision},
    utils::i18n::translate,
    AppState,
};

pub const LOGIN_PATH: &str = "/auth";

pub fn auth_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).layer(middleware::from_fn(auth)))
        .route("/guard", get(guard))
}

pub async fn get_me(
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, HttpError> {
    let response = MeResponseDto {
        status: "success".to_string(),
        profile: session.profile.as_ref().map(FilterProfileDto::filter_profile),
        session: SessionRoleDto::from_role(session.role),
    };

    Ok(Json(response))
}

pub fn parse_required_roles(required: &str) -> Result<Vec<Role>, String> {
    required
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| Role::parse(r).ok_or_else(|| format!("Unknown role: {}", r)))
        .collect()
}

/// Decides whether the caller may open a page protected by `required`.
/// Works with or without a session: no session means a login redirect.
pub async fn guard(
    Query(query): Query<GuardQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let lang = request_language(&headers);
    let required = parse_required_roles(&query.required).map_err(HttpError::bad_request)?;

    let session = match extract_token(&cookie_jar, &headers) {
        Some(token) => match authenticate(&app_state, &token, lang).await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Guard treating caller as signed out: {}", e.message);
                None
            }
        },
        None => None,
    };

    let role = session.as_ref().map(|s| s.role);
    let decision = authorize(role, &required);

    let (redirect_to, message) = match decision {
        AccessDecision::Allowed => (None, None),
        AccessDecision::Denied => (
            role.map(|r| r.dashboard_path().to_string()),
            Some(translate(lang, "auth.access_denied").to_string()),
        ),
        AccessDecision::RedirectToLogin => (
            Some(LOGIN_PATH.to_string()),
            Some(translate(lang, "auth.login_required").to_string()),
        ),
    };

    Ok(Json(GuardResponseDto {
        status: "success",
        decision,
        session: role.map(SessionRoleDto::from_role),
        redirect_to,
        message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_roles_accept_ids_and_display_names() {
        assert_eq!(
            parse_required_roles("agent, Gerente de Oficina").unwrap(),
            vec![Role::Agent, Role::OfficeManager]
        );
        assert!(parse_required_roles("agent,landlord").is_err());
        assert!(parse_required_roles("").unwrap().is_empty());
    }
}
