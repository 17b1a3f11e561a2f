use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::profilemodel::{Profile, Role},
    service::{
        error_log::{ErrorLogEntry, ErrorOrigin},
        roles::{authorize, resolve_user_role, AccessDecision},
        session_activity::Activity,
    },
    utils::{
        i18n::{translate, Language},
        token,
    },
    AppState,
};

/// Who is calling, resolved once per request by `auth`.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub profile: Option<Profile>,
}

pub fn request_language(headers: &HeaderMap) -> Language {
    Language::from_accept_language(
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    )
}

pub fn extract_token(cookie_jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_owned())
        })
        .filter(|token| !token.is_empty())
}

/// Validates the token, applies the inactivity timeout and resolves the role.
pub async fn authenticate(
    app_state: &AppState,
    token: &str,
    lang: Language,
) -> Result<AuthSession, HttpError> {
    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    if app_state.session_activity.touch(user_id, claims.iat) == Activity::Expired {
        return Err(HttpError::unauthorized(translate(lang, "auth.session_expired")));
    }

    let metadata_role = claims.metadata_role();
    let resolved =
        resolve_user_role(app_state.db_client.as_ref(), user_id, metadata_role.as_deref()).await;

    Ok(AuthSession {
        user_id,
        email: claims.email,
        role: resolved.role,
        profile: resolved.profile,
    })
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let lang = request_language(req.headers());

    let token = extract_token(&cookie_jar, req.headers())
        .ok_or_else(|| HttpError::unauthorized(translate(lang, "auth.login_required")))?;

    let session = authenticate(&app_state, &token, lang).await?;

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

pub async fn role_check(
    Extension(_app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
    required_roles: Vec<Role>,
) -> Result<impl IntoResponse, HttpError> {
    let lang = request_language(req.headers());
    let role = req.extensions().get::<AuthSession>().map(|s| s.role);

    match authorize(role, &required_roles) {
        AccessDecision::Allowed => Ok(next.run(req).await),
        AccessDecision::Denied => Err(HttpError::forbidden(translate(lang, "auth.access_denied"))),
        AccessDecision::RedirectToLogin => {
            Err(HttpError::unauthorized(translate(lang, "auth.login_required")))
        }
    }
}

/// Copies every 5xx answer into the in-process error log.
pub async fn record_server_errors(
    Extension(app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if response.status().is_server_error() {
        let mut entry = ErrorLogEntry::new(
            ErrorOrigin::Server,
            format!("{} {} answered {}", method, path, response.status()),
        );
        entry.url = Some(path);
        app_state.error_log.record(entry);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        let jar = CookieJar::new().add(Cookie::new("token", "from-cookie"));
        assert_eq!(extract_token(&jar, &headers).as_deref(), Some("from-cookie"));

        assert_eq!(
            extract_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn missing_or_malformed_authorization_has_no_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&CookieJar::new(), &headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_token(&CookieJar::new(), &headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(extract_token(&CookieJar::new(), &headers).is_none());
    }

    #[test]
    fn language_comes_from_accept_language() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_language(&headers), Language::Es);
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR,pt;q=0.9"));
        assert_eq!(request_language(&headers), Language::Pt);
    }
}
