//! JSON functions the SPA calls directly under `/functions/v1/<name>`.
//! Failures answer `{ "error": "..." }` with a non-2xx status.
use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        leaddb::{LeadExt, NewAgentLead, NewContactMessage, NewVisit},
        profiledb::ProfileExt,
        propertydb::PropertyExt,
    },
    dtos::{
        functiondtos::{
            AgentCodeDto, AgentContactDto, ContactMessageDto, GenerateAgentCodeDto,
            GenerateDescriptionDto, GenerateResponseDto, GeneratedDescriptionDto,
            GeneratedResponseDto, GetAgentProfileDto, NotifyLowRatingDto,
            NotifyLowRatingResultDto, ScheduleVisitDto, SendResponseEmailDto, WatermarkDto,
        },
        propertydtos::PropertyCardDto,
    },
    error::FunctionError,
    mail::{mails::send_response_email, sendmail::MailError},
    middleware::{auth, role_check, AuthSession},
    models::{
        leadmodel::{ModerationStatus, Review},
        profilemodel::Role,
    },
    service::{
        agent_code::{base_code, generate_unique_code, initials},
        aura_service::AuraError,
        notification_service::LowRating,
        watermark_service::{WatermarkError, Watermarker},
    },
    utils::phone::{mask_phone, normalize_phone},
    AppState,
};

pub fn functions_handler() -> Router {
    Router::new()
        .route("/agent-contact", post(agent_contact))
        .route("/aura-generate-description", post(aura_generate_description))
        .route("/aura-generate-response", post(aura_generate_response))
        .route("/contact-message", post(contact_message))
        .route(
            "/generate-agent-code",
            post(generate_agent_code).layer(middleware::from_fn(auth)),
        )
        .route("/get-agent-profile", post(get_agent_profile))
        .route("/mapbox-public-token", get(mapbox_public_token).post(mapbox_public_token))
        .route("/notify-low-rating", post(notify_low_rating))
        .route("/schedule-property-visit", post(schedule_property_visit))
        .route(
            "/send-response-email",
            post(send_response)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(
                        state,
                        req,
                        next,
                        vec![Role::Agent, Role::OfficeManager, Role::Supervisor, Role::SuperAdmin],
                    )
                }))
                .layer(middleware::from_fn(auth)),
        )
        .route(
            "/watermark-images",
            post(watermark_images)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(
                        state,
                        req,
                        next,
                        vec![Role::Agent, Role::OfficeManager, Role::Supervisor, Role::SuperAdmin],
                    )
                }))
                .layer(middleware::from_fn(auth)),
        )
}

fn parse_body<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, FunctionError> {
    let Json(body) = payload.map_err(|e| FunctionError::bad_request(e.body_text()))?;
    body.validate()
        .map_err(|e| FunctionError::bad_request(e.to_string()))?;
    Ok(body)
}

fn db_error(e: sqlx::Error) -> FunctionError {
    tracing::error!("Database error in function handler: {}", e);
    FunctionError::internal("Database error")
}

pub fn aura_error(e: AuraError) -> FunctionError {
    tracing::error!("Aura request failed: {}", e);
    match e {
        AuraError::NotConfigured => FunctionError::internal("AI assistant is not configured"),
        AuraError::Upstream { status: 429, .. } => FunctionError::new(
            "AI assistant is busy, please try again in a moment",
            StatusCode::TOO_MANY_REQUESTS,
        ),
        AuraError::Upstream { status: 402, .. } => FunctionError::new(
            "AI assistant credits are exhausted",
            StatusCode::PAYMENT_REQUIRED,
        ),
        e => FunctionError::new(e.to_string(), StatusCode::BAD_GATEWAY),
    }
}

/// Agents generate their own code; staff may generate one for anybody.
pub fn check_agent_code_target(session: &AuthSession, user_id: Uuid) -> Result<(), FunctionError> {
    if session.user_id != user_id && !session.role.is_staff() {
        return Err(FunctionError::new(
            "You can only generate your own agent code",
            StatusCode::FORBIDDEN,
        ));
    }
    Ok(())
}

/// Only a stored review that is still awaiting moderation can raise an alert.
pub fn check_low_rating_review(review: Option<Review>) -> Result<Review, FunctionError> {
    let review = review.ok_or_else(|| FunctionError::not_found("Review not found"))?;
    if review.status != ModerationStatus::Pending {
        return Err(FunctionError::bad_request("This review was already moderated"));
    }
    Ok(review)
}

pub fn watermark_error(e: WatermarkError) -> FunctionError {
    match e {
        WatermarkError::ForeignSource(_) => FunctionError::bad_request(e.to_string()),
        e => FunctionError::internal(e.to_string()),
    }
}

/// A visit must start strictly after `now`.
pub fn check_visit_slot(slot: NaiveDateTime, now: NaiveDateTime) -> Result<(), FunctionError> {
    if slot <= now {
        return Err(FunctionError::bad_request("The visit date must be in the future"));
    }
    Ok(())
}

pub async fn agent_contact(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<AgentContactDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let body = parse_body(payload)?;

    let agent = app_state
        .db_client
        .get_profile(body.agent_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| FunctionError::not_found("Agent not found"))?;

    let property_title = match body.property_id {
        Some(property_id) => app_state
            .db_client
            .get_property_by_id(property_id)
            .await
            .map_err(db_error)?
            .map(|p| p.title),
        None => None,
    };

    let lead = app_state
        .db_client
        .create_agent_lead(NewAgentLead {
            agent_id: agent.id,
            property_id: body.property_id,
            full_name: body.name.trim().to_string(),
            email: body.email.trim().to_lowercase(),
            phone: body.phone.as_deref().map(normalize_phone),
            message: body.message.trim().to_string(),
        })
        .await
        .map_err(db_error)?;

    app_state
        .notification_service
        .notify_agent_contact(&agent, &lead, property_title.as_deref())
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "leadId": lead.id
    })))
}

pub async fn aura_generate_description(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<GenerateDescriptionDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let body = parse_body(payload)?;

    let description = app_state
        .aura_service
        .generate_description(&body)
        .await
        .map_err(aura_error)?;

    Ok(Json(GeneratedDescriptionDto { description }))
}

pub async fn aura_generate_response(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<GenerateResponseDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let body = parse_body(payload)?;

    let response = app_state
        .aura_service
        .generate_response(&body)
        .await
        .map_err(aura_error)?;

    Ok(Json(GeneratedResponseDto { response }))
}

pub async fn contact_message(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<ContactMessageDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let body = parse_body(payload)?;

    let message = app_state
        .db_client
        .create_contact_message(NewContactMessage {
            full_name: body.name.trim().to_string(),
            email: body.email.trim().to_lowercase(),
            phone: body.phone.as_deref().map(normalize_phone),
            subject: body.subject,
            message: body.message.trim().to_string(),
        })
        .await
        .map_err(db_error)?;

    let relayed = app_state
        .notification_service
        .relay_contact_message(&message)
        .await;

    Ok(Json(serde_json::json!({
        "success": true,
        "id": message.id,
        "relayed": relayed
    })))
}

pub async fn generate_agent_code(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    payload: Result<Json<GenerateAgentCodeDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let Json(body) = payload.map_err(|e| FunctionError::bad_request(e.body_text()))?;
    check_agent_code_target(&session, body.user_id)?;

    let profile = app_state
        .db_client
        .get_profile(body.user_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| FunctionError::not_found("Profile not found"))?;

    if let Some(agent_code) = profile.agent_code.filter(|c| !c.is_empty()) {
        return Ok(Json(AgentCodeDto { agent_code }));
    }

    let full_name = body
        .full_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(profile.full_name);

    let db_client = app_state.db_client.clone();
    let agent_code = generate_unique_code(base_code(&initials(&full_name)), |candidate| {
        let db_client = db_client.clone();
        async move { db_client.agent_code_exists(&candidate).await }
    })
    .await
    .map_err(db_error)?
    .ok_or_else(|| FunctionError::internal("Could not generate a unique agent code"))?;

    let profile = app_state
        .db_client
        .set_agent_code(body.user_id, &agent_code)
        .await
        .map_err(db_error)?;

    tracing::info!("Assigned agent code {} to {}", agent_code, profile.id);

    Ok(Json(AgentCodeDto { agent_code }))
}

pub async fn get_agent_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<GetAgentProfileDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let Json(body) = payload.map_err(|e| FunctionError::bad_request(e.body_text()))?;
    let agent_code = body.agent_code.trim().to_uppercase();
    if agent_code.is_empty() {
        return Err(FunctionError::bad_request("Agent code is required"));
    }

    let agent = app_state
        .db_client
        .get_profile_by_agent_code(&agent_code)
        .await
        .map_err(db_error)?
        .ok_or_else(|| FunctionError::not_found("Agent not found"))?;

    let properties = app_state
        .db_client
        .get_public_properties_by_agent(agent.id)
        .await
        .map_err(db_error)?;

    let reviews = app_state
        .db_client
        .get_approved_reviews_for_agent(agent.id)
        .await
        .map_err(db_error)?;

    let summary = app_state
        .db_client
        .get_agent_rating_summary(agent.id)
        .await
        .map_err(db_error)?;

    let cards: Vec<PropertyCardDto> = properties.iter().map(PropertyCardDto::from_property).collect();

    Ok(Json(serde_json::json!({
        "agent": {
            "id": agent.id,
            "fullName": agent.full_name,
            "agentCode": agent.agent_code,
            "avatarUrl": agent.avatar_url,
            "bio": agent.bio,
            "office": agent.office,
            "phone": agent.phone.as_deref().map(mask_phone)
        },
        "properties": cards,
        "reviews": reviews,
        "averageRating": summary.average_rating,
        "reviewCount": summary.review_count
    })))
}

pub async fn mapbox_public_token(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, FunctionError> {
    let token = app_state
        .env
        .mapbox_public_token
        .clone()
        .ok_or_else(|| FunctionError::internal("Mapbox token not configured"))?;

    Ok(Json(serde_json::json!({ "token": token })))
}

pub async fn notify_low_rating(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<NotifyLowRatingDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let body = parse_body(payload)?;

    let review = app_state
        .db_client
        .get_review(body.review_id)
        .await
        .map_err(db_error)
        .and_then(check_low_rating_review)?;

    let recipients = app_state
        .notification_service
        .notify_low_rating(LowRating::from(&review))
        .await?;

    Ok(Json(NotifyLowRatingResultDto {
        notified: recipients > 0,
        recipients,
    }))
}

pub async fn schedule_property_visit(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<ScheduleVisitDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let body = parse_body(payload)?;
    check_visit_slot(NaiveDateTime::new(body.date, body.time), Utc::now().naive_utc())?;

    let property = app_state
        .db_client
        .get_property_by_id(body.property_id)
        .await
        .map_err(db_error)?
        .filter(|p| p.is_public())
        .ok_or_else(|| FunctionError::not_found("Property not found"))?;

    let agent = app_state
        .db_client
        .get_profile(property.agent_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| FunctionError::not_found("Agent not found"))?;

    let visit = app_state
        .db_client
        .create_visit(NewVisit {
            property_id: property.id,
            agent_id: agent.id,
            visitor_name: body.name.trim().to_string(),
            visitor_email: body.email.trim().to_lowercase(),
            visitor_phone: body.phone.as_deref().map(normalize_phone),
            visit_date: body.date,
            visit_time: body.time,
            message: body.message,
        })
        .await
        .map_err(db_error)?;

    app_state
        .notification_service
        .notify_visit_requested(&agent, &visit, &property.title)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "visit": visit
    })))
}

pub async fn send_response(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<SendResponseEmailDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let body = parse_body(payload)?;

    send_response_email(
        &app_state.mailer,
        body.to.trim(),
        body.subject.trim(),
        body.recipient_name.as_deref(),
        &body.message,
    )
    .await
    .map_err(|e| match e {
        MailError::InvalidRecipient(_) => FunctionError::bad_request(e.to_string()),
        e => FunctionError::internal(e.to_string()),
    })?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn watermark_images(
    Extension(app_state): Extension<Arc<AppState>>,
    payload: Result<Json<WatermarkDto>, JsonRejection>,
) -> Result<impl IntoResponse, FunctionError> {
    let Json(body) = payload.map_err(|e| FunctionError::bad_request(e.body_text()))?;
    if body.image_url.trim().is_empty() {
        return Err(FunctionError::bad_request("imageUrl is required"));
    }

    let result = app_state
        .watermark_service
        .watermark(body.image_url.trim())
        .await
        .map_err(|e| {
            tracing::error!("Watermarking {} failed: {}", body.image_url, e);
            watermark_error(e)
        })?;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveTime};

    #[test]
    fn visit_slot_must_be_in_the_future() {
        let now = NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        assert!(check_visit_slot(now + Duration::hours(1), now).is_ok());
        assert!(check_visit_slot(now, now).is_err());

        let err = check_visit_slot(now - Duration::days(1), now).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn aura_errors_map_to_statuses() {
        assert_eq!(
            aura_error(AuraError::NotConfigured).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            aura_error(AuraError::Upstream {
                status: 429,
                message: "rate limited".to_string()
            })
            .status,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            aura_error(AuraError::EmptyCompletion).status,
            StatusCode::BAD_GATEWAY
        );
    }

    fn session(role: Role) -> AuthSession {
        AuthSession {
            user_id: Uuid::new_v4(),
            email: None,
            role,
            profile: None,
        }
    }

    fn review(status: ModerationStatus) -> Review {
        Review {
            id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            reviewer_name: "Lucía Gómez".to_string(),
            reviewer_email: None,
            rating: 1,
            comment: Some("No respondió".to_string()),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn agents_only_generate_their_own_code() {
        let agent = session(Role::Agent);
        assert!(check_agent_code_target(&agent, agent.user_id).is_ok());

        let err = check_agent_code_target(&agent, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let client = session(Role::Client);
        assert!(check_agent_code_target(&client, Uuid::new_v4()).is_err());

        let manager = session(Role::OfficeManager);
        assert!(check_agent_code_target(&manager, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn low_rating_alert_needs_a_stored_pending_review() {
        assert_eq!(
            check_low_rating_review(None).unwrap_err().status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            check_low_rating_review(Some(review(ModerationStatus::Approved)))
                .unwrap_err()
                .status,
            StatusCode::BAD_REQUEST
        );

        let pending = review(ModerationStatus::Pending);
        let low_rating_agent = pending.agent_id;
        let checked = check_low_rating_review(Some(pending)).unwrap();
        let alert = LowRating::from(&checked);
        assert_eq!(alert.agent_id, low_rating_agent);
        assert_eq!(alert.rating, 1);
        assert_eq!(alert.review_id, Some(checked.id));
    }

    #[test]
    fn foreign_watermark_sources_are_bad_requests() {
        assert_eq!(
            watermark_error(WatermarkError::ForeignSource("http://169.254.169.254/".into())).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            watermark_error(WatermarkError::Decode("bad header".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
