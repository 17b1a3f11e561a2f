use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::leaddb::LeadExt,
    dtos::{
        leaddtos::{
            CreateFranchiseApplicationDto, CreateListingLeadDto, CreateReviewDto,
            CreateTestimonialDto, ModerateContentDto, VisitDecisionDto,
        },
        userdtos::RequestQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{auth, role_check, AuthSession},
    models::{
        leadmodel::{ModerationStatus, Visit, VisitStatus},
        profilemodel::Role,
    },
    service::notification_service::{is_low_rating, LowRating},
    AppState,
};

pub fn lead_handler() -> Router {
    let staff_only = |state, req, next| role_check(state, req, next, Role::STAFF.to_vec());

    let protected = Router::new()
        .route(
            "/listing",
            get(get_listing_leads).layer(middleware::from_fn(staff_only)),
        )
        .route(
            "/agent",
            get(get_my_agent_leads).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![Role::Agent])
            })),
        )
        .route(
            "/visits",
            get(get_my_visits).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![Role::Agent])
            })),
        )
        .route("/visits/:visit_id", put(decide_visit))
        .route(
            "/reviews/pending",
            get(get_pending_reviews).layer(middleware::from_fn(staff_only)),
        )
        .route(
            "/reviews/:review_id",
            put(moderate_review).layer(middleware::from_fn(staff_only)),
        )
        .route(
            "/testimonials/pending",
            get(get_pending_testimonials).layer(middleware::from_fn(staff_only)),
        )
        .route(
            "/testimonials/:testimonial_id",
            put(moderate_testimonial).layer(middleware::from_fn(staff_only)),
        )
        .route(
            "/franchise",
            get(get_franchise_applications).layer(middleware::from_fn(staff_only)),
        )
        .layer(middleware::from_fn(auth));

    let public = Router::new()
        .route("/listing", post(create_listing_lead))
        .route("/reviews", post(create_review))
        .route("/testimonials", post(create_testimonial).get(get_testimonials))
        .route("/franchise", post(create_franchise_application));

    Router::new().merge(public).merge(protected)
}

pub async fn create_listing_lead(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateListingLeadDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let lead = app_state
        .db_client
        .create_listing_lead(body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("Listing lead {} received", lead.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Thank you, an agent will contact you soon",
        "data": {
            "lead": lead
        }
    })))
}

pub async fn get_listing_leads(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let leads = app_state
        .db_client
        .get_listing_leads(page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "leads": leads
        }
    })))
}

pub async fn get_my_agent_leads(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let leads = app_state
        .db_client
        .get_agent_leads(session.user_id, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "leads": leads
        }
    })))
}

pub async fn get_my_visits(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let visits = app_state
        .db_client
        .get_agent_visits(session.user_id, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "visits": visits
        }
    })))
}

/// A visit can only leave `pending`, and only the assigned agent or staff may move it.
pub fn check_visit_decision(
    session: &AuthSession,
    visit: &Visit,
    status: VisitStatus,
) -> Result<(), HttpError> {
    if visit.agent_id != session.user_id && !session.role.is_staff() {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }
    if status == VisitStatus::Pending {
        return Err(HttpError::bad_request("A visit can only be confirmed or cancelled"));
    }
    if visit.status != VisitStatus::Pending {
        return Err(HttpError::bad_request("This visit was already answered"));
    }
    Ok(())
}

pub fn answered_visit(updated: Option<Visit>) -> Result<Visit, HttpError> {
    updated.ok_or_else(|| HttpError::bad_request("This visit was already answered"))
}

pub async fn decide_visit(
    Path(visit_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<VisitDecisionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let visit = app_state
        .db_client
        .get_visit(visit_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Visit not found"))?;

    check_visit_decision(&session, &visit, body.status)?;

    // The update only matches a still-pending row, so a concurrent answer loses here.
    let visit = app_state
        .db_client
        .answer_visit(visit_id, body.status)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))
        .and_then(answered_visit)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "visit": visit
        }
    })))
}

pub async fn create_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let review = app_state
        .db_client
        .create_review(body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if is_low_rating(review.rating) {
        if let Err(e) = app_state
            .notification_service
            .notify_low_rating(LowRating::from(&review))
            .await
        {
            tracing::error!("Low rating alert for review {} failed: {}", review.id, e);
        }
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Thank you for your review, it will be published after moderation",
        "data": {
            "review": review
        }
    })))
}

fn check_content_decision(body: &ModerateContentDto) -> Result<(), HttpError> {
    if body.status == ModerationStatus::Pending {
        return Err(HttpError::bad_request("Content can only be approved or rejected"));
    }
    Ok(())
}

pub async fn get_pending_reviews(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let reviews = app_state
        .db_client
        .get_reviews_by_status(ModerationStatus::Pending, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "reviews": reviews
        }
    })))
}

pub async fn moderate_review(
    Path(review_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ModerateContentDto>,
) -> Result<impl IntoResponse, HttpError> {
    check_content_decision(&body)?;

    let review = app_state
        .db_client
        .set_review_status(review_id, body.status)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Review not found"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "review": review
        }
    })))
}

pub async fn create_testimonial(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateTestimonialDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let testimonial = app_state
        .db_client
        .create_testimonial(body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Thank you, your testimonial will be published after moderation",
        "data": {
            "testimonial": testimonial
        }
    })))
}

pub async fn get_testimonials(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let testimonials = app_state
        .db_client
        .get_testimonials_by_status(ModerationStatus::Approved, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "testimonials": testimonials
        }
    })))
}

pub async fn get_pending_testimonials(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let testimonials = app_state
        .db_client
        .get_testimonials_by_status(ModerationStatus::Pending, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "testimonials": testimonials
        }
    })))
}

pub async fn moderate_testimonial(
    Path(testimonial_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ModerateContentDto>,
) -> Result<impl IntoResponse, HttpError> {
    check_content_decision(&body)?;

    let testimonial = app_state
        .db_client
        .set_testimonial_status(testimonial_id, body.status)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Testimonial not found"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "testimonial": testimonial
        }
    })))
}

pub async fn create_franchise_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateFranchiseApplicationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let application = app_state
        .db_client
        .create_franchise_application(body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("Franchise application {} received", application.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Application received",
        "data": {
            "application": application
        }
    })))
}

pub async fn get_franchise_applications(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let applications = app_state
        .db_client
        .get_franchise_applications(page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "applications": applications
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn visit(agent_id: Uuid, status: VisitStatus) -> Visit {
        Visit {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            agent_id,
            visitor_name: "Carlos Ruiz".to_string(),
            visitor_email: "carlos@example.com".to_string(),
            visitor_phone: None,
            visit_date: NaiveDate::from_ymd_opt(2030, 5, 14).unwrap(),
            visit_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            message: None,
            status,
            created_at: Utc::now(),
        }
    }

    fn session(role: Role) -> AuthSession {
        AuthSession {
            user_id: Uuid::new_v4(),
            email: None,
            role,
            profile: None,
        }
    }

    #[test]
    fn assigned_agent_confirms_pending_visit() {
        let agent = session(Role::Agent);
        let pending = visit(agent.user_id, VisitStatus::Pending);

        assert!(check_visit_decision(&agent, &pending, VisitStatus::Confirmed).is_ok());
        assert!(check_visit_decision(&session(Role::Supervisor), &pending, VisitStatus::Cancelled).is_ok());
    }

    #[test]
    fn losing_a_concurrent_answer_is_a_bad_request() {
        let agent = session(Role::Agent);
        let answered = visit(agent.user_id, VisitStatus::Confirmed);
        assert_eq!(answered_visit(Some(answered)).unwrap().status, VisitStatus::Confirmed);

        let err = answered_visit(None).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "This visit was already answered");
    }

    #[test]
    fn other_agent_cannot_touch_visit() {
        let pending = visit(Uuid::new_v4(), VisitStatus::Pending);
        let err = check_visit_decision(&session(Role::Agent), &pending, VisitStatus::Confirmed)
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn answered_visit_stays_answered() {
        let agent = session(Role::Agent);
        let confirmed = visit(agent.user_id, VisitStatus::Confirmed);
        assert!(check_visit_decision(&agent, &confirmed, VisitStatus::Cancelled).is_err());

        let pending = visit(agent.user_id, VisitStatus::Pending);
        assert!(check_visit_decision(&agent, &pending, VisitStatus::Pending).is_err());
    }

    #[test]
    fn content_moderation_rejects_pending() {
        assert!(check_content_decision(&ModerateContentDto {
            status: ModerationStatus::Pending
        })
        .is_err());
        assert!(check_content_decision(&ModerateContentDto {
            status: ModerationStatus::Approved
        })
        .is_ok());
    }
}
