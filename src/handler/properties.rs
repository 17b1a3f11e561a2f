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
    db::propertydb::{PropertyExt, PropertySearchFilters},
    dtos::{
        propertydtos::{
            ArchivePropertyDto, ConcludePropertyDto, CreatePropertyDto, ModeratePropertyDto,
            PropertyCardDto, PropertySearchQueryDto, UpdatePropertyMediaDto,
        },
        userdtos::RequestQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{auth, role_check, AuthSession},
    models::{
        profilemodel::Role,
        propertymodel::{Property, PropertyStatus},
    },
    AppState,
};

pub fn property_handler() -> Router {
    let protected = Router::new()
        .route(
            "/",
            post(create_property).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![Role::Agent])
            })),
        )
        .route(
            "/mine",
            get(get_my_properties).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![Role::Agent])
            })),
        )
        .route(
            "/pending",
            get(get_pending_properties).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Role::STAFF.to_vec())
            })),
        )
        .route(
            "/:property_id/moderate",
            put(moderate_property).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Role::STAFF.to_vec())
            })),
        )
        .route("/:property_id/archive", put(archive_property))
        .route("/:property_id/unarchive", put(unarchive_property))
        .route("/:property_id/concluded", put(set_concluded_status))
        .route("/:property_id/media", put(update_property_media))
        .layer(middleware::from_fn(auth));

    let public = Router::new()
        .route("/", get(get_public_properties))
        .route("/:property_id", get(get_property));

    Router::new().merge(public).merge(protected)
}

/// The listing agent and office staff may change a listing.
pub fn ensure_can_manage(session: &AuthSession, property: &Property) -> Result<(), HttpError> {
    if property.agent_id == session.user_id || session.role.is_staff() {
        Ok(())
    } else {
        Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()))
    }
}

async fn load_property(app_state: &AppState, property_id: Uuid) -> Result<Property, HttpError> {
    app_state
        .db_client
        .get_property_by_id(property_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::PropertyNotFound.to_string()))
}

pub async fn create_property(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<CreatePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    body.validate_coordinates().map_err(HttpError::bad_request)?;

    let property = app_state
        .db_client
        .create_property(session.user_id, body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("Agent {} created property {}", session.user_id, property.id);

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Property created and sent for review",
        "data": {
            "property": property
        }
    })))
}

pub async fn get_public_properties(
    Query(query): Query<PropertySearchQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let page = query.page.unwrap_or(1).max(1) as u32;
    let limit = query.limit.unwrap_or(12).clamp(1, 50);

    let filters = PropertySearchFilters {
        property_type: query.property_type,
        transaction_type: query.transaction_type,
        city: query.city.filter(|c| !c.trim().is_empty()),
        min_price: query.min_price,
        max_price: query.max_price,
        bedrooms: query.bedrooms,
    };

    let properties = app_state
        .db_client
        .get_public_properties(filters, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cards: Vec<PropertyCardDto> = properties.iter().map(PropertyCardDto::from_property).collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "properties": cards,
            "page": page,
            "limit": limit
        }
    })))
}

pub async fn get_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let property = load_property(&app_state, property_id).await?;

    if !property.is_public() {
        return Err(HttpError::not_found(ErrorMessage::PropertyNotFound.to_string()));
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "property": property
        }
    })))
}

pub async fn get_my_properties(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let properties = app_state
        .db_client
        .get_properties_by_agent(session.user_id, page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "properties": properties
        }
    })))
}

pub async fn get_pending_properties(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (page, limit) = query.page_and_limit();

    let properties = app_state
        .db_client
        .get_pending_properties(page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "properties": properties
        }
    })))
}

pub fn check_moderation(body: &ModeratePropertyDto) -> Result<(), HttpError> {
    match body.status {
        PropertyStatus::Pending => Err(HttpError::bad_request(
            "A listing can only be approved or rejected",
        )),
        PropertyStatus::Rejected if body.reason.as_deref().map_or(true, |r| r.trim().is_empty()) => {
            Err(HttpError::bad_request("A rejection needs a reason"))
        }
        _ => Ok(()),
    }
}

pub async fn moderate_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<ModeratePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    check_moderation(&body)?;

    load_property(&app_state, property_id).await?;

    let reason = match body.status {
        PropertyStatus::Rejected => body.reason,
        _ => None,
    };

    let property = app_state
        .db_client
        .moderate_property(property_id, body.status, reason)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!(
        "Property {} moderated to {:?} by {}",
        property_id,
        property.status,
        session.user_id
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "property": property
        }
    })))
}

async fn change_archived(
    app_state: &AppState,
    session: &AuthSession,
    property_id: Uuid,
    archived: bool,
    body: ArchivePropertyDto,
) -> Result<Property, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let property = load_property(app_state, property_id).await?;
    ensure_can_manage(session, &property)?;

    app_state
        .db_client
        .set_property_archived(property_id, archived, body.justification.trim().to_string())
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))
}

pub async fn archive_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<ArchivePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let property = change_archived(&app_state, &session, property_id, true, body).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Property archived",
        "data": {
            "property": property
        }
    })))
}

pub async fn unarchive_property(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<ArchivePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let property = change_archived(&app_state, &session, property_id, false, body).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Property restored",
        "data": {
            "property": property
        }
    })))
}

pub async fn set_concluded_status(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<ConcludePropertyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let property = load_property(&app_state, property_id).await?;
    ensure_can_manage(&session, &property)?;

    let property = app_state
        .db_client
        .set_concluded_status(property_id, body.concluded_status)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "property": property
        }
    })))
}

pub async fn update_property_media(
    Path(property_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(body): Json<UpdatePropertyMediaDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let property = load_property(&app_state, property_id).await?;
    ensure_can_manage(&session, &property)?;

    let property = app_state
        .db_client
        .update_property_media(property_id, body.image_urls, body.plan_urls)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "property": property
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::propertymodel::{ConcludedStatus, CurrencyType, PropertyType, TransactionType};
    use chrono::Utc;
    use sqlx::types::BigDecimal;

    fn property(agent_id: Uuid) -> Property {
        Property {
            id: Uuid::new_v4(),
            agent_id,
            title: "Departamento en Polanco".to_string(),
            description: "Departamento amplio con vista al parque".to_string(),
            property_type: PropertyType::Apartment,
            transaction_type: TransactionType::Rent,
            price: BigDecimal::from(25000),
            currency: CurrencyType::Mxn,
            bedrooms: Some(2),
            bathrooms: Some(2),
            area_m2: None,
            address: "Av. Presidente Masaryk 100".to_string(),
            city: "Ciudad de México".to_string(),
            latitude: None,
            longitude: None,
            image_urls: vec![],
            plan_urls: vec![],
            status: PropertyStatus::Approved,
            rejection_reason: None,
            concluded_status: ConcludedStatus::None,
            is_archived: false,
            archive_justification: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
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
    fn owner_and_staff_can_manage_listing() {
        let owner = session(Role::Agent);
        let listing = property(owner.user_id);

        assert!(ensure_can_manage(&owner, &listing).is_ok());
        assert!(ensure_can_manage(&session(Role::OfficeManager), &listing).is_ok());

        let err = ensure_can_manage(&session(Role::Agent), &listing).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
        assert!(ensure_can_manage(&session(Role::Client), &listing).is_err());
    }

    #[test]
    fn rejection_requires_reason() {
        let reject = ModeratePropertyDto {
            status: PropertyStatus::Rejected,
            reason: None,
        };
        assert!(check_moderation(&reject).is_err());

        let approve = ModeratePropertyDto {
            status: PropertyStatus::Approved,
            reason: None,
        };
        assert!(check_moderation(&approve).is_ok());

        let pending = ModeratePropertyDto {
            status: PropertyStatus::Pending,
            reason: None,
        };
        assert!(check_moderation(&pending).is_err());
    }
}
