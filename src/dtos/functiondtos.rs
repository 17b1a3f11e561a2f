//! Request and response bodies of the `/functions/v1/*` handlers. The SPA sends
//! camelCase JSON to these.
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContactDto {
    pub agent_id: Uuid,
    pub property_id: Option<Uuid>,

    #[validate(length(min = 2, max = 120, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 8, max = 20, message = "Phone number must be between 8-20 characters"))]
    pub phone: Option<String>,

    #[validate(length(min = 5, max = 2000, message = "Message must be between 5 and 2000 characters"))]
    pub message: String,
}

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDescriptionDto {
    #[validate(length(min = 2, max = 200, message = "Title is required"))]
    pub title: String,
    pub property_type: Option<String>,
    pub transaction_type: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_m2: Option<f64>,
    pub city: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub language: Option<String>,
}

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponseDto {
    #[validate(length(min = 1, max = 4000, message = "Message is required"))]
    pub message: String,
    pub customer_name: Option<String>,
    pub agent_name: Option<String>,
    pub rating: Option<i16>,
    pub context: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedDescriptionDto {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedResponseDto {
    pub response: String,
}

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessageDto {
    #[validate(length(min = 2, max = 120, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    pub phone: Option<String>,

    #[validate(length(max = 200, message = "Subject must be at most 200 characters"))]
    pub subject: Option<String>,

    #[validate(length(min = 5, max = 4000, message = "Message must be between 5 and 4000 characters"))]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAgentCodeDto {
    pub user_id: Uuid,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCodeDto {
    pub agent_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAgentProfileDto {
    pub agent_code: String,
}

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyLowRatingDto {
    /// Agent, rating and comment are read from the stored review.
    pub review_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyLowRatingResultDto {
    pub notified: bool,
    pub recipients: usize,
}

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleVisitDto {
    pub property_id: Uuid,

    #[validate(length(min = 2, max = 120, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    pub phone: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponseEmailDto {
    #[validate(email(message = "Recipient email is invalid"))]
    pub to: String,

    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,

    #[validate(length(min = 1, max = 10000, message = "Message is required"))]
    pub message: String,

    pub recipient_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkDto {
    pub image_url: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkResultDto {
    pub watermarked_url: String,
    pub original_url: String,
}
