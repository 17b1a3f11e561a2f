use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "moderation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "visit_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VisitStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// Owner asking the office to represent their property.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ListingLead {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub property_address: String,
    pub property_type: Option<String>,
    pub transaction_type: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AgentLead {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub property_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Visit {
    pub id: Uuid,
    pub property_id: Uuid,
    pub agent_id: Uuid,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visitor_phone: Option<String>,
    pub visit_date: NaiveDate,
    pub visit_time: NaiveTime,
    pub message: Option<String>,
    pub status: VisitStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Review {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub reviewer_name: String,
    pub reviewer_email: Option<String>,
    pub rating: i16,
    pub comment: Option<String>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Testimonial {
    pub id: Uuid,
    pub author_name: String,
    pub author_role: Option<String>,
    pub content: String,
    pub rating: Option<i16>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct FranchiseApplication {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub investment_capacity: Option<String>,
    pub experience: Option<String>,
    pub message: Option<String>,
    pub document_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ContactMessage {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
