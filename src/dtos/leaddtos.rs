use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::leadmodel::{ModerationStatus, VisitStatus};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateListingLeadDto {
    #[validate(length(min = 2, max = 120, message = "Name is required"))]
    pub full_name: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 8, max = 20, message = "Phone number must be between 8-20 characters"))]
    pub phone: String,

    #[validate(length(min = 5, max = 500, message = "Property address is required"))]
    pub property_address: String,

    pub property_type: Option<String>,
    pub transaction_type: Option<String>,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewDto {
    pub agent_id: Uuid,

    #[validate(length(min = 2, max = 120, message = "Name is required"))]
    pub reviewer_name: String,

    #[validate(email(message = "Email is invalid"))]
    pub reviewer_email: Option<String>,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateTestimonialDto {
    #[validate(length(min = 2, max = 120, message = "Name is required"))]
    pub author_name: String,

    #[validate(length(max = 120, message = "Role must be at most 120 characters"))]
    pub author_role: Option<String>,

    #[validate(length(min = 10, max = 2000, message = "Testimonial must be between 10 and 2000 characters"))]
    pub content: String,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateFranchiseApplicationDto {
    #[validate(length(min = 2, max = 120, message = "Name is required"))]
    pub full_name: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 8, max = 20, message = "Phone number must be between 8-20 characters"))]
    pub phone: String,

    #[validate(length(min = 2, max = 100, message = "City is required"))]
    pub city: String,

    pub investment_capacity: Option<String>,
    pub experience: Option<String>,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,

    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 documents can be attached"))]
    pub document_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitDecisionDto {
    pub status: VisitStatus,
}

/// Staff decision on a review or testimonial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerateContentDto {
    pub status: ModerationStatus,
}
