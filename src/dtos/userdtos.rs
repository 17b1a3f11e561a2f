use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::profilemodel::{Profile, Role},
    service::roles::AccessDecision,
};

#[derive(Serialize, Deserialize, Validate)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

impl RequestQueryDto {
    pub fn page_and_limit(&self) -> (u32, usize) {
        (self.page.unwrap_or(1) as u32, self.limit.unwrap_or(10))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterProfileDto {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub agent_code: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub office: Option<String>,
}

impl FilterProfileDto {
    pub fn filter_profile(profile: &Profile) -> Self {
        FilterProfileDto {
            id: profile.id.to_string(),
            full_name: profile.full_name.to_owned(),
            email: profile.email.to_owned(),
            phone: profile.phone.to_owned(),
            agent_code: profile.agent_code.to_owned(),
            avatar_url: profile.avatar_url.to_owned(),
            bio: profile.bio.to_owned(),
            office: profile.office.to_owned(),
        }
    }
}

/// What the SPA needs right after sign-in: who the user is and where to send them.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRoleDto {
    pub role: Role,
    pub display_name: String,
    pub dashboard_path: String,
}

impl SessionRoleDto {
    pub fn from_role(role: Role) -> Self {
        SessionRoleDto {
            role,
            display_name: role.display_name().to_string(),
            dashboard_path: role.dashboard_path().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponseDto {
    pub status: String,
    pub profile: Option<FilterProfileDto>,
    pub session: SessionRoleDto,
}

/// `required` is a comma-separated list of role ids or display names.
#[derive(Debug, Deserialize)]
pub struct GuardQueryDto {
    pub required: String,
}

#[derive(Debug, Serialize)]
pub struct GuardResponseDto {
    pub status: &'static str,
    pub decision: AccessDecision,
    pub session: Option<SessionRoleDto>,
    pub redirect_to: Option<String>,
    pub message: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 2, max = 120, message = "Full name must be between 2-120 characters"))]
    pub full_name: Option<String>,

    #[validate(length(min = 8, max = 20, message = "Phone number must be between 8-20 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,
}
