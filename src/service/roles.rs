// service/roles.rs
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, profiledb::ProfileExt},
    models::profilemodel::{Profile, Role},
};

/// Role used when no signal is available or a lookup fails.
pub const DEFAULT_ROLE: Role = Role::Client;

/// Role assigned when a role string is present but unrecognised.
pub const UNKNOWN_ROLE_FALLBACK: Role = Role::Agent;

#[derive(Debug, Default, Clone)]
pub struct RoleSignals<'a> {
    pub is_super_admin: bool,
    pub assigned_role: Option<&'a str>,
    pub metadata_role: Option<&'a str>,
}

/// Super admin flag beats the role row, which beats signup metadata.
pub fn resolve_role(signals: &RoleSignals<'_>) -> Role {
    if signals.is_super_admin {
        return Role::SuperAdmin;
    }

    let raw = signals
        .assigned_role
        .filter(|r| !r.trim().is_empty())
        .or_else(|| signals.metadata_role.filter(|r| !r.trim().is_empty()));

    match raw {
        Some(value) => Role::parse(value).unwrap_or_else(|| {
            tracing::warn!("Unrecognised role '{}', using {}", value, UNKNOWN_ROLE_FALLBACK.to_str());
            UNKNOWN_ROLE_FALLBACK
        }),
        None => DEFAULT_ROLE,
    }
}

#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error>;

    async fn role_assignment(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error>;
}

#[async_trait]
impl RoleLookup for DBClient {
    async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        self.get_profile(user_id).await
    }

    async fn role_assignment(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        self.get_role_assignment(user_id).await
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedRole {
    pub role: Role,
    pub profile: Option<Profile>,
    /// Set when a lookup failed and the role fell back to the default.
    pub degraded: bool,
}

/// The one entry point every consumer uses to decide a user's role.
pub async fn resolve_user_role(
    lookup: &dyn RoleLookup,
    user_id: Uuid,
    metadata_role: Option<&str>,
) -> ResolvedRole {
    let profile = match lookup.profile(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Profile lookup failed for {}: {}", user_id, e);
            return ResolvedRole {
                role: DEFAULT_ROLE,
                profile: None,
                degraded: true,
            };
        }
    };

    if profile.as_ref().is_some_and(|p| p.is_super_admin) {
        return ResolvedRole {
            role: Role::SuperAdmin,
            profile,
            degraded: false,
        };
    }

    let assigned = match lookup.role_assignment(user_id).await {
        Ok(assigned) => assigned,
        Err(e) => {
            tracing::error!("Role lookup failed for {}: {}", user_id, e);
            return ResolvedRole {
                role: DEFAULT_ROLE,
                profile,
                degraded: true,
            };
        }
    };

    let role = resolve_role(&RoleSignals {
        is_super_admin: false,
        assigned_role: assigned.as_deref(),
        metadata_role,
    });

    ResolvedRole {
        role,
        profile,
        degraded: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed,
    Denied,
    RedirectToLogin,
}

pub fn authorize(role: Option<Role>, required: &[Role]) -> AccessDecision {
    match role {
        None => AccessDecision::RedirectToLogin,
        Some(role) if required.is_empty() || required.contains(&role) => AccessDecision::Allowed,
        Some(_) => AccessDecision::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct FakeLookup {
        profile: Result<Option<Profile>, ()>,
        assigned: Result<Option<String>, ()>,
    }

    #[async_trait]
    impl RoleLookup for FakeLookup {
        async fn profile(&self, _user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
            self.profile.clone().map_err(|_| sqlx::Error::PoolTimedOut)
        }

        async fn role_assignment(&self, _user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
            self.assigned.clone().map_err(|_| sqlx::Error::PoolTimedOut)
        }
    }

    fn profile(is_super_admin: bool) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            full_name: "Lucía Fernández".to_string(),
            email: Some("lucia@example.com".to_string()),
            phone: None,
            agent_code: None,
            avatar_url: None,
            bio: None,
            office: None,
            is_super_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn super_admin_flag_wins_over_role_row() {
        let role = resolve_role(&RoleSignals {
            is_super_admin: true,
            assigned_role: Some("agent"),
            metadata_role: Some("client"),
        });
        assert_eq!(role.dashboard_path(), "/dashboard/admin");
    }

    #[test]
    fn role_row_agent_lands_on_agent_dashboard() {
        let role = resolve_role(&RoleSignals {
            is_super_admin: false,
            assigned_role: Some("agent"),
            metadata_role: Some("client"),
        });
        assert_eq!(role, Role::Agent);
        assert_eq!(role.dashboard_path(), "/dashboard/agent");
    }

    #[test]
    fn metadata_role_used_without_role_row() {
        let role = resolve_role(&RoleSignals {
            assigned_role: None,
            metadata_role: Some("office_manager"),
            ..Default::default()
        });
        assert_eq!(role, Role::OfficeManager);
    }

    #[test]
    fn no_signal_defaults_to_client_and_unknown_to_agent() {
        assert_eq!(resolve_role(&RoleSignals::default()), Role::Client);
        assert_eq!(
            resolve_role(&RoleSignals {
                assigned_role: Some("landlord"),
                ..Default::default()
            }),
            Role::Agent
        );
    }

    #[tokio::test]
    async fn super_admin_profile_skips_role_row() {
        let lookup = FakeLookup {
            profile: Ok(Some(profile(true))),
            assigned: Err(()),
        };
        let resolved = resolve_user_role(&lookup, Uuid::new_v4(), Some("agent")).await;
        assert_eq!(resolved.role, Role::SuperAdmin);
        assert!(!resolved.degraded);
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_default() {
        let lookup = FakeLookup {
            profile: Ok(Some(profile(false))),
            assigned: Err(()),
        };
        let resolved = resolve_user_role(&lookup, Uuid::new_v4(), Some("agent")).await;
        assert_eq!(resolved.role, DEFAULT_ROLE);
        assert!(resolved.degraded);
        assert!(resolved.profile.is_some());
    }

    #[tokio::test]
    async fn role_row_read_through_lookup() {
        let lookup = FakeLookup {
            profile: Ok(None),
            assigned: Ok(Some("supervisor".to_string())),
        };
        let resolved = resolve_user_role(&lookup, Uuid::new_v4(), None).await;
        assert_eq!(resolved.role, Role::Supervisor);
    }

    #[test]
    fn authorize_decisions() {
        assert_eq!(authorize(None, &[Role::Agent]), AccessDecision::RedirectToLogin);
        assert_eq!(authorize(Some(Role::Agent), &[Role::Agent]), AccessDecision::Allowed);
        assert_eq!(
            authorize(Some(Role::Client), &[Role::Agent, Role::OfficeManager]),
            AccessDecision::Denied
        );
        assert_eq!(authorize(Some(Role::Client), &[]), AccessDecision::Allowed);
    }
}
