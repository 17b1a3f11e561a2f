use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// Every role a signed-in user can hold. Parsed once from whatever signal is
/// available and used everywhere after that.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Agent,
    OfficeManager,
    Supervisor,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Client,
        Role::Agent,
        Role::OfficeManager,
        Role::Supervisor,
        Role::SuperAdmin,
    ];

    /// Staff roles allowed to moderate listings and read leads.
    pub const STAFF: [Role; 3] = [Role::OfficeManager, Role::Supervisor, Role::SuperAdmin];

    pub fn to_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Agent => "agent",
            Role::OfficeManager => "office_manager",
            Role::Supervisor => "supervisor",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Client => "Cliente",
            Role::Agent => "Agente Inmobiliario",
            Role::OfficeManager => "Gerente de Oficina",
            Role::Supervisor => "Supervisor",
            Role::SuperAdmin => "Super Administrador",
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Client => "/dashboard/client",
            Role::Agent => "/dashboard/agent",
            Role::OfficeManager => "/dashboard/office-manager",
            Role::Supervisor => "/dashboard/supervisor",
            Role::SuperAdmin => "/dashboard/admin",
        }
    }

    /// Exact match on the canonical id. Display names are accepted too because
    /// older signup metadata stored them.
    pub fn parse(value: &str) -> Option<Role> {
        let value = value.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.to_str() == value || role.display_name() == value)
    }

    pub fn is_staff(&self) -> bool {
        Role::STAFF.contains(self)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Profile {
    pub id: uuid::Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub agent_code: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub office: Option<String>,
    pub is_super_admin: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<uuid::Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
