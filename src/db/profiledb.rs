use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::db::{page_offset, DBClient},
    dtos::userdtos::UpdateProfileDto,
    models::profilemodel::{Notification, Profile, Role},
};

const PROFILE_COLUMNS: &str = r#"
    id, full_name, email, phone, agent_code, avatar_url, bio, office,
    is_super_admin, created_at, updated_at
"#;

const NOTIFICATION_COLUMNS: &str = r#"
    id, user_id, kind, title, message, related_id, is_read, created_at
"#;

#[async_trait]
pub trait ProfileExt {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error>;

    async fn get_profile_by_agent_code(
        &self,
        agent_code: &str,
    ) -> Result<Option<Profile>, sqlx::Error>;

    /// Raw value of the explicit role assignment, if one exists.
    async fn get_role_assignment(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error>;

    async fn agent_code_exists(&self, agent_code: &str) -> Result<bool, sqlx::Error>;

    async fn set_agent_code(&self, user_id: Uuid, agent_code: &str) -> Result<Profile, sqlx::Error>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileDto,
    ) -> Result<Profile, sqlx::Error>;

    async fn get_user_ids_with_roles(&self, roles: &[Role]) -> Result<Vec<Uuid>, sqlx::Error>;

    async fn create_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> Result<Notification, sqlx::Error>;

    async fn get_notifications(
        &self,
        user_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Notification>, sqlx::Error>;

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, sqlx::Error>;
}

#[async_trait]
impl ProfileExt for DBClient {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_profile_by_agent_code(
        &self,
        agent_code: &str,
    ) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE UPPER(agent_code) = UPPER($1)"
        ))
        .bind(agent_code.trim())
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_role_assignment(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn agent_code_exists(&self, agent_code: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE agent_code = $1)",
        )
        .bind(agent_code)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_agent_code(&self, user_id: Uuid, agent_code: &str) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET agent_code = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(agent_code)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileDto,
    ) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET full_name = COALESCE($1, full_name),
                phone = COALESCE($2, phone),
                bio = COALESCE($3, bio),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = NOW()
            WHERE id = $5
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(update.full_name)
        .bind(update.phone)
        .bind(update.bio)
        .bind(update.avatar_url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_ids_with_roles(&self, roles: &[Role]) -> Result<Vec<Uuid>, sqlx::Error> {
        let role_ids: Vec<String> = roles.iter().map(|r| r.to_str().to_string()).collect();
        let include_super_admins = roles.contains(&Role::SuperAdmin);

        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id FROM user_roles WHERE role = ANY($1)
            UNION
            SELECT id FROM profiles WHERE $2 AND is_super_admin
            "#,
        )
        .bind(role_ids)
        .bind(include_super_admins)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, related_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .bind(related_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_notifications(
        &self,
        user_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
