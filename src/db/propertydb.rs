use async_trait::async_trait;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::db::{page_offset, DBClient},
    dtos::propertydtos::CreatePropertyDto,
    models::propertymodel::{
        ConcludedStatus, Property, PropertyStatus, PropertyType, TransactionType,
    },
};

const PROPERTY_COLUMNS: &str = r#"
    id, agent_id, title, description, property_type, transaction_type,
    price, currency, bedrooms, bathrooms, area_m2, address, city,
    latitude, longitude, image_urls, plan_urls, status, rejection_reason,
    concluded_status, is_archived, archive_justification, created_at, updated_at
"#;

#[derive(Debug, Default)]
pub struct PropertySearchFilters {
    pub property_type: Option<PropertyType>,
    pub transaction_type: Option<TransactionType>,
    pub city: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub bedrooms: Option<i32>,
}

fn enum_label<T: serde::Serialize>(value: &T) -> Option<String> {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
}

#[async_trait]
pub trait PropertyExt {
    async fn create_property(
        &self,
        agent_id: Uuid,
        property_data: CreatePropertyDto,
    ) -> Result<Property, sqlx::Error>;

    async fn get_property_by_id(&self, property_id: Uuid) -> Result<Option<Property>, sqlx::Error>;

    async fn get_public_properties(
        &self,
        filters: PropertySearchFilters,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, sqlx::Error>;

    async fn get_properties_by_agent(
        &self,
        agent_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, sqlx::Error>;

    async fn get_public_properties_by_agent(
        &self,
        agent_id: Uuid,
    ) -> Result<Vec<Property>, sqlx::Error>;

    async fn get_pending_properties(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, sqlx::Error>;

    async fn moderate_property(
        &self,
        property_id: Uuid,
        status: PropertyStatus,
        reason: Option<String>,
    ) -> Result<Property, sqlx::Error>;

    async fn set_property_archived(
        &self,
        property_id: Uuid,
        archived: bool,
        justification: String,
    ) -> Result<Property, sqlx::Error>;

    async fn set_concluded_status(
        &self,
        property_id: Uuid,
        concluded_status: ConcludedStatus,
    ) -> Result<Property, sqlx::Error>;

    async fn update_property_media(
        &self,
        property_id: Uuid,
        image_urls: Option<Vec<String>>,
        plan_urls: Option<Vec<String>>,
    ) -> Result<Property, sqlx::Error>;
}

#[async_trait]
impl PropertyExt for DBClient {
    async fn create_property(
        &self,
        agent_id: Uuid,
        property_data: CreatePropertyDto,
    ) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            INSERT INTO properties (
                agent_id, title, description, property_type, transaction_type, price, currency,
                bedrooms, bathrooms, area_m2, address, city, latitude, longitude,
                image_urls, plan_urls, status
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17
            )
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(agent_id)
        .bind(property_data.title)
        .bind(property_data.description)
        .bind(property_data.property_type)
        .bind(property_data.transaction_type)
        .bind(property_data.price)
        .bind(property_data.currency)
        .bind(property_data.bedrooms)
        .bind(property_data.bathrooms)
        .bind(property_data.area_m2)
        .bind(property_data.address)
        .bind(property_data.city)
        .bind(property_data.latitude)
        .bind(property_data.longitude)
        .bind(property_data.image_urls)
        .bind(property_data.plan_urls)
        .bind(PropertyStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_property_by_id(&self, property_id: Uuid) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
        ))
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_public_properties(
        &self,
        filters: PropertySearchFilters,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS} FROM properties
            WHERE status = 'approved' AND is_archived = FALSE
            AND ($1::text IS NULL OR property_type = $1::property_type)
            AND ($2::text IS NULL OR transaction_type = $2::transaction_type)
            AND ($3::text IS NULL OR city ILIKE $3)
            AND ($4::numeric IS NULL OR price >= $4)
            AND ($5::numeric IS NULL OR price <= $5)
            AND ($6::int IS NULL OR bedrooms >= $6)
            ORDER BY created_at DESC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(filters.property_type.as_ref().and_then(enum_label))
        .bind(filters.transaction_type.as_ref().and_then(enum_label))
        .bind(filters.city.as_ref().map(|c| format!("%{}%", c.trim())))
        .bind(filters.min_price)
        .bind(filters.max_price)
        .bind(filters.bedrooms)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_properties_by_agent(
        &self,
        agent_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS} FROM properties
            WHERE agent_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(agent_id)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_public_properties_by_agent(
        &self,
        agent_id: Uuid,
    ) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS} FROM properties
            WHERE agent_id = $1 AND status = 'approved' AND is_archived = FALSE
            ORDER BY created_at DESC
            "#
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_pending_properties(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS} FROM properties
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn moderate_property(
        &self,
        property_id: Uuid,
        status: PropertyStatus,
        reason: Option<String>,
    ) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            UPDATE properties
            SET status = $1, rejection_reason = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(reason)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_property_archived(
        &self,
        property_id: Uuid,
        archived: bool,
        justification: String,
    ) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            UPDATE properties
            SET is_archived = $1, archive_justification = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(archived)
        .bind(justification)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_concluded_status(
        &self,
        property_id: Uuid,
        concluded_status: ConcludedStatus,
    ) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            UPDATE properties
            SET concluded_status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(concluded_status)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_property_media(
        &self,
        property_id: Uuid,
        image_urls: Option<Vec<String>>,
        plan_urls: Option<Vec<String>>,
    ) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            UPDATE properties
            SET image_urls = COALESCE($1, image_urls),
                plan_urls = COALESCE($2, plan_urls),
                updated_at = NOW()
            WHERE id = $3
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(image_urls)
        .bind(plan_urls)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_labels_match_postgres_enum_values() {
        assert_eq!(enum_label(&PropertyType::Apartment).as_deref(), Some("apartment"));
        assert_eq!(enum_label(&TransactionType::Rent).as_deref(), Some("rent"));
    }
}
