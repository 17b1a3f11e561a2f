use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::models::propertymodel::{
    ConcludedStatus, CurrencyType, Property, PropertyStatus, PropertyType, TransactionType,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePropertyDto {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 20, max = 5000, message = "Description must be between 20 and 5000 characters"))]
    pub description: String,

    pub property_type: PropertyType,
    pub transaction_type: TransactionType,

    pub price: BigDecimal,
    pub currency: CurrencyType,

    #[validate(range(min = 0, max = 100, message = "Bedrooms must be between 0 and 100"))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, max = 100, message = "Bathrooms must be between 0 and 100"))]
    pub bathrooms: Option<i32>,
    pub area_m2: Option<BigDecimal>,

    #[validate(length(min = 5, max = 500, message = "Address must be between 5 and 500 characters"))]
    pub address: String,

    #[validate(length(min = 2, max = 100, message = "City is required"))]
    pub city: String,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub plan_urls: Vec<String>,
}

impl CreatePropertyDto {
    pub fn validate_coordinates(&self) -> Result<(), String> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    return Err("Coordinates out of range".to_string());
                }
                Ok(())
            }
            (None, None) => Ok(()),
            _ => Err("Latitude and longitude must be provided together".to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PropertySearchQueryDto {
    pub property_type: Option<PropertyType>,
    pub transaction_type: Option<TransactionType>,
    pub city: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub bedrooms: Option<i32>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ModeratePropertyDto {
    pub status: PropertyStatus,
    #[validate(length(min = 5, max = 1000, message = "Reason must be between 5 and 1000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ArchivePropertyDto {
    #[validate(length(min = 10, max = 1000, message = "Justification must be between 10 and 1000 characters"))]
    pub justification: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConcludePropertyDto {
    pub concluded_status: ConcludedStatus,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdatePropertyMediaDto {
    #[validate(length(max = 30, message = "A property can hold at most 30 images"))]
    pub image_urls: Option<Vec<String>>,
    #[validate(length(max = 10, message = "A property can hold at most 10 plans"))]
    pub plan_urls: Option<Vec<String>>,
}

/// Card shown in listing grids.
#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyCardDto {
    pub id: Uuid,
    pub title: String,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub price: BigDecimal,
    pub currency: String,
    pub city: String,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_m2: Option<BigDecimal>,
    pub cover_image: Option<String>,
    pub status: PropertyStatus,
    pub concluded_status: ConcludedStatus,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl PropertyCardDto {
    pub fn from_property(property: &Property) -> Self {
        Self {
            id: property.id,
            title: property.title.clone(),
            property_type: property.property_type,
            transaction_type: property.transaction_type,
            price: property.price.clone(),
            currency: property.currency.code().to_string(),
            city: property.city.clone(),
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            area_m2: property.area_m2.clone(),
            cover_image: property.image_urls.first().cloned(),
            status: property.status,
            concluded_status: property.concluded_status,
            is_archived: property.is_archived,
            created_at: property.created_at,
        }
    }
}
