use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "property_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "concluded_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConcludedStatus {
    None,
    Sold,
    Rented,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "property_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    Office,
    Commercial,
    Warehouse,
}

impl PropertyType {
    pub fn to_str(&self) -> &str {
        match self {
            PropertyType::House => "casa",
            PropertyType::Apartment => "departamento",
            PropertyType::Land => "terreno",
            PropertyType::Office => "oficina",
            PropertyType::Commercial => "local comercial",
            PropertyType::Warehouse => "bodega",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Rent,
}

impl TransactionType {
    pub fn to_str(&self) -> &str {
        match self {
            TransactionType::Sale => "venta",
            TransactionType::Rent => "renta",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "currency_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CurrencyType {
    Mxn,
    Usd,
    Eur,
}

impl CurrencyType {
    pub fn code(&self) -> &str {
        match self {
            CurrencyType::Mxn => "MXN",
            CurrencyType::Usd => "USD",
            CurrencyType::Eur => "EUR",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Property {
    pub id: Uuid,
    pub agent_id: Uuid,

    pub title: String,
    pub description: String,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,

    pub price: BigDecimal,
    pub currency: CurrencyType,

    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_m2: Option<BigDecimal>,

    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub image_urls: Vec<String>,
    pub plan_urls: Vec<String>,

    pub status: PropertyStatus,
    pub rejection_reason: Option<String>,
    pub concluded_status: ConcludedStatus,
    pub is_archived: bool,
    pub archive_justification: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Listed on the public site.
    pub fn is_public(&self) -> bool {
        self.status == PropertyStatus::Approved && !self.is_archived
    }
}
