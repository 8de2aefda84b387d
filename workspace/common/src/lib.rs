//! Common transport-layer types.
//! These structs are the response payloads of the API handlers, shared so
//! that API clients can deserialize responses without duplicating shapes.

mod page;

pub use page::Page;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic API response wrapper used by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success flag
    pub success: bool,
}

// ===================== Companies =====================

/// Reference to a group by its unique name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupRef {
    pub name: String,
}

/// Company as shown to regular users.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CompanyPublic {
    pub code: String,
    pub name: String,
}

/// Company as shown to superusers and returned from writes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CompanyAdmin {
    pub code: String,
    pub id: i32,
    pub name: String,
    pub owner_groups: Vec<GroupRef>,
    pub total_products: u64,
}

/// The company shape selected for the acting principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompanyView {
    Admin(CompanyAdmin),
    Public(CompanyPublic),
}

// ===================== Products =====================

/// Product response model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ProductDto {
    /// Code of the owning company
    pub company: String,
    pub code: String,
    pub name: String,
    /// Price in minor currency units
    pub price: i64,
    pub active_listing: bool,
}

// ===================== Transactions =====================

/// Transaction response model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TransactionDto {
    pub code: String,
    /// Code of the company selling the product
    pub company: String,
    /// Code of the purchased product
    pub product: String,
    /// Username of the purchaser
    pub user: String,
    pub quantity: i32,
    pub timestamp: DateTime<Utc>,
}
