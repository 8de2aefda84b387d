use std::collections::BTreeMap;
use std::sync::Arc;

use common::{ApiResponse, CompanyAdmin, CompanyPublic, GroupRef, Page, ProductDto, TransactionDto};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::config::Settings;
use crate::handlers::companies::{CreateCompanyRequest, PatchCompanyRequest, ReplaceCompanyRequest};
use crate::handlers::products::CreateProductRequest;
use crate::handlers::transactions::CreateTransactionRequest;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Runtime tunables
    pub settings: Arc<Settings>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
    /// Per-field messages for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::companies::list_companies,
        crate::handlers::companies::create_company,
        crate::handlers::companies::get_company,
        crate::handlers::companies::replace_company,
        crate::handlers::companies::patch_company,
        crate::handlers::companies::delete_company,
        crate::handlers::products::list_company_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::list_products,
        crate::handlers::transactions::list_transactions,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transaction,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            GroupRef,
            CompanyPublic,
            CompanyAdmin,
            ProductDto,
            TransactionDto,
            CreateCompanyRequest,
            ReplaceCompanyRequest,
            PatchCompanyRequest,
            CreateProductRequest,
            CreateTransactionRequest,
            ApiResponse<CompanyAdmin>,
            ApiResponse<ProductDto>,
            ApiResponse<TransactionDto>,
            Page<CompanyPublic>,
            Page<ProductDto>,
            Page<TransactionDto>,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "companies", description = "Companies owned by groups"),
        (name = "products", description = "Products sold by companies"),
        (name = "transactions", description = "Purchases of products"),
    ),
    info(
        title = "Storefront API",
        description = "Multi-tenant store API. Every request acts as the user named in the X-Remote-User header and only sees records owned by that user's groups.",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
