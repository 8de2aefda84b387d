use std::collections::HashMap;

use access::{scope, AccessError, TenantScope};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use common::{ApiResponse, Page, ProductDto};
use model::entities::{company, product};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::ApiError;
use crate::extract::{CurrentUser, ValidJson};
use crate::pagination::{fetch_page, PageParams};
use crate::schemas::{AppState, ErrorResponse};

const DUPLICATE_PRODUCT_MESSAGE: &str = "The fields company, code must make a unique set.";

/// Request body for creating a product
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    /// Product code, unique within the company
    #[validate(length(min = 1, max = 100))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Price in minor currency units
    #[validate(range(min = 0))]
    pub price: i64,
    /// Whether the product is listed for sale (default: true)
    pub active_listing: Option<bool>,
}

/// Filters for listing products
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Code of the owning company
    pub company: Option<String>,
    /// Exact product code
    pub code: Option<String>,
    pub active_listing: Option<bool>,
}

fn to_dto(company_code: String, model: product::Model) -> ProductDto {
    ProductDto {
        company: company_code,
        code: model.code,
        name: model.name,
        price: model.price,
        active_listing: model.active_listing,
    }
}

/// Company codes keyed by company id.
pub(crate) async fn company_codes<C: ConnectionTrait>(
    db: &C,
    company_ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, DbErr> {
    let rows: Vec<(i32, String)> = company::Entity::find()
        .select_only()
        .column(company::Column::Id)
        .column(company::Column::Code)
        .filter(company::Column::Id.is_in(company_ids))
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn to_dtos<C: ConnectionTrait>(db: &C, products: Vec<product::Model>) -> Result<Vec<ProductDto>, DbErr> {
    let codes = company_codes(db, products.iter().map(|p| p.company_id)).await?;
    Ok(products
        .into_iter()
        .map(|p| {
            let company = codes.get(&p.company_id).cloned().unwrap_or_default();
            to_dto(company, p)
        })
        .collect())
}

/// List products visible to the caller
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "products",
    params(PageParams, ProductFilter),
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<Page<ProductDto>>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Invalid page", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(Query(paging)): Valid<Query<PageParams>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ApiResponse<Page<ProductDto>>>, ApiError> {
    trace!("Entering list_products function");

    let mut select = product::Entity::visible_to(&user);
    if let Some(company_code) = &filter.company {
        select = select
            .inner_join(company::Entity)
            .filter(company::Column::Code.eq(company_code.as_str()));
    }
    if let Some(code) = &filter.code {
        select = select.filter(product::Column::Code.eq(code.as_str()));
    }
    if let Some(active) = filter.active_listing {
        select = select.filter(product::Column::ActiveListing.eq(active));
    }
    let select = select
        .order_by_asc(product::Column::Code)
        .order_by_asc(product::Column::Id);

    let page = fetch_page(&state.db, select, &paging, &state.settings.pagination).await?;
    let Page { count, next, previous, results } = page;
    let results = to_dtos(&state.db, results).await?;
    info!("Listed {} of {} products for {}", results.len(), count, user.username);

    Ok(Json(ApiResponse {
        data: Page { count, next, previous, results },
        message: "Products retrieved successfully".to_string(),
        success: true,
    }))
}

/// List the products of one company
#[utoipa::path(
    get,
    path = "/api/companies/{code}/products",
    tag = "products",
    params(("code" = String, Path, description = "Company code"), PageParams),
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<Page<ProductDto>>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Company not found or invalid page", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_company_products(
    Path(code): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(Query(paging)): Valid<Query<PageParams>>,
) -> Result<Json<ApiResponse<Page<ProductDto>>>, ApiError> {
    trace!("Entering list_company_products function for company: {}", code);

    let company = scope::find_company(&state.db, &user, &code).await?;
    let select = product::Entity::visible_to(&user)
        .filter(product::Column::CompanyId.eq(company.id))
        .order_by_asc(product::Column::Code)
        .order_by_asc(product::Column::Id);

    let page = fetch_page(&state.db, select, &paging, &state.settings.pagination).await?;
    debug!("Company {} has {} product(s)", company.code, page.count);

    Ok(Json(ApiResponse {
        data: page.map(|p| to_dto(company.code.clone(), p)),
        message: "Products retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get one product of a company
#[utoipa::path(
    get,
    path = "/api/companies/{code}/products/{product_code}",
    tag = "products",
    params(
        ("code" = String, Path, description = "Company code"),
        ("product_code" = String, Path, description = "Product code"),
    ),
    responses(
        (status = 200, description = "Product retrieved successfully", body = ApiResponse<ProductDto>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_product(
    Path((code, product_code)): Path<(String, String)>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<ProductDto>>, ApiError> {
    trace!("Entering get_product function for {}/{}", code, product_code);

    let (company, product) = scope::find_product(&state.db, &user, &code, &product_code).await?;
    Ok(Json(ApiResponse {
        data: to_dto(company.code, product),
        message: "Product retrieved successfully".to_string(),
        success: true,
    }))
}

/// Create a product for a company
#[utoipa::path(
    post,
    path = "/api/companies/{code}/products",
    tag = "products",
    params(("code" = String, Path, description = "Company code")),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created successfully", body = ApiResponse<ProductDto>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_product(
    Path(code): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(request): ValidJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductDto>>), ApiError> {
    trace!("Entering create_product function for company: {}", code);

    let company = scope::find_company(&state.db, &user, &code).await?;
    let product = product::ActiveModel {
        company_id: Set(company.id),
        code: Set(request.code),
        name: Set(request.name),
        price: Set(request.price),
        active_listing: Set(request.active_listing.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| AccessError::from_unique_violation(e, "code", DUPLICATE_PRODUCT_MESSAGE))?;

    info!(
        "Product {} created for company {} by {} with ID {}",
        product.code, company.code, user.username, product.id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: to_dto(company.code, product),
            message: "Product created successfully".to_string(),
            success: true,
        }),
    ))
}
