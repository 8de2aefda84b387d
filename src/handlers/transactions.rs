use std::collections::HashMap;

use access::{scope, AccessError, Principal, TenantScope};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::Utc;
use common::{ApiResponse, Page, TransactionDto};
use model::code::unique_transaction_code;
use model::entities::{product, transaction, user};
use rand::{rngs::StdRng, SeedableRng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use super::products::company_codes;
use crate::error::ApiError;
use crate::extract::{CurrentUser, ValidJson};
use crate::pagination::{fetch_page, PageParams};
use crate::schemas::{AppState, ErrorResponse};

const DUPLICATE_CODE_MESSAGE: &str = "transaction with this code already exists.";

/// Request body for recording a purchase
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTransactionRequest {
    /// Code of the company selling the product
    pub company: String,
    /// Code of the product within that company
    pub product: String,
    /// Unique transaction code; generated when omitted
    #[validate(length(min = 1, max = 100))]
    pub code: Option<String>,
    /// Number of units bought
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Expands transactions into their response shape with batched lookups of
/// products, companies and purchasers.
async fn to_dtos<C: ConnectionTrait>(
    db: &C,
    transactions: Vec<transaction::Model>,
) -> Result<Vec<TransactionDto>, DbErr> {
    let products: HashMap<i32, product::Model> = product::Entity::find()
        .filter(product::Column::Id.is_in(transactions.iter().map(|t| t.product_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let companies = company_codes(db, products.values().map(|p| p.company_id)).await?;
    let users: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(transactions.iter().map(|t| t.user_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    Ok(transactions
        .into_iter()
        .map(|t| {
            let product = products.get(&t.product_id);
            TransactionDto {
                company: product
                    .and_then(|p| companies.get(&p.company_id))
                    .cloned()
                    .unwrap_or_default(),
                product: product.map(|p| p.code.clone()).unwrap_or_default(),
                user: users.get(&t.user_id).cloned().unwrap_or_default(),
                code: t.code,
                quantity: t.quantity,
                timestamp: t.timestamp,
            }
        })
        .collect())
}

async fn to_dto<C: ConnectionTrait>(db: &C, transaction: transaction::Model) -> Result<TransactionDto, ApiError> {
    to_dtos(db, vec![transaction]).await?.pop().ok_or(ApiError::NotFound)
}

/// List transactions visible to the caller
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "transactions",
    params(PageParams),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<Page<TransactionDto>>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Invalid page", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(Query(paging)): Valid<Query<PageParams>>,
) -> Result<Json<ApiResponse<Page<TransactionDto>>>, ApiError> {
    trace!("Entering list_transactions function");

    let select = transaction::Entity::visible_to(&user).order_by_asc(transaction::Column::Code);
    let page = fetch_page(&state.db, select, &paging, &state.settings.pagination).await?;
    let Page { count, next, previous, results } = page;
    let results = to_dtos(&state.db, results).await?;
    info!("Listed {} of {} transactions for {}", results.len(), count, user.username);

    Ok(Json(ApiResponse {
        data: Page { count, next, previous, results },
        message: "Transactions retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a transaction by code
#[utoipa::path(
    get,
    path = "/api/transactions/{code}",
    tag = "transactions",
    params(("code" = String, Path, description = "Transaction code")),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionDto>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transaction(
    Path(code): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<TransactionDto>>, ApiError> {
    trace!("Entering get_transaction function for code: {}", code);

    let transaction = scope::find_transaction(&state.db, &user, &code).await?;
    Ok(Json(ApiResponse {
        data: to_dto(&state.db, transaction).await?,
        message: "Transaction retrieved successfully".to_string(),
        success: true,
    }))
}

/// Record a purchase of a visible product by the caller
#[utoipa::path(
    post,
    path = "/api/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded successfully", body = ApiResponse<TransactionDto>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(request): ValidJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionDto>>), ApiError> {
    trace!("Entering create_transaction function");

    let txn = state.db.begin().await?;
    let (company, product) = scope::find_product(&txn, &user, &request.company, &request.product).await?;
    let code = match request.code {
        Some(code) => code,
        None => unique_transaction_code(&txn, &mut StdRng::from_entropy()).await?,
    };
    debug!(
        "Recording purchase {} of {} x {}/{} by {}",
        code, request.quantity, company.code, product.code, user.username
    );

    let transaction = record_purchase(&txn, &user, &product, code, request.quantity).await?;
    let dto = to_dto(&txn, transaction).await?;
    txn.commit().await?;

    info!("Transaction {} recorded for {}", dto.code, user.username);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: dto,
            message: "Transaction recorded successfully".to_string(),
            success: true,
        }),
    ))
}

async fn record_purchase<C: ConnectionTrait>(
    db: &C,
    purchaser: &Principal,
    product: &product::Model,
    code: String,
    quantity: i32,
) -> Result<transaction::Model, AccessError> {
    transaction::ActiveModel {
        user_id: Set(purchaser.user_id),
        product_id: Set(product.id),
        code: Set(code),
        quantity: Set(quantity),
        timestamp: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| AccessError::from_unique_violation(e, "code", DUPLICATE_CODE_MESSAGE))
}
