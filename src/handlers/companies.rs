use std::collections::HashMap;

use access::{membership, policy, scope, AccessError, Principal, TenantScope};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use common::{ApiResponse, CompanyAdmin, CompanyPublic, CompanyView, GroupRef, Page};
use model::code::unique_company_code;
use model::entities::{company, company_owner_group, product};
use rand::{rngs::StdRng, SeedableRng};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::ApiError;
use crate::extract::{CurrentUser, ValidJson};
use crate::pagination::{fetch_page, PageParams};
use crate::schemas::{AppState, ErrorResponse};

const DUPLICATE_CODE_MESSAGE: &str = "company with this code already exists.";

/// Request body for creating a company
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCompanyRequest {
    /// Unique company code; generated when omitted
    #[validate(length(min = 1, max = 100))]
    pub code: Option<String>,
    /// Company name
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Groups owning the company. The caller must belong to at least one.
    #[serde(default)]
    pub owner_groups: Vec<GroupRef>,
}

/// Request body for replacing a company
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ReplaceCompanyRequest {
    /// New code; only superusers may change it
    #[validate(length(min = 1, max = 100))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Replacement owner group set
    #[serde(default)]
    pub owner_groups: Vec<GroupRef>,
}

/// Request body for partially updating a company. Omitted fields keep their
/// stored values.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct PatchCompanyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_groups: Option<Vec<GroupRef>>,
}

/// Filters for listing companies
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompanyFilter {
    /// Exact code
    pub code: Option<String>,
    /// Case-insensitive substring of the code
    #[serde(rename = "code__icontains")]
    pub code_icontains: Option<String>,
    /// Exact name
    pub name: Option<String>,
    /// Case-insensitive substring of the name
    #[serde(rename = "name__icontains")]
    pub name_icontains: Option<String>,
}

impl CompanyFilter {
    fn apply(&self, mut select: Select<company::Entity>) -> Select<company::Entity> {
        if let Some(code) = &self.code {
            select = select.filter(company::Column::Code.eq(code.as_str()));
        }
        if let Some(fragment) = &self.code_icontains {
            select = select.filter(icontains(company::Column::Code, fragment));
        }
        if let Some(name) = &self.name {
            select = select.filter(company::Column::Name.eq(name.as_str()));
        }
        if let Some(fragment) = &self.name_icontains {
            select = select.filter(icontains(company::Column::Name, fragment));
        }
        select
    }
}

/// Case-insensitive substring match. `%`, `_` and `\` in `fragment` match literally.
fn icontains(column: company::Column, fragment: &str) -> sea_orm::sea_query::SimpleExpr {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

/// Trims the requested group names and rejects blank or oversized ones.
fn owner_group_names(groups: &[GroupRef]) -> Result<Vec<String>, ApiError> {
    groups
        .iter()
        .map(|group| policy::normalize_group_name(&group.name).map_err(ApiError::from))
        .collect()
}

/// Number of products per company id. Companies without products are absent.
async fn product_counts<C: ConnectionTrait>(db: &C, company_ids: &[i32]) -> Result<HashMap<i32, u64>, DbErr> {
    if company_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = product::Entity::find()
        .select_only()
        .column(product::Column::CompanyId)
        .column_as(Expr::col(product::Column::Id).count(), "total")
        .filter(product::Column::CompanyId.is_in(company_ids.iter().copied()))
        .group_by(product::Column::CompanyId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(id, total)| (id, total.max(0) as u64)).collect())
}

/// Administrative views of `companies`, in the same order.
async fn admin_views<C: ConnectionTrait>(
    db: &C,
    companies: Vec<company::Model>,
) -> Result<Vec<CompanyAdmin>, DbErr> {
    let ids: Vec<i32> = companies.iter().map(|c| c.id).collect();
    let mut groups = membership::owner_group_names_by_company(db, &ids).await?;
    let counts = product_counts(db, &ids).await?;

    Ok(companies
        .into_iter()
        .map(|c| CompanyAdmin {
            owner_groups: groups
                .remove(&c.id)
                .unwrap_or_default()
                .into_iter()
                .map(|name| GroupRef { name })
                .collect(),
            total_products: counts.get(&c.id).copied().unwrap_or(0),
            code: c.code,
            id: c.id,
            name: c.name,
        })
        .collect())
}

async fn admin_view<C: ConnectionTrait>(db: &C, company: company::Model) -> Result<CompanyAdmin, DbErr> {
    let id = company.id;
    admin_views(db, vec![company])
        .await?
        .pop()
        .ok_or_else(|| DbErr::RecordNotFound(format!("company {}", id)))
}

/// Shapes `companies` for `principal`: superusers get the administrative
/// view, everyone else the public one.
async fn views_for<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    companies: Vec<company::Model>,
) -> Result<Vec<CompanyView>, DbErr> {
    if principal.is_superuser {
        return Ok(admin_views(db, companies)
            .await?
            .into_iter()
            .map(CompanyView::Admin)
            .collect());
    }
    Ok(companies
        .into_iter()
        .map(|c| CompanyView::Public(CompanyPublic { code: c.code, name: c.name }))
        .collect())
}

async fn current_owner_group_names(txn: &DatabaseTransaction, company_id: i32) -> Result<Vec<String>, DbErr> {
    Ok(membership::owner_groups_of(txn, company_id)
        .await?
        .into_iter()
        .map(|g| g.name)
        .collect())
}

/// Writes the authorized changes. `None` leaves a value untouched.
async fn persist_changes(
    txn: &DatabaseTransaction,
    company: company::Model,
    code: Option<String>,
    name: Option<String>,
    owner_groups: Option<&[String]>,
) -> Result<company::Model, ApiError> {
    let company_id = company.id;
    let company = if code.is_none() && name.is_none() {
        company
    } else {
        let mut active: company::ActiveModel = company.into();
        if let Some(code) = code {
            active.code = Set(code);
        }
        if let Some(name) = name {
            active.name = Set(name);
        }
        active
            .update(txn)
            .await
            .map_err(|e| AccessError::from_unique_violation(e, policy::CODE_FIELD, DUPLICATE_CODE_MESSAGE))?
    };

    if let Some(names) = owner_groups {
        membership::replace_owner_groups(txn, company_id, names).await?;
    }
    Ok(company)
}

/// List companies visible to the caller
#[utoipa::path(
    get,
    path = "/api/companies",
    tag = "companies",
    params(PageParams, CompanyFilter),
    responses(
        (status = 200, description = "Companies retrieved successfully", body = ApiResponse<Page<CompanyPublic>>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Invalid page", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_companies(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(Query(paging)): Valid<Query<PageParams>>,
    Query(filter): Query<CompanyFilter>,
) -> Result<Json<ApiResponse<Page<CompanyView>>>, ApiError> {
    trace!("Entering list_companies function");

    let select = filter
        .apply(company::Entity::visible_to(&user))
        .order_by_asc(company::Column::Code);
    let page = fetch_page(&state.db, select, &paging, &state.settings.pagination).await?;

    let Page { count, next, previous, results } = page;
    let results = views_for(&state.db, &user, results).await?;
    info!("Listed {} of {} companies for {}", results.len(), count, user.username);

    Ok(Json(ApiResponse {
        data: Page { count, next, previous, results },
        message: "Companies retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a company by code
#[utoipa::path(
    get,
    path = "/api/companies/{code}",
    tag = "companies",
    params(("code" = String, Path, description = "Company code")),
    responses(
        (status = 200, description = "Company retrieved successfully", body = ApiResponse<CompanyPublic>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_company(
    Path(code): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<CompanyView>>, ApiError> {
    trace!("Entering get_company function for code: {}", code);

    let company = scope::find_company(&state.db, &user, &code).await?;
    let view = views_for(&state.db, &user, vec![company])
        .await?
        .pop()
        .ok_or(ApiError::NotFound)?;

    debug!("Retrieved company {} for {}", code, user.username);
    Ok(Json(ApiResponse {
        data: view,
        message: "Company retrieved successfully".to_string(),
        success: true,
    }))
}

/// Create a company owned by the given groups
#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created successfully", body = ApiResponse<CompanyAdmin>),
        (status = 400, description = "Invalid request or caller not in the owner groups", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_company(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(request): ValidJson<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CompanyAdmin>>), ApiError> {
    trace!("Entering create_company function");
    let groups = owner_group_names(&request.owner_groups)?;
    policy::authorize_create(&user, &groups)?;

    let txn = state.db.begin().await?;
    let code = match request.code {
        Some(code) => code,
        None => unique_company_code(&txn, &mut StdRng::from_entropy()).await?,
    };
    debug!("Creating company {} owned by {:?}", code, groups);

    let company = company::ActiveModel {
        code: Set(code),
        name: Set(request.name),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| AccessError::from_unique_violation(e, policy::CODE_FIELD, DUPLICATE_CODE_MESSAGE))?;

    membership::replace_owner_groups(&txn, company.id, &groups).await?;
    let view = admin_view(&txn, company).await?;
    txn.commit().await?;

    info!("Company {} created by {} with ID {}", view.code, user.username, view.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: view,
            message: "Company created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Replace a company, including its owner groups
#[utoipa::path(
    put,
    path = "/api/companies/{code}",
    tag = "companies",
    params(("code" = String, Path, description = "Company code")),
    request_body = ReplaceCompanyRequest,
    responses(
        (status = 200, description = "Company updated successfully", body = ApiResponse<CompanyAdmin>),
        (status = 400, description = "Invalid request or caller not in the owner groups", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn replace_company(
    Path(code): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(request): ValidJson<ReplaceCompanyRequest>,
) -> Result<Json<ApiResponse<CompanyAdmin>>, ApiError> {
    trace!("Entering replace_company function for code: {}", code);
    let groups = owner_group_names(&request.owner_groups)?;

    let txn = state.db.begin().await?;
    let company = scope::find_company(&txn, &user, &code).await?;
    let current = current_owner_group_names(&txn, company.id).await?;

    policy::authorize_replace(&user, &current, &groups)?;
    policy::authorize_code_change(&user, &company.code, request.code.as_deref())?;

    let company = persist_changes(&txn, company, request.code, Some(request.name), Some(groups.as_slice())).await?;
    let view = admin_view(&txn, company).await?;
    txn.commit().await?;

    info!("Company {} replaced by {}", view.code, user.username);
    Ok(Json(ApiResponse {
        data: view,
        message: "Company updated successfully".to_string(),
        success: true,
    }))
}

/// Partially update a company
#[utoipa::path(
    patch,
    path = "/api/companies/{code}",
    tag = "companies",
    params(("code" = String, Path, description = "Company code")),
    request_body = PatchCompanyRequest,
    responses(
        (status = 200, description = "Company updated successfully", body = ApiResponse<CompanyAdmin>),
        (status = 400, description = "Invalid request or caller not in the owner groups", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn patch_company(
    Path(code): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(request): ValidJson<PatchCompanyRequest>,
) -> Result<Json<ApiResponse<CompanyAdmin>>, ApiError> {
    trace!("Entering patch_company function for code: {}", code);
    let groups = request
        .owner_groups
        .as_deref()
        .map(owner_group_names)
        .transpose()?;

    let txn = state.db.begin().await?;
    let company = scope::find_company(&txn, &user, &code).await?;
    let current = current_owner_group_names(&txn, company.id).await?;

    policy::authorize_partial_update(&user, &current, groups.as_deref())?;
    policy::authorize_code_change(&user, &company.code, request.code.as_deref())?;

    let company = persist_changes(&txn, company, request.code, request.name, groups.as_deref()).await?;
    let view = admin_view(&txn, company).await?;
    txn.commit().await?;

    info!("Company {} patched by {}", view.code, user.username);
    Ok(Json(ApiResponse {
        data: view,
        message: "Company updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a company that has no products
#[utoipa::path(
    delete,
    path = "/api/companies/{code}",
    tag = "companies",
    params(("code" = String, Path, description = "Company code")),
    responses(
        (status = 204, description = "Company deleted successfully"),
        (status = 400, description = "Caller not in the owner groups", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse),
        (status = 409, description = "Company still has products", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_company(
    Path(code): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_company function for code: {}", code);

    let txn = state.db.begin().await?;
    let company = scope::find_company(&txn, &user, &code).await?;
    let current = current_owner_group_names(&txn, company.id).await?;
    policy::authorize_delete(&user, &current)?;

    let products = product::Entity::find()
        .filter(product::Column::CompanyId.eq(company.id))
        .count(&txn)
        .await?;
    if products > 0 {
        warn!("Refusing to delete company {} with {} product(s)", code, products);
        return Err(ApiError::Conflict(format!(
            "Company {} cannot be deleted while it has products.",
            company.code
        )));
    }

    company_owner_group::Entity::delete_many()
        .filter(company_owner_group::Column::CompanyId.eq(company.id))
        .exec(&txn)
        .await?;
    company::Entity::delete_by_id(company.id).exec(&txn).await?;
    txn.commit().await?;

    info!("Company {} deleted by {}", code, user.username);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_group_names_are_trimmed() {
        let names = owner_group_names(&[
            GroupRef { name: " company_ABC001 ".to_string() },
            GroupRef { name: "shared".to_string() },
        ])
        .unwrap();
        assert_eq!(names, vec!["company_ABC001", "shared"]);
    }

    #[test]
    fn test_blank_group_name_is_rejected() {
        match owner_group_names(&[GroupRef { name: "  ".to_string() }]) {
            Err(ApiError::Validation(fields)) => assert!(fields.contains_key(policy::OWNER_GROUPS_FIELD)),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
