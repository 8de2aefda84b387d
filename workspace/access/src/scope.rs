//! Tenant scope filter.
//!
//! Superusers see every row. Everyone else sees a company when one of its
//! owner groups is one of their groups, a product when its company is
//! visible, and a transaction when its product is visible. The restriction
//! is an `IN (subquery)` on the owning key, so a row reachable through
//! several groups is still returned once.
//!
//! Retrieval goes through the same filtered query, which is why a record
//! outside the scope is reported exactly like a missing one.

use model::entities::{company, company_owner_group, product, transaction};
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Select};
use tracing::{debug, trace};

use crate::error::{AccessError, Result};
use crate::principal::Principal;

/// Entities whose visibility is derived from company ownership.
pub trait TenantScope: EntityTrait {
    /// Restricts `select` to the rows `principal` may observe.
    fn scope(select: Select<Self>, principal: &Principal) -> Select<Self>;

    /// All rows `principal` may observe.
    fn visible_to(principal: &Principal) -> Select<Self> {
        Self::scope(Self::find(), principal)
    }
}

/// `SELECT company_id FROM company_owner_groups WHERE group_id IN (..)`
fn owned_company_ids(principal: &Principal) -> SelectStatement {
    Query::select()
        .column(company_owner_group::Column::CompanyId)
        .from(company_owner_group::Entity)
        .and_where(company_owner_group::Column::GroupId.is_in(principal.group_ids()))
        .to_owned()
}

/// `SELECT id FROM products WHERE company_id IN (owned companies)`
fn owned_product_ids(principal: &Principal) -> SelectStatement {
    Query::select()
        .column(product::Column::Id)
        .from(product::Entity)
        .and_where(product::Column::CompanyId.in_subquery(owned_company_ids(principal)))
        .to_owned()
}

impl TenantScope for company::Entity {
    fn scope(select: Select<Self>, principal: &Principal) -> Select<Self> {
        if principal.is_superuser {
            return select;
        }
        select.filter(company::Column::Id.in_subquery(owned_company_ids(principal)))
    }
}

impl TenantScope for product::Entity {
    fn scope(select: Select<Self>, principal: &Principal) -> Select<Self> {
        if principal.is_superuser {
            return select;
        }
        select.filter(product::Column::CompanyId.in_subquery(owned_company_ids(principal)))
    }
}

impl TenantScope for transaction::Entity {
    fn scope(select: Select<Self>, principal: &Principal) -> Select<Self> {
        if principal.is_superuser {
            return select;
        }
        select.filter(transaction::Column::ProductId.in_subquery(owned_product_ids(principal)))
    }
}

/// Retrieves a visible company by code.
pub async fn find_company<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    code: &str,
) -> Result<company::Model> {
    trace!("Looking up company {} for {}", code, principal.username);
    company::Entity::visible_to(principal)
        .filter(company::Column::Code.eq(code))
        .one(db)
        .await?
        .ok_or_else(|| {
            debug!("Company {} not visible to {}", code, principal.username);
            AccessError::NotFound
        })
}

/// Retrieves a visible product by its company code and product code.
pub async fn find_product<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    company_code: &str,
    product_code: &str,
) -> Result<(company::Model, product::Model)> {
    let company = find_company(db, principal, company_code).await?;
    let product = product::Entity::visible_to(principal)
        .filter(product::Column::CompanyId.eq(company.id))
        .filter(product::Column::Code.eq(product_code))
        .one(db)
        .await?
        .ok_or_else(|| {
            debug!(
                "Product {}/{} not visible to {}",
                company_code, product_code, principal.username
            );
            AccessError::NotFound
        })?;
    Ok((company, product))
}

/// Retrieves a visible transaction by code.
pub async fn find_transaction<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    code: &str,
) -> Result<transaction::Model> {
    transaction::Entity::visible_to(principal)
        .filter(transaction::Column::Code.eq(code))
        .one(db)
        .await?
        .ok_or_else(|| {
            debug!("Transaction {} not visible to {}", code, principal.username);
            AccessError::NotFound
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{add_user_to_group, replace_owner_groups};
    use crate::testing::{insert_company, insert_product, insert_transaction, insert_user, setup_db};
    use sea_orm::{DatabaseConnection, QueryOrder};

    struct Fixture {
        db: DatabaseConnection,
        member_abc: Principal,
        member_both: Principal,
        outsider: Principal,
        admin: Principal,
    }

    async fn principal_for(db: &DatabaseConnection, username: &str) -> Principal {
        Principal::load(db, username).await.unwrap().unwrap()
    }

    /// ABC001 -> [company_ABC001, shared], ABC002 -> [company_ABC002, shared],
    /// FXC001 -> [company_FXC]
    async fn fixture() -> Fixture {
        let db = setup_db().await;

        let abc1 = insert_company(&db, "ABC001").await;
        let abc2 = insert_company(&db, "ABC002").await;
        let fxc1 = insert_company(&db, "FXC001").await;
        replace_owner_groups(&db, abc1.id, &["company_ABC001", "shared"]).await.unwrap();
        replace_owner_groups(&db, abc2.id, &["company_ABC002", "shared"]).await.unwrap();
        replace_owner_groups(&db, fxc1.id, &["company_FXC"]).await.unwrap();

        let member_abc = insert_user(&db, "UserABC001", false).await;
        add_user_to_group(&db, member_abc.id, "company_ABC001").await.unwrap();
        let member_both = insert_user(&db, "UserShared", false).await;
        add_user_to_group(&db, member_both.id, "company_ABC001").await.unwrap();
        add_user_to_group(&db, member_both.id, "shared").await.unwrap();
        insert_user(&db, "User1", false).await;
        insert_user(&db, "admin", true).await;

        let p1 = insert_product(&db, abc1.id, "ABP001").await;
        let p2 = insert_product(&db, abc2.id, "ABP002").await;
        let p3 = insert_product(&db, fxc1.id, "FXP001").await;
        insert_transaction(&db, member_abc.id, p1.id, "ABT001").await;
        insert_transaction(&db, member_abc.id, p2.id, "ABT002").await;
        insert_transaction(&db, member_abc.id, p3.id, "FXT001").await;

        Fixture {
            member_abc: principal_for(&db, "UserABC001").await,
            member_both: principal_for(&db, "UserShared").await,
            outsider: principal_for(&db, "User1").await,
            admin: principal_for(&db, "admin").await,
            db,
        }
    }

    async fn company_codes(db: &DatabaseConnection, principal: &Principal) -> Vec<String> {
        company::Entity::visible_to(principal)
            .order_by_asc(company::Column::Code)
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect()
    }

    #[tokio::test]
    async fn test_company_scope() {
        let f = fixture().await;

        assert_eq!(company_codes(&f.db, &f.member_abc).await, vec!["ABC001"]);
        // Reachable through two groups, listed once
        assert_eq!(company_codes(&f.db, &f.member_both).await, vec!["ABC001", "ABC002"]);
        assert!(company_codes(&f.db, &f.outsider).await.is_empty());
        assert_eq!(
            company_codes(&f.db, &f.admin).await,
            vec!["ABC001", "ABC002", "FXC001"]
        );
    }

    #[tokio::test]
    async fn test_product_scope_follows_company() {
        let f = fixture().await;

        let codes: Vec<String> = product::Entity::visible_to(&f.member_both)
            .order_by_asc(product::Column::Code)
            .all(&f.db)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(codes, vec!["ABP001", "ABP002"]);

        let outsider = product::Entity::visible_to(&f.outsider).all(&f.db).await.unwrap();
        assert!(outsider.is_empty());
    }

    #[tokio::test]
    async fn test_transaction_scope_follows_product_company() {
        let f = fixture().await;

        // The purchaser only sees purchases of products of companies it shares a group with
        let codes: Vec<String> = transaction::Entity::visible_to(&f.member_abc)
            .order_by_asc(transaction::Column::Code)
            .all(&f.db)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.code)
            .collect();
        assert_eq!(codes, vec!["ABT001"]);

        let all = transaction::Entity::visible_to(&f.admin).all(&f.db).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_out_of_scope_is_not_found() {
        let f = fixture().await;

        let hidden = find_company(&f.db, &f.member_abc, "FXC001").await;
        let missing = find_company(&f.db, &f.member_abc, "NOPE00").await;
        assert!(matches!(hidden, Err(AccessError::NotFound)));
        assert!(matches!(missing, Err(AccessError::NotFound)));

        assert!(find_company(&f.db, &f.admin, "FXC001").await.is_ok());
        assert!(find_company(&f.db, &f.member_abc, "ABC001").await.is_ok());
    }

    #[tokio::test]
    async fn test_find_product_and_transaction() {
        let f = fixture().await;

        let (company, product) = find_product(&f.db, &f.member_abc, "ABC001", "ABP001").await.unwrap();
        assert_eq!(company.code, "ABC001");
        assert_eq!(product.code, "ABP001");

        assert!(matches!(
            find_product(&f.db, &f.member_abc, "ABC002", "ABP002").await,
            Err(AccessError::NotFound)
        ));
        assert!(matches!(
            find_transaction(&f.db, &f.member_abc, "FXT001").await,
            Err(AccessError::NotFound)
        ));
        assert!(find_transaction(&f.db, &f.admin, "FXT001").await.is_ok());
    }
}
