use std::sync::Arc;

use access::membership;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestRequest, TestServer};
use chrono::{TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use model::entities::{company, product, transaction, user};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::Settings;
use crate::extract::REMOTE_USER_HEADER;
use crate::router::create_router;
use crate::schemas::AppState;

pub const ADMIN: &str = "admin";
/// Member of no group that owns anything
pub const USER1: &str = "User1";
pub const USER_ABC001: &str = "UserABC001";
pub const USER_ABC002: &str = "UserABC002";
pub const USER_SHARED: &str = "UserShared";

/// Create an in-memory SQLite database for testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

async fn insert_user(db: &DatabaseConnection, username: &str, is_superuser: bool, groups: &[&str]) -> user::Model {
    let user = user::ActiveModel {
        username: Set(username.to_string()),
        is_superuser: Set(is_superuser),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test user");

    for group in groups {
        membership::add_user_to_group(db, user.id, group)
            .await
            .expect("Failed to add test user to group");
    }
    user
}

async fn insert_company(db: &DatabaseConnection, code: &str, name: &str, groups: &[&str]) -> company::Model {
    let company = company::ActiveModel {
        code: Set(code.to_string()),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test company");

    membership::replace_owner_groups(db, company.id, groups)
        .await
        .expect("Failed to assign owner groups");
    company
}

async fn insert_product(
    db: &DatabaseConnection,
    company: &company::Model,
    code: &str,
    price: i64,
    active_listing: bool,
) -> product::Model {
    product::ActiveModel {
        company_id: Set(company.id),
        code: Set(code.to_string()),
        name: Set(format!("Product {}", code)),
        price: Set(price),
        active_listing: Set(active_listing),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test product")
}

async fn insert_transaction(
    db: &DatabaseConnection,
    buyer: &user::Model,
    product: &product::Model,
    code: &str,
    quantity: i32,
) -> transaction::Model {
    transaction::ActiveModel {
        user_id: Set(buyer.id),
        product_id: Set(product.id),
        code: Set(code.to_string()),
        quantity: Set(quantity),
        timestamp: Set(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test transaction")
}

/// Seeds the tenancy fixture:
///
/// | company | owner groups                | products       |
/// |---------|-----------------------------|----------------|
/// | ABC001  | company_ABC001, shared      | ABP001, ABP002 |
/// | ABC002  | company_ABC002, shared      |                |
/// | FXC001  | company_FXC                 | FXP001         |
/// | FXC002  | company_FXC                 |                |
///
/// Transactions: ABT001 (UserABC001 buys ABP001) and FXT001 (admin buys FXP001).
pub async fn seed(db: &DatabaseConnection) {
    let admin = insert_user(db, ADMIN, true, &[]).await;
    insert_user(db, USER1, false, &["unrelated"]).await;
    let user_abc001 = insert_user(db, USER_ABC001, false, &["company_ABC001"]).await;
    insert_user(db, USER_ABC002, false, &["company_ABC002"]).await;
    insert_user(db, USER_SHARED, false, &["shared"]).await;

    let abc001 = insert_company(db, "ABC001", "ABC Holdings", &["company_ABC001", "shared"]).await;
    insert_company(db, "ABC002", "ABC Retail", &["company_ABC002", "shared"]).await;
    let fxc001 = insert_company(db, "FXC001", "FX Capital", &["company_FXC"]).await;
    insert_company(db, "FXC002", "FX Markets", &["company_FXC"]).await;

    let abp001 = insert_product(db, &abc001, "ABP001", 1000, true).await;
    insert_product(db, &abc001, "ABP002", 2500, false).await;
    let fxp001 = insert_product(db, &fxc001, "FXP001", 500, true).await;

    insert_transaction(db, &user_abc001, &abp001, "ABT001", 2).await;
    insert_transaction(db, &admin, &fxp001, "FXT001", 1).await;
}

/// Create AppState for testing
pub async fn setup_test_app_state() -> AppState {
    let db = setup_test_db().await;
    seed(&db).await;

    let mut settings = Settings::default();
    settings.pagination.default_page_size = 2;
    settings.pagination.max_page_size = 3;

    AppState {
        db,
        settings: Arc::new(settings),
    }
}

/// Initialize tracing for tests with output to STDERR.
///
/// The log level is determined by the RUST_LOG environment variable,
/// defaulting to WARN if not set.
fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Create axum app for testing
pub async fn setup_test_app() -> Router {
    let _guard = init_test_tracing();
    let state = setup_test_app_state().await;
    create_router(state)
}

pub async fn setup_test_server() -> TestServer {
    TestServer::new(setup_test_app().await).expect("Failed to start test server")
}

/// Sends a request as the named user.
pub trait AsUser {
    fn as_user(self, username: &str) -> Self;
}

impl AsUser for TestRequest {
    fn as_user(self, username: &str) -> Self {
        self.add_header(
            HeaderName::from_static(REMOTE_USER_HEADER),
            HeaderValue::from_str(username).expect("Invalid username header"),
        )
    }
}
