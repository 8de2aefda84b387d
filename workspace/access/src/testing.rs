//! Shared fixtures for the access crate tests.

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use model::entities::{company, group, product, transaction, user};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

use crate::Principal;

/// Create an in-memory SQLite database with all migrations applied
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

/// Build a principal without touching the database
pub fn principal(is_superuser: bool, groups: &[&str]) -> Principal {
    Principal {
        user_id: 1,
        username: "tester".to_string(),
        is_superuser,
        groups: groups
            .iter()
            .enumerate()
            .map(|(i, name)| group::Model {
                id: i as i32 + 1,
                name: name.to_string(),
            })
            .collect(),
    }
}

pub async fn insert_user(db: &DatabaseConnection, username: &str, is_superuser: bool) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        is_superuser: Set(is_superuser),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user")
}

pub async fn insert_company(db: &DatabaseConnection, code: &str) -> company::Model {
    company::ActiveModel {
        code: Set(code.to_string()),
        name: Set(format!("Company {}", code)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create company")
}

pub async fn insert_product(db: &DatabaseConnection, company_id: i32, code: &str) -> product::Model {
    product::ActiveModel {
        company_id: Set(company_id),
        code: Set(code.to_string()),
        name: Set(format!("Product {}", code)),
        price: Set(100),
        active_listing: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create product")
}

pub async fn insert_transaction(
    db: &DatabaseConnection,
    user_id: i32,
    product_id: i32,
    code: &str,
) -> transaction::Model {
    transaction::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        code: Set(code.to_string()),
        quantity: Set(1),
        timestamp: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create transaction")
}
