use access::{membership, policy};
use anyhow::Result;
use model::entities::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{debug, error, info, trace};

/// Creates `username`, or updates its superuser flag when it exists, and adds
/// it to `groups`.
pub async fn create_user(
    database_url: &str,
    username: &str,
    superuser: bool,
    groups: &[String],
) -> Result<()> {
    trace!("Entering create_user function");

    let db = match Database::connect(database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    let groups = groups
        .iter()
        .map(|name| policy::normalize_group_name(name))
        .collect::<Result<Vec<_>, _>>()?;

    let txn = db.begin().await?;
    let user = upsert_user(&txn, username, superuser).await?;
    add_to_groups(&txn, user.id, &groups).await?;
    txn.commit().await?;

    info!(
        "User {} (ID {}, superuser: {}) is a member of {:?}",
        user.username, user.id, user.is_superuser, groups
    );
    Ok(())
}

async fn add_to_groups<C: ConnectionTrait>(db: &C, user_id: i32, groups: &[String]) -> Result<()> {
    for group in groups {
        membership::add_user_to_group(db, user_id, group).await?;
    }
    Ok(())
}

async fn upsert_user<C: ConnectionTrait>(db: &C, username: &str, superuser: bool) -> Result<user::Model> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;

    let user = match existing {
        Some(user) if user.is_superuser == superuser => {
            debug!("User {} already exists", username);
            user
        }
        Some(user) => {
            debug!("Updating superuser flag of {}", username);
            let mut active: user::ActiveModel = user.into();
            active.is_superuser = Set(superuser);
            active.update(db).await?
        }
        None => {
            user::ActiveModel {
                username: Set(username.to_string()),
                is_superuser: Set(superuser),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };
    Ok(user)
}
