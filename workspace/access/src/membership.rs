//! Group membership index.
//!
//! Reads and writes the `user_groups` and `company_owner_groups` join tables.
//! Every function takes a generic connection so callers can run them inside
//! a database transaction.

use std::collections::{BTreeSet, HashMap};

use model::entities::{company_owner_group, group, user_group};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::{debug, info, trace};

/// Groups the user belongs to, ordered by name.
pub async fn groups_of_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<group::Model>, DbErr> {
    group::Entity::find()
        .join(JoinType::InnerJoin, group::Relation::UserGroup.def())
        .filter(user_group::Column::UserId.eq(user_id))
        .order_by_asc(group::Column::Name)
        .all(db)
        .await
}

/// Groups owning the company, ordered by name.
pub async fn owner_groups_of<C: ConnectionTrait>(
    db: &C,
    company_id: i32,
) -> Result<Vec<group::Model>, DbErr> {
    group::Entity::find()
        .join(JoinType::InnerJoin, group::Relation::CompanyOwnerGroup.def())
        .filter(company_owner_group::Column::CompanyId.eq(company_id))
        .order_by_asc(group::Column::Name)
        .all(db)
        .await
}

/// Owner group names for several companies at once, keyed by company id.
///
/// Companies without owner groups are absent from the map.
pub async fn owner_group_names_by_company<C: ConnectionTrait>(
    db: &C,
    company_ids: &[i32],
) -> Result<HashMap<i32, Vec<String>>, DbErr> {
    if company_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = company_owner_group::Entity::find()
        .filter(company_owner_group::Column::CompanyId.is_in(company_ids.iter().copied()))
        .find_also_related(group::Entity)
        .all(db)
        .await?;

    let mut names: HashMap<i32, Vec<String>> = HashMap::new();
    for (link, group) in rows {
        if let Some(group) = group {
            names.entry(link.company_id).or_default().push(group.name);
        }
    }
    for list in names.values_mut() {
        list.sort();
    }
    Ok(names)
}

/// Returns the group called `name`, creating it when it does not exist yet.
///
/// The insert skips conflicting rows instead of failing, so a group created
/// concurrently by another request leaves the caller's transaction usable.
pub async fn get_or_create_group<C: ConnectionTrait>(db: &C, name: &str) -> Result<group::Model, DbErr> {
    if let Some(existing) = find_group(db, name).await? {
        return Ok(existing);
    }

    trace!("Group {} does not exist, creating it", name);
    let inserted = insert_group_if_absent(db, name).await?;

    let group = find_group(db, name)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("group {}", name)))?;
    if inserted {
        info!("Created group {} with ID {}", group.name, group.id);
    } else {
        debug!("Group {} was created concurrently, reusing it", name);
    }
    Ok(group)
}

/// Inserts the group unless one with the same name exists. Returns whether a
/// row was written.
async fn insert_group_if_absent<C: ConnectionTrait>(db: &C, name: &str) -> Result<bool, DbErr> {
    let rows = group::Entity::insert(group::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    })
    .on_conflict(OnConflict::column(group::Column::Name).do_nothing().to_owned())
    .exec_without_returning(db)
    .await?;
    Ok(rows > 0)
}

async fn find_group<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<group::Model>, DbErr> {
    group::Entity::find()
        .filter(group::Column::Name.eq(name))
        .one(db)
        .await
}

/// Replaces the company's owner groups with exactly `names`.
///
/// Unknown names are created. Groups no longer listed are disassociated but
/// not deleted.
pub async fn replace_owner_groups<C, S>(
    db: &C,
    company_id: i32,
    names: &[S],
) -> Result<Vec<group::Model>, DbErr>
where
    C: ConnectionTrait,
    S: AsRef<str>,
{
    let wanted: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();

    let mut groups = Vec::with_capacity(wanted.len());
    for name in &wanted {
        groups.push(get_or_create_group(db, name).await?);
    }

    let removed = company_owner_group::Entity::delete_many()
        .filter(company_owner_group::Column::CompanyId.eq(company_id))
        .exec(db)
        .await?;
    trace!(
        "Cleared {} owner group link(s) of company {}",
        removed.rows_affected,
        company_id
    );

    if !groups.is_empty() {
        let links = groups.iter().map(|g| company_owner_group::ActiveModel {
            company_id: Set(company_id),
            group_id: Set(g.id),
        });
        company_owner_group::Entity::insert_many(links)
            .exec_without_returning(db)
            .await?;
    }

    debug!(
        "Company {} is now owned by [{}]",
        company_id,
        groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(groups)
}

/// Adds the user to the group called `name`, creating the group if needed.
/// Adding an existing member is a no-op.
pub async fn add_user_to_group<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    name: &str,
) -> Result<group::Model, DbErr> {
    let group = get_or_create_group(db, name).await?;

    let rows = user_group::Entity::insert(user_group::ActiveModel {
        user_id: Set(user_id),
        group_id: Set(group.id),
    })
    .on_conflict(
        OnConflict::columns([user_group::Column::UserId, user_group::Column::GroupId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    if rows > 0 {
        info!("Added user {} to group {}", user_id, group.name);
    } else {
        debug!("User {} is already a member of {}", user_id, group.name);
    }

    Ok(group)
}
