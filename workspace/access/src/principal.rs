use std::collections::BTreeSet;

use model::entities::{group, user};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use tracing::{debug, trace};

use crate::membership;

/// The acting user of a request together with its group memberships.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub username: String,
    pub is_superuser: bool,
    pub groups: Vec<group::Model>,
}

impl Principal {
    pub fn new(user: user::Model, groups: Vec<group::Model>) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            is_superuser: user.is_superuser,
            groups,
        }
    }

    /// Loads the user called `username` and its groups.
    ///
    /// Returns `Ok(None)` when no such user exists.
    pub async fn load<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Self>, DbErr> {
        trace!("Resolving principal for username: {}", username);
        let Some(user) = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?
        else {
            debug!("No user named {}", username);
            return Ok(None);
        };

        let groups = membership::groups_of_user(db, user.id).await?;
        debug!(
            "Resolved principal {} (superuser: {}, groups: {})",
            user.username,
            user.is_superuser,
            groups.len()
        );
        Ok(Some(Self::new(user, groups)))
    }

    pub fn group_ids(&self) -> Vec<i32> {
        self.groups.iter().map(|g| g.id).collect()
    }

    pub fn group_names(&self) -> BTreeSet<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// True when at least one of `names` is one of this principal's groups.
    pub fn is_member_of_any<'a, I>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let own = self.group_names();
        names.into_iter().any(|name| own.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{principal, setup_db};
    use model::entities::user;
    use sea_orm::{ActiveModelTrait, Set};

    #[test]
    fn test_is_member_of_any() {
        let p = principal(false, &["company_ABC001", "company_ABC002"]);
        assert!(p.is_member_of_any(["company_ABC002"]));
        assert!(p.is_member_of_any(["other", "company_ABC001"]));
        assert!(!p.is_member_of_any(["company_FXC"]));
        assert!(!p.is_member_of_any(std::iter::empty()));
    }

    #[tokio::test]
    async fn test_load_principal() {
        let db = setup_db().await;
        let user = user::ActiveModel {
            username: Set("UserABC001".to_string()),
            is_superuser: Set(false),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        membership::add_user_to_group(&db, user.id, "company_ABC001").await.unwrap();

        let loaded = Principal::load(&db, "UserABC001").await.unwrap().unwrap();
        assert_eq!(loaded.user_id, user.id);
        assert!(!loaded.is_superuser);
        assert_eq!(loaded.group_names().into_iter().collect::<Vec<_>>(), vec!["company_ABC001"]);

        assert!(Principal::load(&db, "nobody").await.unwrap().is_none());
    }
}
