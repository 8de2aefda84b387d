use super::{company, user};
use sea_orm::entity::prelude::*;

/// A named set of users. Groups are the only authorization relation: a
/// company is visible to every member of any of its owner groups.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_group::Entity")]
    UserGroup,
    #[sea_orm(has_many = "super::company_owner_group::Entity")]
    CompanyOwnerGroup,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_group::Relation::User.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::user_group::Relation::Group.def().rev())
    }
}

impl Related<company::Entity> for Entity {
    fn to() -> RelationDef {
        super::company_owner_group::Relation::Company.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::company_owner_group::Relation::Group.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
