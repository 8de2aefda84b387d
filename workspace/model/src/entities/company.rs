use super::group;
use sea_orm::entity::prelude::*;

/// A tenant-owned company. Ownership is expressed only through
/// `company_owner_groups`; there is no owning user column.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Short public identifier, unique across all companies.
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::company_owner_group::Entity")]
    CompanyOwnerGroup,
    #[sea_orm(has_many = "super::product::Entity")]
    Product,
}

impl Related<group::Entity> for Entity {
    fn to() -> RelationDef {
        super::company_owner_group::Relation::Group.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::company_owner_group::Relation::Company.def().rev())
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
