//! Root of the SeaORM entity modules.
//!
//! Companies are owned by groups through an explicit join table, as are
//! user memberships, so authorization queries stay plain SQL joins.

pub mod company;
pub mod company_owner_group;
pub mod group;
pub mod product;
pub mod transaction;
pub mod user;
pub mod user_group;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::company::Entity as Company;
    pub use super::company_owner_group::Entity as CompanyOwnerGroup;
    pub use super::group::Entity as Group;
    pub use super::product::Entity as Product;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
    pub use super::user_group::Entity as UserGroup;
}
